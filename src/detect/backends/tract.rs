#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::config::{DetectorSettings, OutputLayout};
use crate::detect::backend::DetectorBackend;
use crate::detect::decode::{decode_detr, decode_yolo, DEFAULT_NMS_IOU};

/// Tract-based backend for ONNX object detectors.
///
/// Loads a local model export once and runs it on each snapshot. Handles
/// query-based (RT-DETR style) and anchor-based (YOLOv8 style) outputs.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    layout: OutputLayout,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.5,
            layout: OutputLayout::Detr,
        })
    }

    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        Ok(Self::new(
            &settings.model_path,
            settings.input_width,
            settings.input_height,
        )?
        .with_threshold(settings.confidence_threshold)
        .with_layout(settings.output_layout))
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    fn build_input(&self, image_path: &Path) -> Result<Tensor> {
        let decoded = image::open(image_path)
            .with_context(|| format!("failed to decode image {}", image_path.display()))?;
        let rgb = decoded
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .into_rgb8();

        let width = self.width as usize;
        let pixels = rgb.as_raw();
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn extract_class_ids(&self, outputs: TVec<TValue>) -> Result<Vec<u32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        class_ids_from_output(output, self.layout, self.confidence_threshold)
    }
}

/// Decode one output tensor of shape `[1, rows, cols]` or `[rows, cols]`.
fn class_ids_from_output(
    output: &Tensor,
    layout: OutputLayout,
    threshold: f32,
) -> Result<Vec<u32>> {
    let view = output
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    let (rows, cols) = match view.shape() {
        [1, rows, cols] | [rows, cols] => (*rows, *cols),
        other => return Err(anyhow!("unexpected model output shape {:?}", other)),
    };
    let flat: Vec<f32> = view.iter().copied().collect();

    Ok(match layout {
        OutputLayout::Detr => decode_detr(&flat, rows, cols, threshold),
        OutputLayout::Yolo => decode_yolo(&flat, rows, cols, threshold, DEFAULT_NMS_IOU),
    })
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, image: &Path) -> Result<Vec<u32>> {
        let input = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_class_ids(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Tensor::zero::<f32>(&[1, 3, self.height as usize, self.width as usize])?;
        self.model
            .run(tvec!(blank.into()))
            .context("ONNX warm-up failed")?;
        Ok(())
    }
}
