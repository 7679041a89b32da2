//! Decoding raw detector output tensors into class identifiers.
//!
//! Both decoders take the output as a flat row-major `f32` slice with the
//! batch dimension already stripped. Box coordinates are `cx, cy, w, h`.

use std::cmp::Ordering;

/// IoU above which two same-class YOLO boxes are treated as one object.
pub const DEFAULT_NMS_IOU: f32 = 0.45;

#[derive(Clone, Copy, Debug)]
struct Candidate {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    score: f32,
    class_id: u32,
}

impl Candidate {
    fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let left = (self.cx - self.w / 2.0).max(other.cx - other.w / 2.0);
        let right = (self.cx + self.w / 2.0).min(other.cx + other.w / 2.0);
        let top = (self.cy - self.h / 2.0).max(other.cy - other.h / 2.0);
        let bottom = (self.cy + self.h / 2.0).min(other.cy + other.h / 2.0);
        let inter = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

fn best_class(scores: impl Iterator<Item = f32>) -> Option<(u32, f32)> {
    scores
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(idx, score)| (idx as u32, score))
}

/// Decode a query-based output laid out as `[queries, 4 + classes]`.
///
/// Each query is at most one object, so no suppression is applied.
pub fn decode_detr(output: &[f32], queries: usize, row_len: usize, threshold: f32) -> Vec<u32> {
    if row_len <= 4 || output.len() < queries * row_len {
        return Vec::new();
    }
    output
        .chunks_exact(row_len)
        .take(queries)
        .filter_map(|row| best_class(row[4..].iter().copied()))
        .filter(|(_, score)| *score >= threshold)
        .map(|(class_id, _)| class_id)
        .collect()
}

/// Decode an anchor-based output laid out as `[4 + classes, anchors]`.
///
/// Anchors under `threshold` are dropped, then overlapping boxes of the
/// same class are suppressed greedily by score.
pub fn decode_yolo(
    output: &[f32],
    channels: usize,
    anchors: usize,
    threshold: f32,
    iou_threshold: f32,
) -> Vec<u32> {
    if channels <= 4 || output.len() < channels * anchors {
        return Vec::new();
    }
    let at = |channel: usize, anchor: usize| output[channel * anchors + anchor];

    let mut candidates: Vec<Candidate> = (0..anchors)
        .filter_map(|anchor| {
            let (class_id, score) = best_class((4..channels).map(|c| at(c, anchor)))?;
            if score < threshold {
                return None;
            }
            Some(Candidate {
                cx: at(0, anchor),
                cy: at(1, anchor),
                w: at(2, anchor),
                h: at(3, anchor),
                score,
                class_id,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .filter(|kept| kept.class_id == candidate.class_id)
            .all(|kept| candidate.iou(kept) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep.into_iter().map(|c| c.class_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detr_row(class_scores: &[f32]) -> Vec<f32> {
        let mut row = vec![0.5, 0.5, 0.1, 0.1];
        row.extend_from_slice(class_scores);
        row
    }

    #[test]
    fn detr_keeps_confident_queries() {
        let mut output = Vec::new();
        output.extend(detr_row(&[0.9, 0.0, 0.1]));
        output.extend(detr_row(&[0.0, 0.2, 0.3]));
        output.extend(detr_row(&[0.1, 0.0, 0.8]));

        let ids = decode_detr(&output, 3, 7, 0.5);
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn detr_rejects_short_output() {
        assert!(decode_detr(&[0.0; 6], 2, 7, 0.5).is_empty());
        assert!(decode_detr(&[0.0; 8], 2, 4, 0.5).is_empty());
    }

    // Column-major helper: each anchor is (cx, cy, w, h, scores...).
    fn yolo_output(anchors: &[[f32; 6]]) -> Vec<f32> {
        let mut out = vec![0.0; 6 * anchors.len()];
        for (a, values) in anchors.iter().enumerate() {
            for (c, value) in values.iter().enumerate() {
                out[c * anchors.len() + a] = *value;
            }
        }
        out
    }

    #[test]
    fn yolo_suppresses_same_class_overlap() {
        let output = yolo_output(&[
            [100.0, 100.0, 50.0, 50.0, 0.9, 0.0],
            [102.0, 101.0, 50.0, 50.0, 0.8, 0.0],
            [300.0, 300.0, 40.0, 40.0, 0.7, 0.0],
        ]);
        let ids = decode_yolo(&output, 6, 3, 0.5, DEFAULT_NMS_IOU);
        assert_eq!(ids, vec![0, 0]);
    }

    #[test]
    fn yolo_keeps_overlapping_boxes_of_different_classes() {
        let output = yolo_output(&[
            [100.0, 100.0, 50.0, 50.0, 0.9, 0.0],
            [100.0, 100.0, 50.0, 50.0, 0.0, 0.85],
            [10.0, 10.0, 5.0, 5.0, 0.1, 0.2],
        ]);
        let mut ids = decode_yolo(&output, 6, 3, 0.5, DEFAULT_NMS_IOU);
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Candidate {
            cx: 0.0,
            cy: 0.0,
            w: 1.0,
            h: 1.0,
            score: 1.0,
            class_id: 0,
        };
        let b = Candidate { cx: 5.0, ..a };
        assert_eq!(a.iou(&b), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
    }
}
