//! Object detection backends.
//!
//! The counter treats detection as a black box: a backend receives the path
//! of a snapshot on disk and returns one class identifier per detected
//! object. Boxes and scores stay inside the backend.

mod backend;
mod backends;
mod decode;
mod registry;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decode::{decode_detr, decode_yolo, DEFAULT_NMS_IOU};
pub use registry::build_backend;
