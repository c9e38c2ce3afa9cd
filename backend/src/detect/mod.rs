pub mod aggregate;
pub mod config;
pub mod frames;
pub mod health;
pub mod model;

use image::RgbImage;

pub use frames::FrameError;
pub use model::InferenceError;

/// One detected object in one frame. Only `label` feeds the aggregation;
/// confidence and box come with the detector contract.
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Normalized [0, 1] coordinates relative to the source frame.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The object-detection model seam: one frame in, zero or more detections
/// out, no state retained between calls.
pub trait Detect: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, InferenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
}
