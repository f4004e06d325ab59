use async_trait::async_trait;
use serde::Serialize;
use service_core::InferenceError;

/// Axis-aligned box in original image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[async_trait]
pub trait ModelService: Send + Sync + 'static {
    async fn detect(&self, image_data: Vec<u8>) -> Result<Vec<Detection>, InferenceError>;
}
