use async_trait::async_trait;
use serde::Serialize;
use service_core::InferenceError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
}

#[async_trait]
pub trait ModelService: Send + Sync + 'static {
    async fn classify(&self, image_data: Vec<u8>) -> Result<Classification, InferenceError>;
}
