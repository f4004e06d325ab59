use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PREDICTIONS: &str = "predictions";
pub const IMAGES: &str = "images";
pub const TRASH_DETECTION: &str = "trash_detection";

pub const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub file_name: String,
    pub predicted_class: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub file_name: String,
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_created: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashDetectionRecord {
    pub file_name: String,
    pub image_url: String,
    pub bounding_box_image_url: String,
    pub trash_count: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
