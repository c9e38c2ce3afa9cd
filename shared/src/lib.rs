use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    Document,
    Unknown,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct UploadResponse {
    pub result_id: Option<Uuid>,
    pub result_text: String,
    pub media_path: Option<String>,
    pub media_type: Option<MediaCategory>,
}
