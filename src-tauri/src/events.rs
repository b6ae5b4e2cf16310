//! Events pushed from the backend to the view.

use serde::Serialize;

use crate::inference::InferenceState;

pub const UPLOAD_PROGRESS: &str = "upload-progress";
pub const INFERENCE_STATE: &str = "inference-state";
pub const NAVIGATE: &str = "navigate";

#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub filename: String,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceStateChanged {
    pub file_id: String,
    pub state: InferenceState,
}

#[derive(Debug, Clone, Serialize)]
pub struct Navigate {
    pub path: String,
}
