use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::gateway::types::UploadResponse;
use crate::gateway::{ProgressFn, UploadApi};

/// A file picked or dropped in the view, already read into memory.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoFile,

    #[error("Only one file can be uploaded at a time")]
    TooManyFiles,

    #[error("Only DICOM (.dcm) files are supported")]
    NotDicom,

    #[error("Upload limit reached. Please upgrade your subscription.")]
    LimitReached,

    #[error("Failed to upload file. Please try again.")]
    Failed,
}

impl From<UploadError> for String {
    fn from(err: UploadError) -> Self {
        err.to_string()
    }
}

/// Gate consulted before any bytes are sent.
#[async_trait]
pub trait EligibilityCheck: Send + Sync {
    async fn can_upload(&self) -> Result<bool, ApiError>;

    /// Called once after a successful upload so cached quota can catch up.
    async fn uploaded(&self) {}
}

pub fn is_dicom_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

/// Exactly one `.dcm` file per upload.
pub fn select_single(mut files: Vec<SelectedFile>) -> Result<SelectedFile, UploadError> {
    let file = match files.len() {
        0 => return Err(UploadError::NoFile),
        1 => files.remove(0),
        _ => return Err(UploadError::TooManyFiles),
    };
    if !is_dicom_name(&file.name) {
        return Err(UploadError::NotDicom);
    }
    Ok(file)
}

pub struct UploadFlow {
    uploader: Arc<dyn UploadApi>,
    eligibility: Arc<dyn EligibilityCheck>,
}

impl UploadFlow {
    pub fn new(uploader: Arc<dyn UploadApi>, eligibility: Arc<dyn EligibilityCheck>) -> Self {
        Self {
            uploader,
            eligibility,
        }
    }

    /// Validate the selection, check quota, then transfer. `on_progress`
    /// sees non-decreasing percentages ending at 100, or a single 0 after a
    /// failed transfer.
    pub async fn upload(
        &self,
        files: Vec<SelectedFile>,
        on_progress: ProgressFn,
    ) -> Result<UploadResponse, UploadError> {
        let file = select_single(files)?;

        match self.eligibility.can_upload().await {
            Ok(true) => {}
            Ok(false) => {
                info!("Upload of {} blocked by subscription limit", file.name);
                return Err(UploadError::LimitReached);
            }
            Err(e) => {
                warn!("Upload limit check failed: {}", e);
                return Err(UploadError::Failed);
            }
        }

        match self
            .uploader
            .upload_file(&file.name, file.bytes, on_progress.clone())
            .await
        {
            Ok(response) => {
                info!("Uploaded {} as {}", file.name, response.file_id);
                self.eligibility.uploaded().await;
                Ok(response)
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", file.name, e);
                on_progress(0);
                Err(UploadError::Failed)
            }
        }
    }
}
