//! Typed access to every endpoint of the remote DICOM API.
//!
//! `DicomGateway` is the one production implementation of the narrow traits
//! below. Services and the poller depend on the traits so tests can swap in
//! scripted fakes.

pub mod http_client;
pub mod progress;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use tracing::{debug, info};

use crate::error::ApiError;
use http_client::ApiClient;
pub use progress::{ProgressFn, ProgressTracker};
use types::*;

/// Bytes per body chunk; progress is reported once per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

const DICOM_MIME: &str = "application/dicom";

#[async_trait]
pub trait InferenceApi: Send + Sync {
    async fn start_inference(&self, file_id: &str) -> Result<StartInferenceResponse, ApiError>;
    async fn inference_status(&self, file_id: &str) -> Result<InferenceStatus, ApiError>;
    async fn inference_results(&self, file_id: &str) -> Result<InferenceResult, ApiError>;
}

/// Everything the viewer loader reads. Prior results come from `InferenceApi`.
#[async_trait]
pub trait ViewerApi: InferenceApi {
    async fn preview(&self, file_id: &str) -> Result<String, ApiError>;
    async fn metadata(&self, file_id: &str) -> Result<DicomMetadata, ApiError>;
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        progress: ProgressFn,
    ) -> Result<UploadResponse, ApiError>;
}

#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn subscription_status(&self) -> Result<SubscriptionStatus, ApiError>;
    async fn upload_eligibility(&self) -> Result<UploadEligibility, ApiError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse, ApiError>;
    async fn verify(&self) -> Result<VerifyResponse, ApiError>;
}

/// Build `/{prefix}/{id}{suffix}`, rejecting blank identifiers before any
/// request is made.
fn id_path(prefix: &str, id: &str, suffix: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::validation("File ID is required"));
    }
    Ok(format!("{}/{}{}", prefix, urlencoding::encode(id), suffix))
}

pub struct DicomGateway {
    client: Arc<ApiClient>,
}

impl DicomGateway {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list_files(&self) -> Result<Vec<DicomFile>, ApiError> {
        self.client.get_json("/dicom/files", "Failed to fetch files").await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<DicomFile, ApiError> {
        let path = id_path("/dicom/files", file_id, "")?;
        self.client.get_json(&path, "Failed to fetch file").await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), ApiError> {
        let path = id_path("/dicom/files", file_id, "")?;
        self.client.delete(&path, "Failed to delete file").await?;
        info!("Deleted file {}", file_id);
        Ok(())
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.client
            .get_json("/stats", "Failed to load dashboard statistics")
            .await
    }

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, ApiError> {
        self.client
            .get_json("/subscriptions", "Failed to fetch subscription plans")
            .await
    }

    pub async fn create_plan(&self, plan: &SubscriptionPlan) -> Result<SubscriptionPlan, ApiError> {
        self.client
            .post_json("/subscriptions", plan, "Failed to save subscription plan")
            .await
    }

    pub async fn update_plan(
        &self,
        plan_id: &str,
        plan: &SubscriptionPlan,
    ) -> Result<SubscriptionPlan, ApiError> {
        let path = id_path("/subscriptions", plan_id, "")?;
        self.client
            .put_json(&path, plan, "Failed to save subscription plan")
            .await
    }

    pub async fn delete_plan(&self, plan_id: &str) -> Result<(), ApiError> {
        let path = id_path("/subscriptions", plan_id, "")?;
        self.client
            .delete(&path, "Failed to delete subscription plan")
            .await
    }
}

#[async_trait]
impl InferenceApi for DicomGateway {
    async fn start_inference(&self, file_id: &str) -> Result<StartInferenceResponse, ApiError> {
        let path = id_path("/dicom/inference", file_id, "")?;
        self.client.post_empty(&path, "Failed to start inference").await
    }

    async fn inference_status(&self, file_id: &str) -> Result<InferenceStatus, ApiError> {
        let path = id_path("/dicom/inference/status", file_id, "")?;
        self.client
            .get_json(&path, "Failed to get inference status")
            .await
    }

    async fn inference_results(&self, file_id: &str) -> Result<InferenceResult, ApiError> {
        let path = id_path("/dicom/files", file_id, "/ai-results")?;
        self.client
            .get_json(&path, "Failed to get inference results")
            .await
    }
}

#[async_trait]
impl ViewerApi for DicomGateway {
    async fn preview(&self, file_id: &str) -> Result<String, ApiError> {
        let path = id_path("/dicom/files", file_id, "")?;
        let file: FilePreview = self.client.get_json(&path, "Failed to get preview").await?;
        Ok(file.cloudinary_secure_url)
    }

    async fn metadata(&self, file_id: &str) -> Result<DicomMetadata, ApiError> {
        let path = id_path("/dicom/files", file_id, "/metadata")?;
        self.client.get_json(&path, "Failed to get metadata").await
    }
}

#[async_trait]
impl UploadApi for DicomGateway {
    async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        progress: ProgressFn,
    ) -> Result<UploadResponse, ApiError> {
        const FALLBACK: &str = "Failed to upload file";

        let total = bytes.len() as u64;
        info!("Uploading {} ({} bytes)", filename, total);

        let tracker = Arc::new(ProgressTracker::new(total, progress));
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let counter = tracker.clone();
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            counter.advance(chunk.len() as u64);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(filename.to_string())
            .mime_str(DICOM_MIME)
            .map_err(|_| ApiError::validation(FALLBACK))?;
        let form = Form::new().part("file", part);

        let builder = self
            .client
            .request(Method::POST, "/dicom/upload")
            .multipart(form);
        let response = self.client.send(builder, FALLBACK).await?;
        let status = response.status().as_u16();
        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|_| ApiError::server(FALLBACK, status, None))?;

        tracker.finish();
        debug!("Upload of {} stored as {}", filename, uploaded.file_id);
        Ok(uploaded)
    }
}

#[async_trait]
impl SubscriptionApi for DicomGateway {
    async fn subscription_status(&self) -> Result<SubscriptionStatus, ApiError> {
        self.client
            .get_json("/subscription", "Failed to load subscription status")
            .await
    }

    async fn upload_eligibility(&self) -> Result<UploadEligibility, ApiError> {
        self.client
            .get_json("/subscription/limits", "Failed to check upload limit")
            .await
    }
}

#[async_trait]
impl AuthApi for DicomGateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest { email, password };
        self.client.post_json("/auth/login", &body, "Login failed").await
    }

    async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse, ApiError> {
        let body = RegisterRequest { email, password, name };
        self.client
            .post_json("/auth/register", &body, "Registration failed")
            .await
    }

    async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.client
            .get_json("/auth/verify", "Failed to verify session")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_path_encodes_single_segment() {
        assert_eq!(id_path("/dicom/files", "abc123", "").unwrap(), "/dicom/files/abc123");
        assert_eq!(
            id_path("/dicom/files", "a/b c", "/metadata").unwrap(),
            "/dicom/files/a%2Fb%20c/metadata"
        );
    }

    #[test]
    fn test_id_path_rejects_blank_id() {
        let err = id_path("/dicom/inference", "  ", "").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
        assert!(err.status.is_none());
    }
}
