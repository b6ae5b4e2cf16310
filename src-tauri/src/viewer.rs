use serde::Serialize;
use tracing::{debug, warn};

use crate::gateway::types::{DicomMetadata, InferenceResult};
use crate::gateway::ViewerApi;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load DICOM data. Please try again.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerData {
    pub file_id: String,
    pub preview_url: String,
    pub metadata: DicomMetadata,
    pub metadata_entries: Vec<(String, String)>,
    pub prior_result: Option<InferenceResult>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ViewerState {
    #[default]
    Loading,
    Error {
        message: String,
    },
    Ready(ViewerData),
}

/// Load preview, metadata and any earlier inference result for one file,
/// strictly in that order. A missing prior result is not an error.
pub async fn load_viewer<A: ViewerApi + ?Sized>(api: &A, file_id: &str) -> ViewerState {
    let preview_url = match api.preview(file_id).await {
        Ok(url) => url,
        Err(e) => {
            warn!("Failed to load preview for {}: {}", file_id, e);
            return load_failed();
        }
    };

    let metadata = match api.metadata(file_id).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to load metadata for {}: {}", file_id, e);
            return load_failed();
        }
    };

    let prior_result = match api.inference_results(file_id).await {
        Ok(result) => Some(result),
        Err(e) => {
            debug!("No prior inference result for {}: {}", file_id, e);
            None
        }
    };

    ViewerState::Ready(ViewerData {
        file_id: file_id.to_string(),
        preview_url,
        metadata_entries: metadata.entries(),
        metadata,
        prior_result,
    })
}

fn load_failed() -> ViewerState {
    ViewerState::Error {
        message: LOAD_FAILED_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::gateway::types::{InferenceStatus, StartInferenceResponse};
    use crate::gateway::InferenceApi;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeViewerApi {
        preview: Result<String, ApiError>,
        metadata: Result<DicomMetadata, ApiError>,
        prior: Result<InferenceResult, ApiError>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeViewerApi {
        fn ok() -> Self {
            Self {
                preview: Ok("https://res.example.org/f1.png".to_string()),
                metadata: Ok(DicomMetadata {
                    modality: Some("CT".to_string()),
                    ..Default::default()
                }),
                prior: Err(ApiError::server("No AI results found", 404, None)),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceApi for FakeViewerApi {
        async fn start_inference(&self, _file_id: &str) -> Result<StartInferenceResponse, ApiError> {
            unreachable!("loader never starts inference")
        }

        async fn inference_status(&self, _file_id: &str) -> Result<InferenceStatus, ApiError> {
            unreachable!("loader never polls")
        }

        async fn inference_results(&self, _file_id: &str) -> Result<InferenceResult, ApiError> {
            self.calls.lock().unwrap().push("results");
            self.prior.clone()
        }
    }

    #[async_trait]
    impl ViewerApi for FakeViewerApi {
        async fn preview(&self, _file_id: &str) -> Result<String, ApiError> {
            self.calls.lock().unwrap().push("preview");
            self.preview.clone()
        }

        async fn metadata(&self, _file_id: &str) -> Result<DicomMetadata, ApiError> {
            self.calls.lock().unwrap().push("metadata");
            self.metadata.clone()
        }
    }

    #[tokio::test]
    async fn test_missing_prior_result_is_empty() {
        let api = FakeViewerApi::ok();
        let state = load_viewer(&api, "f1").await;

        match state {
            ViewerState::Ready(data) => {
                assert_eq!(data.preview_url, "https://res.example.org/f1.png");
                assert!(data.prior_result.is_none());
                assert_eq!(
                    data.metadata_entries,
                    vec![("modality".to_string(), "CT".to_string())]
                );
            }
            other => panic!("expected Ready, got {:?}", other),
        }
        assert_eq!(*api.calls.lock().unwrap(), vec!["preview", "metadata", "results"]);
    }

    #[tokio::test]
    async fn test_prior_result_is_carried() {
        let mut api = FakeViewerApi::ok();
        api.prior = Ok(InferenceResult {
            findings: vec!["nodule".to_string()],
            confidence: 0.92,
            measurements: None,
            recommendations: None,
        });
        let ViewerState::Ready(data) = load_viewer(&api, "f1").await else {
            panic!("expected Ready");
        };
        assert_eq!(data.prior_result.unwrap().findings, vec!["nodule".to_string()]);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_load_error() {
        let mut api = FakeViewerApi::ok();
        api.metadata = Err(ApiError::network("Failed to get metadata"));
        let state = load_viewer(&api, "f1").await;

        assert_eq!(
            state,
            ViewerState::Error {
                message: LOAD_FAILED_MESSAGE.to_string()
            }
        );
        assert_eq!(*api.calls.lock().unwrap(), vec!["preview", "metadata"]);
    }

    #[tokio::test]
    async fn test_preview_failure_stops_early() {
        let mut api = FakeViewerApi::ok();
        api.preview = Err(ApiError::server("File not found", 404, None));
        let state = load_viewer(&api, "f1").await;

        assert!(matches!(state, ViewerState::Error { .. }));
        assert_eq!(*api.calls.lock().unwrap(), vec!["preview"]);
    }
}
