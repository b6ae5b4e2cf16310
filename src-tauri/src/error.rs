use serde::Serialize;
use thiserror::Error;

/// Broad class of an API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// No response was received (connect, timeout, body transfer).
    Network,
    /// The server answered with a non-success status or an unreadable body.
    Server,
    /// Input was rejected before any request was made.
    Validation,
}

/// Normalized failure of a gateway call.
///
/// Every gateway function maps transport errors, 4xx/5xx responses and
/// client-side validation failures into this one shape.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn server(message: impl Into<String>, status: u16, code: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Server,
            message: message.into(),
            status: Some(status),
            code,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            status: None,
            code: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DicomViewError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Inference is already running for file {0}")]
    AlreadyRunning(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<DicomViewError> for String {
    fn from(err: DicomViewError) -> Self {
        err.to_string()
    }
}

impl From<ApiError> for String {
    fn from(err: ApiError) -> Self {
        err.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_carries_status_and_code() {
        let err = ApiError::server("Quota exceeded", 403, Some("QUOTA".to_string()));
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.status, Some(403));
        assert_eq!(err.code.as_deref(), Some("QUOTA"));
        assert_eq!(err.to_string(), "Quota exceeded");
    }

    #[test]
    fn test_app_error_to_string() {
        let msg: String = DicomViewError::AlreadyRunning("abc".to_string()).into();
        assert_eq!(msg, "Inference is already running for file abc");

        let msg: String = DicomViewError::from(ApiError::validation("No file selected")).into();
        assert_eq!(msg, "No file selected");
    }
}
