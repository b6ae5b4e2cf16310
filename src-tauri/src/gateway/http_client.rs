use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::{ApiError, DicomViewError};
use crate::session::Session;

pub const LOGIN_PATH: &str = "/login";

/// Where the view currently is, and how to send it somewhere else.
///
/// The client only needs this for the 401 path: it must redirect to the login
/// screen unless the view is already there.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, path: &str);
}

/// Optional structured body of an error response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

/// Static assets are fetched without credentials.
pub fn requires_auth(path: &str) -> bool {
    !(path.contains("/static/") || path == "/manifest.json")
}

/// Configured request/response pipeline for the remote API.
///
/// Every request goes through `request()` (bearer decoration) and `send()`
/// (status classification, 401 handling, error normalization).
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: &AppConfig,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, DicomViewError> {
        let parsed = Url::parse(&config.api_base_url).map_err(|e| {
            DicomViewError::Config(format!(
                "Invalid API base URL '{}': {}",
                config.api_base_url, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DicomViewError::Config(format!(
                "API base URL must be http or https: {}",
                config.api_base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent("DicomView/0.1")
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| DicomViewError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request, attaching the bearer token unless `path` is a static asset.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if requires_auth(path) {
            match self.session.get() {
                Some(token) => builder = builder.bearer_auth(token),
                None => warn!("No session token available for request to {}", path),
            }
        }
        builder
    }

    /// Send a prepared request. Non-success statuses become `ApiError::server`
    /// with the server's `message` (or `fallback`) and `code`.
    pub async fn send(&self, builder: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            error!("Network error: {}", e);
            ApiError::network(fallback)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        self.on_error_status(status);

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Err(ApiError::server(message, status.as_u16(), body.code))
    }

    fn on_error_status(&self, status: StatusCode) {
        match status {
            StatusCode::UNAUTHORIZED => self.handle_unauthorized(),
            StatusCode::FORBIDDEN => warn!("Access forbidden"),
            StatusCode::NOT_FOUND => debug!("Resource not found"),
            s if s.is_server_error() => error!("Server error: {}", s),
            s => warn!("Request failed with status {}", s),
        }
    }

    fn handle_unauthorized(&self) {
        self.session.clear();
        if !self.navigator.current_path().contains(LOGIN_PATH) {
            info!("Session token expired or invalid, redirecting to login");
            self.navigator.redirect(LOGIN_PATH);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path), fallback).await?;
        decode(response, fallback).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(builder, fallback).await?;
        decode(response, fallback).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::POST, path), fallback).await?;
        decode(response, fallback).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        let response = self.send(builder, fallback).await?;
        decode(response, fallback).await
    }

    pub async fn delete(&self, path: &str, fallback: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path), fallback).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| {
        warn!("Failed to decode response body: {}", e);
        ApiError::server(fallback, status, None)
    })
}
