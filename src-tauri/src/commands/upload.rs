use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use tauri::{Emitter, Manager};
use tracing::{info, warn};

use crate::events::{UploadProgress, UPLOAD_PROGRESS};
use crate::gateway::types::UploadResponse;
use crate::gateway::ProgressFn;
use crate::state::AppState;
use crate::upload::{SelectedFile, UploadError};

/// One file from the view's picker or drop zone, base64-encoded.
#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub name: String,
    pub data: String,
}

/// Upload the selection. Progress is pushed as `upload-progress` events.
#[tauri::command]
pub async fn upload_file(
    app: tauri::AppHandle,
    files: Vec<FilePayload>,
) -> Result<UploadResponse, String> {
    info!("Upload requested with {} file(s)", files.len());

    let mut selected = Vec::with_capacity(files.len());
    for file in files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(file.data.as_bytes())
            .map_err(|e| {
                warn!("Failed to decode upload payload for {}: {}", file.name, e);
                String::from(UploadError::Failed)
            })?;
        selected.push(SelectedFile {
            name: file.name,
            bytes,
        });
    }

    let filename = selected.first().map(|f| f.name.clone()).unwrap_or_default();
    let emitter = app.clone();
    let on_progress: ProgressFn = Arc::new(move |percent: u8| {
        let payload = UploadProgress {
            filename: filename.clone(),
            percent,
        };
        if let Err(e) = emitter.emit(UPLOAD_PROGRESS, payload) {
            warn!("Failed to emit upload progress: {}", e);
        }
    });

    let state = app.state::<AppState>();
    state
        .uploads
        .upload(selected, on_progress)
        .await
        .map_err(String::from)
}
