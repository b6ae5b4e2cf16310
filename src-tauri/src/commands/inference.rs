use std::sync::Arc;

use tauri::{AppHandle, Emitter, Manager};
use tracing::{info, warn};

use crate::events::{InferenceStateChanged, INFERENCE_STATE};
use crate::inference::{InferenceObserver, InferenceState};
use crate::state::AppState;

/// Forwards every state transition to the view as an `inference-state` event.
struct EventObserver {
    app: AppHandle,
}

impl InferenceObserver for EventObserver {
    fn on_state(&self, file_id: &str, state: &InferenceState) {
        let payload = InferenceStateChanged {
            file_id: file_id.to_string(),
            state: state.clone(),
        };
        if let Err(e) = self.app.emit(INFERENCE_STATE, payload) {
            warn!("Failed to emit inference state for {}: {}", file_id, e);
        }
    }
}

/// Start inference for a file and poll it in the background. Fails if a loop
/// for the same file is still running.
#[tauri::command]
pub async fn start_inference(app: AppHandle, file_id: String) -> Result<(), String> {
    info!("Inference requested for {}", file_id);
    let observer = Arc::new(EventObserver { app: app.clone() });
    let state = app.state::<AppState>();
    state.jobs.start(&file_id, observer).map_err(|e| {
        warn!("Cannot start inference for {}: {}", file_id, e);
        e.to_string()
    })
}

/// Stop polling a file, e.g. when its view is torn down.
#[tauri::command]
pub async fn cancel_inference(app: AppHandle, file_id: String) -> Result<bool, String> {
    let state = app.state::<AppState>();
    Ok(state.jobs.cancel(&file_id))
}

#[tauri::command]
pub async fn inference_running(app: AppHandle, file_id: String) -> Result<bool, String> {
    let state = app.state::<AppState>();
    Ok(state.jobs.is_running(&file_id))
}
