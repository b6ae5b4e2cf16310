use tauri::Manager;

use crate::state::AppState;
use crate::viewer::{load_viewer as load, ViewerState};

/// Load everything the viewer shows for one file. Failures come back as
/// `ViewerState::Error`, never as a command error.
#[tauri::command]
pub async fn load_viewer(app: tauri::AppHandle, file_id: String) -> Result<ViewerState, String> {
    let state = app.state::<AppState>();
    Ok(load(state.gateway.as_ref(), &file_id).await)
}
