use tauri::Manager;
use tracing::{info, warn};

use crate::gateway::types::{DashboardStats, DicomFile};
use crate::state::AppState;

#[tauri::command]
pub async fn list_files(app: tauri::AppHandle) -> Result<Vec<DicomFile>, String> {
    let state = app.state::<AppState>();
    let files = state.gateway.list_files().await.map_err(|e| {
        warn!("Failed to list files: {}", e);
        e.to_string()
    })?;
    info!("Listed {} files", files.len());
    Ok(files)
}

#[tauri::command]
pub async fn get_file(app: tauri::AppHandle, file_id: String) -> Result<DicomFile, String> {
    let state = app.state::<AppState>();
    state.gateway.get_file(&file_id).await.map_err(|e| {
        warn!("Failed to fetch file {}: {}", file_id, e);
        e.to_string()
    })
}

/// Delete a file, stopping any inference loop still polling it.
#[tauri::command]
pub async fn delete_file(app: tauri::AppHandle, file_id: String) -> Result<(), String> {
    let state = app.state::<AppState>();
    state.jobs.cancel(&file_id);
    state.gateway.delete_file(&file_id).await.map_err(|e| {
        warn!("Failed to delete file {}: {}", file_id, e);
        e.to_string()
    })?;
    state.subscription.refresh().await;
    Ok(())
}

#[tauri::command]
pub async fn get_dashboard_stats(app: tauri::AppHandle) -> Result<DashboardStats, String> {
    let state = app.state::<AppState>();
    state.gateway.dashboard_stats().await.map_err(|e| {
        warn!("Failed to load dashboard statistics: {}", e);
        e.to_string()
    })
}
