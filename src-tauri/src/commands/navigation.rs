use std::sync::Arc;

use tauri::Manager;

use crate::navigation::AppNavigator;

/// The view reports each route change so a 401 knows whether it is already
/// on the login screen.
#[tauri::command]
pub async fn set_current_route(app: tauri::AppHandle, path: String) -> Result<(), String> {
    let navigator = app.state::<Arc<AppNavigator>>();
    navigator.set_current(&path);
    Ok(())
}
