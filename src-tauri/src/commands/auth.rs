use tauri::Manager;
use tracing::{info, warn};

use crate::gateway::types::User;
use crate::state::AppState;

#[tauri::command]
pub async fn login(app: tauri::AppHandle, email: String, password: String) -> Result<User, String> {
    info!("Login requested for {}", email);
    let state = app.state::<AppState>();
    let user = state.auth.login(&email, &password).await.map_err(|e| {
        warn!("Login failed for {}: {}", email, e);
        e.to_string()
    })?;
    state.subscription.refresh().await;
    Ok(user)
}

#[tauri::command]
pub async fn register(
    app: tauri::AppHandle,
    email: String,
    password: String,
    name: String,
) -> Result<User, String> {
    info!("Registration requested for {}", email);
    let state = app.state::<AppState>();
    let user = state
        .auth
        .register(&email, &password, &name)
        .await
        .map_err(|e| {
            warn!("Registration failed for {}: {}", email, e);
            e.to_string()
        })?;
    state.subscription.refresh().await;
    Ok(user)
}

/// Sign out and stop any inference loops started for the old session.
#[tauri::command]
pub async fn logout(app: tauri::AppHandle) -> Result<(), String> {
    let state = app.state::<AppState>();
    state.jobs.dispose();
    state.auth.logout();
    state.subscription.dispose();
    Ok(())
}

/// Re-verify the stored token and return the signed-in user, if any.
#[tauri::command]
pub async fn verify_session(app: tauri::AppHandle) -> Result<Option<User>, String> {
    let state = app.state::<AppState>();
    if !state.session.is_authenticated() {
        return Ok(None);
    }
    state.auth.refresh().await;
    Ok(state.auth.current_user())
}

#[tauri::command]
pub async fn current_user(app: tauri::AppHandle) -> Result<Option<User>, String> {
    let state = app.state::<AppState>();
    Ok(state.auth.current_user())
}
