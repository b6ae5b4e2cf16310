use std::sync::Arc;

use tauri::Manager;

pub mod auth;
mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod inference;
pub mod navigation;
pub mod session;
pub mod state;
pub mod subscription;
pub mod upload;
pub mod viewer;

pub use error::{ApiError, DicomViewError, ErrorKind};
pub use state::AppState;

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::auth::login,
            commands::auth::register,
            commands::auth::logout,
            commands::auth::verify_session,
            commands::auth::current_user,
            commands::navigation::set_current_route,
            commands::files::list_files,
            commands::files::get_file,
            commands::files::delete_file,
            commands::files::get_dashboard_stats,
            commands::upload::upload_file,
            commands::inference::start_inference,
            commands::inference::cancel_inference,
            commands::inference::inference_running,
            commands::viewer::load_viewer,
            commands::subscription::get_subscription_status,
            commands::subscription::refresh_subscription,
            commands::subscription::check_upload_limit,
            commands::subscription::get_tier_features,
            commands::subscription::list_plans,
            commands::subscription::create_plan,
            commands::subscription::update_plan,
            commands::subscription::delete_plan,
            commands::config::get_preference,
            commands::config::set_preference,
        ])
        .setup(|app| {
            let config = config::resolve_config();
            let session = Arc::new(session::Session::new(session::KeyringStore::default()));
            let navigator = Arc::new(navigation::AppNavigator::new(app.handle().clone()));

            let state = AppState::new(config, session, navigator.clone())?;
            app.manage(navigator);
            app.manage(state);

            // Verify a restored session without blocking the first paint
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                handle.state::<AppState>().initialize().await;
            });
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|handle, event| {
        if let tauri::RunEvent::Exit = event {
            if let Some(state) = handle.try_state::<AppState>() {
                state.dispose();
            }
        }
    });
}
