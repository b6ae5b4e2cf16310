use tauri::Manager;
use tracing::{info, warn};

use crate::gateway::types::{PlanFeature, SubscriptionPlan, Tier};
use crate::state::AppState;
use crate::subscription::{SubscriptionService, SubscriptionSnapshot};

#[tauri::command]
pub async fn get_subscription_status(app: tauri::AppHandle) -> Result<SubscriptionSnapshot, String> {
    let state = app.state::<AppState>();
    Ok(state.subscription.snapshot())
}

#[tauri::command]
pub async fn refresh_subscription(app: tauri::AppHandle) -> Result<SubscriptionSnapshot, String> {
    let state = app.state::<AppState>();
    state.subscription.refresh().await;
    Ok(state.subscription.snapshot())
}

#[tauri::command]
pub async fn check_upload_limit(app: tauri::AppHandle) -> Result<bool, String> {
    let state = app.state::<AppState>();
    state.subscription.check_upload_limit().await.map_err(|e| {
        warn!("Upload limit check failed: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn get_tier_features(tier: Tier) -> Result<Vec<PlanFeature>, String> {
    Ok(SubscriptionService::tier_features(tier))
}

#[tauri::command]
pub async fn list_plans(app: tauri::AppHandle) -> Result<Vec<SubscriptionPlan>, String> {
    let state = app.state::<AppState>();
    state.gateway.list_plans().await.map_err(|e| {
        warn!("Failed to list plans: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn create_plan(app: tauri::AppHandle, plan: SubscriptionPlan) -> Result<SubscriptionPlan, String> {
    info!("Creating plan {}", plan.name);
    let state = app.state::<AppState>();
    state.gateway.create_plan(&plan).await.map_err(|e| {
        warn!("Failed to create plan {}: {}", plan.name, e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn update_plan(
    app: tauri::AppHandle,
    plan_id: String,
    plan: SubscriptionPlan,
) -> Result<SubscriptionPlan, String> {
    info!("Updating plan {}", plan_id);
    let state = app.state::<AppState>();
    state.gateway.update_plan(&plan_id, &plan).await.map_err(|e| {
        warn!("Failed to update plan {}: {}", plan_id, e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn delete_plan(app: tauri::AppHandle, plan_id: String) -> Result<(), String> {
    info!("Deleting plan {}", plan_id);
    let state = app.state::<AppState>();
    state.gateway.delete_plan(&plan_id).await.map_err(|e| {
        warn!("Failed to delete plan {}: {}", plan_id, e);
        e.to_string()
    })
}
