use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use tracing::{debug, warn};

/// Store file for view preferences such as the last opened file.
const PREFERENCES_STORE: &str = "preferences.json";

/// Keys the view may persist.
const PREFERENCE_KEYS: &[&str] = &["last_file_id", "sidebar_collapsed", "metadata_expanded"];

fn check_key(key: &str) -> Result<(), String> {
    if PREFERENCE_KEYS.contains(&key) {
        Ok(())
    } else {
        warn!("Rejected unknown preference key: {}", key);
        Err(format!("Unknown preference: {}", key))
    }
}

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    check_key(key)?;
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open preference store: {}", e);
        e.to_string()
    })?;
    Ok(store.get(key).and_then(|v| v.as_str().map(str::to_string)))
}

/// Set a preference, or remove it when `value` is absent.
#[tauri::command]
pub fn set_preference(app: AppHandle, key: &str, value: Option<String>) -> Result<(), String> {
    check_key(key)?;
    debug!("Preference {} updated", key);
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open preference store: {}", e);
        e.to_string()
    })?;
    match value {
        Some(value) => store.set(key, serde_json::Value::String(value)),
        None => {
            store.delete(key);
        }
    }
    store.save().map_err(|e| {
        warn!("Failed to save preference store: {}", e);
        e.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_known_keys_accepted() {
        assert!(check_key("last_file_id").is_ok());
        assert_eq!(
            check_key("api_token").unwrap_err(),
            "Unknown preference: api_token"
        );
    }
}
