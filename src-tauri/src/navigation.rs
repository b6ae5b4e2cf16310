use std::sync::{Mutex, PoisonError};

use tauri::{AppHandle, Emitter};
use tracing::{debug, warn};

use crate::events::{Navigate, NAVIGATE};
use crate::gateway::http_client::Navigator;

/// Delivers a route change to the view.
pub trait RouteSink: Send + Sync {
    fn navigate(&self, path: &str);
}

impl RouteSink for AppHandle {
    fn navigate(&self, path: &str) {
        let payload = Navigate {
            path: path.to_string(),
        };
        if let Err(e) = self.emit(NAVIGATE, payload) {
            warn!("Failed to emit navigate event: {}", e);
        }
    }
}

/// Tracks the view's current route and asks it to move through a
/// [`RouteSink`] (the `navigate` event in the app).
pub struct AppNavigator<S = AppHandle> {
    sink: S,
    route: Mutex<String>,
}

impl<S: RouteSink> AppNavigator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            route: Mutex::new("/".to_string()),
        }
    }

    /// Called by the view whenever its router changes location.
    pub fn set_current(&self, path: &str) {
        debug!("View route: {}", path);
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }
}

impl<S: RouteSink> Navigator for AppNavigator<S> {
    fn current_path(&self) -> String {
        self.route.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn redirect(&self, path: &str) {
        // Record the target right away so a burst of 401s redirects once
        self.set_current(path);
        self.sink.navigate(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl RouteSink for Recorder {
        fn navigate(&self, path: &str) {
            self.0.lock().unwrap().push(path.to_string());
        }
    }

    #[test]
    fn test_redirect_moves_tracked_route() {
        let navigator = AppNavigator::new(Recorder::default());
        navigator.set_current("/view/abc123");
        assert_eq!(navigator.current_path(), "/view/abc123");

        navigator.redirect("/login");
        assert_eq!(navigator.current_path(), "/login");
        assert_eq!(*navigator.sink.0.lock().unwrap(), vec!["/login".to_string()]);
    }
}
