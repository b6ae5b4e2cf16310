use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::{ApiError, DicomViewError};
use crate::gateway::types::{AuthResponse, User};
use crate::gateway::AuthApi;
use crate::session::Session;

pub const MISSING_TOKEN_MESSAGE: &str = "No token received from server";

/// Who is signed in, backed by the shared `Session`.
pub struct AuthService {
    api: Arc<dyn AuthApi>,
    session: Arc<Session>,
    user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(api: Arc<dyn AuthApi>, session: Arc<Session>) -> Self {
        Self {
            api,
            session,
            user: RwLock::new(None),
        }
    }

    /// Verify a restored token. An invalid one is dropped.
    pub async fn initialize(&self) {
        if !self.session.is_authenticated() {
            info!("No stored session");
            return;
        }
        self.refresh().await;
    }

    /// Re-run verification of the current token.
    pub async fn refresh(&self) {
        match self.api.verify().await {
            Ok(verified) => {
                if let Some(user) = &verified.user {
                    info!("Session verified for {}", user.email);
                }
                self.set_user(verified.user);
            }
            Err(e) => {
                warn!("Session verification failed: {}", e);
                self.session.clear();
                self.set_user(None);
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, DicomViewError> {
        let response = self.api.login(email.trim(), password).await?;
        self.accept(response)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, DicomViewError> {
        let response = self.api.register(email.trim(), password, name.trim()).await?;
        self.accept(response)
    }

    fn accept(&self, response: AuthResponse) -> Result<User, DicomViewError> {
        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation(MISSING_TOKEN_MESSAGE))?;
        let user = response
            .user
            .ok_or_else(|| ApiError::validation("No user received from server"))?;

        // The running process stays signed in even if the keychain write fails
        if let Err(e) = self.session.set(&token) {
            warn!("Signed in without a persisted session: {}", e);
        }
        info!("Signed in as {}", user.email);
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.clear();
        self.set_user(None);
        info!("Signed out");
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated() && self.current_user().is_some()
    }

    /// Drop the cached user. The persisted credential survives.
    pub fn dispose(&self) {
        self.set_user(None);
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::VerifyResponse;
    use crate::session::MemoryStore;
    use async_trait::async_trait;

    struct FakeAuthApi {
        token: Option<String>,
        verify_ok: bool,
    }

    fn alice() -> User {
        User {
            id: "u1".to_string(),
            email: "alice@example.org".to_string(),
            name: Some("Alice".to_string()),
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn login(&self, _email: &str, password: &str) -> Result<AuthResponse, ApiError> {
            if password == "wrong" {
                return Err(ApiError::server("Invalid credentials", 401, None));
            }
            Ok(AuthResponse {
                token: self.token.clone(),
                user: Some(alice()),
            })
        }

        async fn register(&self, _email: &str, _password: &str, _name: &str) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                token: self.token.clone(),
                user: Some(alice()),
            })
        }

        async fn verify(&self) -> Result<VerifyResponse, ApiError> {
            if self.verify_ok {
                Ok(VerifyResponse { user: Some(alice()) })
            } else {
                Err(ApiError::server("Token expired", 401, None))
            }
        }
    }

    fn service(token: Option<&str>, verify_ok: bool, session: Session) -> (AuthService, Arc<Session>) {
        let session = Arc::new(session);
        let api = Arc::new(FakeAuthApi {
            token: token.map(str::to_string),
            verify_ok,
        });
        (AuthService::new(api, session.clone()), session)
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let (auth, session) = service(Some("tok-1"), true, Session::in_memory());
        let user = auth.login("alice@example.org", "secret").await.unwrap();

        assert_eq!(user, alice());
        assert_eq!(session.get().as_deref(), Some("tok-1"));
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let (auth, session) = service(None, true, Session::in_memory());
        let err = auth.login("alice@example.org", "secret").await.unwrap_err();

        assert_eq!(err.to_string(), MISSING_TOKEN_MESSAGE);
        assert!(session.get().is_none());
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_login_surfaces_server_message() {
        let (auth, _) = service(Some("tok"), true, Session::in_memory());
        let err = auth.login("alice@example.org", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_initialize_verifies_restored_token() {
        let (auth, _) = service(None, true, Session::new(MemoryStore::with_token("old")));
        auth.initialize().await;
        assert_eq!(auth.current_user(), Some(alice()));
    }

    #[tokio::test]
    async fn test_initialize_drops_rejected_token() {
        let (auth, session) = service(None, false, Session::new(MemoryStore::with_token("old")));
        auth.initialize().await;
        assert!(session.get().is_none());
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_and_dispose() {
        let (auth, session) = service(Some("tok"), true, Session::in_memory());
        auth.register("alice@example.org", "secret", "Alice").await.unwrap();

        auth.dispose();
        assert!(auth.current_user().is_none());
        assert!(session.is_authenticated(), "dispose keeps the credential");

        auth.logout();
        assert!(session.get().is_none());
    }
}
