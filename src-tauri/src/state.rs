use std::sync::Arc;

use tracing::info;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::error::DicomViewError;
use crate::gateway::http_client::{ApiClient, Navigator};
use crate::gateway::DicomGateway;
use crate::inference::{InferenceJobs, InferencePoller};
use crate::session::Session;
use crate::subscription::SubscriptionService;
use crate::upload::UploadFlow;

/// Everything the commands reach through `app.state::<AppState>()`.
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<Session>,
    pub gateway: Arc<DicomGateway>,
    pub auth: AuthService,
    pub subscription: Arc<SubscriptionService>,
    pub uploads: UploadFlow,
    pub jobs: InferenceJobs,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, DicomViewError> {
        let client = Arc::new(ApiClient::new(&config, session.clone(), navigator)?);
        let gateway = Arc::new(DicomGateway::new(client));
        let subscription = Arc::new(SubscriptionService::new(gateway.clone()));
        let poller = InferencePoller::new(gateway.clone(), config.poll_config());

        info!("API base URL: {}", config.api_base_url);
        Ok(Self {
            auth: AuthService::new(gateway.clone(), session.clone()),
            uploads: UploadFlow::new(gateway.clone(), subscription.clone()),
            jobs: InferenceJobs::new(poller),
            subscription,
            gateway,
            session,
            config,
        })
    }

    /// Verify any restored session and load the subscription for it.
    pub async fn initialize(&self) {
        self.auth.initialize().await;
        if self.auth.is_authenticated() {
            self.subscription.initialize().await;
        }
    }

    pub fn dispose(&self) {
        self.jobs.dispose();
        self.subscription.dispose();
        self.auth.dispose();
        info!("Application state disposed");
    }
}
