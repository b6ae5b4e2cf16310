use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::gateway::types::{PlanFeature, SubscriptionStatus, Tier};
use crate::gateway::SubscriptionApi;
use crate::upload::EligibilityCheck;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load subscription status";

/// Snapshot handed to the view.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub status: Option<SubscriptionStatus>,
    pub error: Option<String>,
    pub usage_percent: f64,
    pub near_limit: bool,
}

#[derive(Default)]
struct Cached {
    status: Option<SubscriptionStatus>,
    error: Option<String>,
}

/// Cached, eventually consistent subscription state.
pub struct SubscriptionService {
    api: Arc<dyn SubscriptionApi>,
    cached: RwLock<Cached>,
}

impl SubscriptionService {
    pub fn new(api: Arc<dyn SubscriptionApi>) -> Self {
        Self {
            api,
            cached: RwLock::new(Cached::default()),
        }
    }

    pub async fn initialize(&self) {
        self.refresh().await;
    }

    /// Re-fetch the status. On failure the previous status is kept and the
    /// error recorded.
    pub async fn refresh(&self) {
        let fetched = self.api.subscription_status().await;
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        match fetched {
            Ok(status) => {
                info!(
                    "Subscription: {} tier, {}/{} uploads",
                    status.tier.label(),
                    status.upload_count,
                    status.upload_limit
                );
                cached.status = Some(status);
                cached.error = None;
            }
            Err(e) => {
                warn!("Failed to load subscription status: {}", e);
                cached.error = Some(LOAD_FAILED_MESSAGE.to_string());
            }
        }
    }

    pub fn status(&self) -> Option<SubscriptionStatus> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .clone()
    }

    pub fn error(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .error
            .clone()
    }

    pub fn snapshot(&self) -> SubscriptionSnapshot {
        let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        let usage_percent = cached
            .status
            .as_ref()
            .map_or(0.0, SubscriptionStatus::usage_percent);
        SubscriptionSnapshot {
            status: cached.status.clone(),
            error: cached.error.clone(),
            usage_percent,
            near_limit: usage_percent >= 90.0,
        }
    }

    pub fn usage_percent(&self) -> f64 {
        self.status().map_or(0.0, |s| s.usage_percent())
    }

    pub fn near_limit(&self) -> bool {
        self.status().is_some_and(|s| s.near_limit())
    }

    pub fn tier_features(tier: Tier) -> Vec<PlanFeature> {
        tier.features()
    }

    /// Ask the server whether another upload is allowed this period.
    pub async fn check_upload_limit(&self) -> Result<bool, ApiError> {
        let eligibility = self.api.upload_eligibility().await?;
        if !eligibility.can_upload {
            info!(
                "Upload limit reached: {}",
                eligibility.message.as_deref().unwrap_or("no detail")
            );
        }
        Ok(eligibility.can_upload)
    }

    pub fn dispose(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Cached::default();
    }
}

#[async_trait]
impl EligibilityCheck for SubscriptionService {
    async fn can_upload(&self) -> Result<bool, ApiError> {
        self.check_upload_limit().await
    }

    async fn uploaded(&self) {
        self.refresh().await;
    }
}
