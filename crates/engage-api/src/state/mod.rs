//! Application state
//!
//! Holds the shared state for the Axum application: the engagement service
//! and the configuration it was built from.

use std::sync::Arc;

use engage_common::AppConfig;
use engage_service::EngagementService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    engagement: Arc<EngagementService>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(engagement: EngagementService, config: AppConfig) -> Self {
        Self {
            engagement: Arc::new(engagement),
            config: Arc::new(config),
        }
    }

    /// Get the engagement service
    pub fn engagement(&self) -> &EngagementService {
        &self.engagement
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engagement", &"EngagementService")
            .field("config", &"AppConfig")
            .finish()
    }
}
