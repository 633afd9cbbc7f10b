//! Gateway state
//!
//! Shared dependencies for the gateway server, built once at startup and
//! injected into the axum router. There is deliberately no global accessor:
//! anything that wants to emit events holds a reference to the router.

use crate::auth::AuthGate;
use crate::router::EventRouter;
use relay_common::AppConfig;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    auth: Arc<AuthGate>,
    router: Arc<EventRouter>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(auth: Arc<AuthGate>, router: Arc<EventRouter>, config: AppConfig) -> Self {
        Self {
            auth,
            router,
            config: Arc::new(config),
        }
    }

    /// Get the auth gate
    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    /// Get the event router
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("router", &self.router)
            .field("config", &"AppConfig")
            .finish()
    }
}
