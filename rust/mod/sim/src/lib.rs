pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use salesops_core::Module;

use service::SimService;

/// SIM Module — SIM-card inventory and its binding to clients.
pub struct SimModule {
    service: Arc<SimService>,
}

impl SimModule {
    pub fn new(service: SimService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> &Arc<SimService> {
        &self.service
    }
}

impl Module for SimModule {
    fn name(&self) -> &str {
        "sim"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
