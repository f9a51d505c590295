//! Application state and dependency injection.

use embatch_core::job::{JobBrokerService, JobStoreService};

use crate::service::{JobService, ServiceConfig};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    config: ServiceConfig,
    job_service: JobService,
}

impl ServiceState {
    /// Builds the state from configuration and connected backends.
    pub fn new(config: ServiceConfig, broker: JobBrokerService, store: JobStoreService) -> Self {
        let job_service = JobService::new(broker, store, config.batch_size);
        Self {
            config,
            job_service,
        }
    }

    /// Returns the configuration the state was built from.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(config: ServiceConfig);
impl_di!(job_service: JobService);
