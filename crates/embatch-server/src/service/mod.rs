//! Application state and dependency injection.

mod job_service;
mod service_config;
mod service_state;

pub use crate::service::job_service::JobService;
pub use crate::service::service_config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_REQUEST_BODY, ServiceConfig,
};
pub use crate::service::service_state::ServiceState;
