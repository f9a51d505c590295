//! Work queue carrying job envelopes from the API façade to workers.

mod broker;
mod consumer;
mod job_queue;

pub use broker::NatsJobBroker;
pub use consumer::{JobConsumer, JobDelivery};
pub use job_queue::JobQueue;
