//! NATS Key-Value store operations.
//!
//! - `KvStore<K, V, B>`: typed compare-and-set access to one bucket
//! - `KvKey`: keys that render to valid NATS KV keys
//! - `KvBucket`: bucket configuration
//! - `NatsJobStore`: the job state store on top of the `job_states` bucket

mod job_store;
mod kv_bucket;
mod kv_key;
mod kv_store;

pub use job_store::NatsJobStore;
pub use kv_bucket::{JobStatesBucket, KvBucket};
pub use kv_key::KvKey;
pub use kv_store::{KvStore, Revisioned};
