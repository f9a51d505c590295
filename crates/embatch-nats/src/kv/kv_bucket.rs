//! Key-value bucket configuration traits.

/// Marker trait for KV bucket configuration.
///
/// Entry expiry is not part of the bucket type: it comes from the runtime
/// configuration when the bucket is created.
pub trait KvBucket: Clone + Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;

    /// Number of revisions kept per key.
    const HISTORY: i64 = 1;
}

/// Bucket for job lifecycle records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobStatesBucket;

impl KvBucket for JobStatesBucket {
    const NAME: &'static str = "job_states";
    const DESCRIPTION: &'static str = "Embedding job lifecycle states";
}
