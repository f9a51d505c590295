//! Key-value key types and traits.

use std::fmt;
use std::str::FromStr;

use embatch_core::job::JobId;

/// Marker trait for KV key types.
///
/// The `Display` form is the stored key and must only use characters NATS
/// accepts in KV keys.
pub trait KvKey: fmt::Debug + fmt::Display + FromStr + Clone + Send + Sync + 'static {}

impl KvKey for JobId {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_a_valid_key() {
        let key = JobId::new().to_string();
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        );
        assert_eq!(key.parse::<JobId>().unwrap().to_string(), key);
    }
}
