use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::JobId;
use crate::{Batch, Modality, Result};

/// Unit of asynchronous work carried by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Job identifier.
    pub job_id: JobId,
    /// Modality shared by every item of the batch.
    pub modality: Modality,
    /// The full batch payload.
    pub batch: Batch,
    /// Maximum number of items per model invocation.
    pub batch_size: usize,
    /// When the job was accepted.
    pub submitted_at: Timestamp,
}

impl JobEnvelope {
    /// Validates a batch and wraps it into a new job.
    pub fn new(batch: Batch, batch_size: usize) -> Result<Self> {
        let modality = batch.modality()?;
        Ok(Self {
            job_id: JobId::new(),
            modality,
            batch,
            batch_size: batch_size.max(1),
            submitted_at: Timestamp::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchItem, ErrorKind};

    #[test]
    fn test_new_validates_batch() {
        let error = JobEnvelope::new(Batch::new("acme", Vec::new()), 36).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);

        let envelope =
            JobEnvelope::new(Batch::new("acme", vec![BatchItem::text("a", "hello")]), 0).unwrap();
        assert_eq!(envelope.modality, Modality::Text);
        assert_eq!(envelope.batch_size, 1);
    }

    #[test]
    fn test_envelope_json() {
        let envelope =
            JobEnvelope::new(Batch::new("acme", vec![BatchItem::image("a", "aGk=")]), 36).unwrap();
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: JobEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }
}
