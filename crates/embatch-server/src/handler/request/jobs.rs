use embatch_core::{Batch, BatchItem};
use serde::{Deserialize, Serialize};

/// Body of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessBatch {
    /// Items in the order their embeddings are delivered.
    pub items: Vec<BatchItem>,
    /// Tenant the embeddings are stored under.
    pub company_name: String,
}

impl From<ProcessBatch> for Batch {
    fn from(request: ProcessBatch) -> Self {
        Batch::new(request.company_name, request.items)
    }
}
