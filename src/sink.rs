//! Result Sink (§6): the external collaborator C9 hands a
//! `PersistedRecord` to. The core only depends on this trait — tenant
//! scoping, the real storage schema, and connection pooling are the
//! sink implementation's problem, explicitly out of scope (§1).
//!
//! `InMemorySink` is the crate's own reference implementation, good
//! enough for the CLI and for tests; a real deployment swaps in a sink
//! backed by its row store without the pipeline noticing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PipelineError, PipelineResult};
use crate::result::{PersistedRecord, Receipt, ReceiptId};

/// `persist(record) -> receipt_id` / `fetch(receipt_id) -> record |
/// not_found` (§6). Fire-and-forget is not allowed: `persist` always
/// returns a receipt or a `SinkUnavailable` error.
pub trait ResultSink: Send + Sync {
    /// # Errors
    /// Returns `PipelineError::SinkUnavailable` if the handoff fails.
    fn persist(&self, record: PersistedRecord) -> PipelineResult<Receipt>;

    /// `None` on a `not_found` lookup; the sink itself is responsible
    /// for tenant-scoping this lookup in a real deployment.
    fn fetch(&self, id: ReceiptId) -> Option<PersistedRecord>;
}

/// A process-local, in-memory sink. Not durable across restarts; exists
/// so the pipeline is runnable end-to-end without an external store.
///
/// Records are held as `serde_json`-serialized bytes rather than the
/// typed struct directly, mirroring the teacher's `storage::strategic`
/// sled tables (`serde_json::to_vec` on write, `from_slice` on read) —
/// the same "serialize at the storage boundary" shape a real row store
/// or `sled` tree would need, just backed by a `HashMap` instead of a
/// disk-backed tree (§1: the real persistence schema is out of scope).
#[derive(Default)]
pub struct InMemorySink {
    records: RwLock<HashMap<ReceiptId, Vec<u8>>>,
}

impl InMemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for InMemorySink {
    fn persist(&self, record: PersistedRecord) -> PipelineResult<Receipt> {
        let id = record.analysis_id;
        let bytes = serde_json::to_vec(&record)
            .map_err(|err| PipelineError::SinkUnavailable(format!("failed to serialize record: {err}")))?;
        let mut guard = self
            .records
            .write()
            .map_err(|_| PipelineError::SinkUnavailable("sink lock poisoned".to_string()))?;
        guard.insert(id, bytes);
        Ok(Receipt { id })
    }

    fn fetch(&self, id: ReceiptId) -> Option<PersistedRecord> {
        let bytes = self.records.read().ok()?.get(&id)?.clone();
        serde_json::from_slice(&bytes).ok()
    }
}
