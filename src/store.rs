use crate::model::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};

/// Latest-snapshot handoff between the poller and status readers. The poller
/// is the single writer; any number of status queries read concurrently.
/// Each `set` replaces the whole snapshot, so readers never observe a mix of
/// cycles.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Snapshot>>,
}

impl SnapshotStore {
    /// Store holding the pre-first-cycle placeholder.
    pub fn new() -> Self {
        SnapshotStore::default()
    }

    pub fn set(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn get(&self) -> Snapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
