//! Per-id write tracking between decorator writes and detached mirrors.
//!
//! A mirror copies what the source returned at some point in the past. If
//! the decorator wrote or removed the same id since then, the copy is stale
//! and must not reach the cache. Mirrors take a [`Snapshot`] before asking
//! the source; writes hold a [`WriteMark`] from their cache step until the
//! source step is done. Both touch the cache only while holding the gate,
//! so a staleness check and the write it guards cannot interleave with a
//! decorator write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stowage_core::RecordId;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

#[derive(Debug, Default)]
struct Mark {
    in_flight: usize,
    generation: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    generation: u64,
    marks: HashMap<RecordId, Mark>,
    snapshots: usize,
}

impl LedgerState {
    /// Marks only matter to live snapshots; drop settled ones otherwise.
    fn prune(&mut self) {
        if self.snapshots == 0 {
            self.marks.retain(|_, mark| mark.in_flight > 0);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct WriteLedger {
    state: Mutex<LedgerState>,
    gate: AsyncMutex<()>,
}

impl WriteLedger {
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serializes cache writes of the decorator and its mirrors.
    pub(crate) async fn gate(&self) -> AsyncMutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Record the point in time a source read starts from.
    pub(crate) fn snapshot(self: &Arc<Self>) -> Snapshot {
        let mut state = self.state();
        state.snapshots += 1;
        Snapshot {
            ledger: Arc::clone(self),
            generation: state.generation,
        }
    }

    /// Announce a decorator write to `id`. Call with the gate held.
    pub(crate) fn begin_write(self: &Arc<Self>, id: &RecordId) -> WriteMark {
        self.state().marks.entry(id.clone()).or_default().in_flight += 1;
        WriteMark {
            ledger: Arc::clone(self),
            id: id.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.state().marks.len()
    }
}

/// Generation seen by a mirror before it read the source.
pub(crate) struct Snapshot {
    ledger: Arc<WriteLedger>,
    generation: u64,
}

impl Snapshot {
    /// Whether `id` was written since this snapshot, or is being written.
    pub(crate) fn is_stale(&self, id: &RecordId) -> bool {
        self.ledger
            .state()
            .marks
            .get(id)
            .is_some_and(|mark| mark.in_flight > 0 || mark.generation > self.generation)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        let mut state = self.ledger.state();
        state.snapshots -= 1;
        state.prune();
    }
}

/// An in-progress decorator write; completes on drop.
pub(crate) struct WriteMark {
    ledger: Arc<WriteLedger>,
    id: RecordId,
}

impl Drop for WriteMark {
    fn drop(&mut self) {
        let mut state = self.ledger.state();
        state.generation += 1;
        let generation = state.generation;
        if let Some(mark) = state.marks.get_mut(&self.id) {
            mark.in_flight -= 1;
            mark.generation = generation;
        }
        state.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_after_snapshot_is_stale() {
        let ledger = Arc::new(WriteLedger::default());
        let id = RecordId::from("k");

        let snapshot = ledger.snapshot();
        assert!(!snapshot.is_stale(&id));

        let mark = ledger.begin_write(&id);
        assert!(snapshot.is_stale(&id));
        drop(mark);
        assert!(snapshot.is_stale(&id));
        assert!(!snapshot.is_stale(&RecordId::from("other")));
    }

    #[test]
    fn test_completed_write_before_snapshot_is_not_stale() {
        let ledger = Arc::new(WriteLedger::default());
        let id = RecordId::from("k");

        let _older = ledger.snapshot();
        drop(ledger.begin_write(&id));

        let snapshot = ledger.snapshot();
        assert!(!snapshot.is_stale(&id));
    }

    #[test]
    fn test_in_flight_write_is_stale_for_later_snapshot() {
        let ledger = Arc::new(WriteLedger::default());
        let id = RecordId::from("k");

        let mark = ledger.begin_write(&id);
        let snapshot = ledger.snapshot();
        assert!(snapshot.is_stale(&id));
        drop(mark);
        assert!(snapshot.is_stale(&id));
    }

    #[test]
    fn test_marks_are_pruned_without_snapshots() {
        let ledger = Arc::new(WriteLedger::default());

        drop(ledger.begin_write(&RecordId::from("a")));
        assert_eq!(ledger.tracked(), 0);

        let snapshot = ledger.snapshot();
        drop(ledger.begin_write(&RecordId::from("b")));
        assert_eq!(ledger.tracked(), 1);

        drop(snapshot);
        assert_eq!(ledger.tracked(), 0);
    }
}
