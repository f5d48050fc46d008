/// Engine-owned state and its transaction boundary.
/// A transaction works on copies and writes them back only on commit.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::audit::AuditLog;
use crate::error::{EngineError, Result};
use crate::network::Network;
use crate::snapshot::{Snapshot, SnapshotId, SnapshotSummary};

/// Everything the engine mutates
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) network: Network,
    pub(crate) log: AuditLog,
    pub(crate) snapshots: Vec<Snapshot>,
    next_snapshot_id: SnapshotId,
}

impl EngineState {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            log: AuditLog::new(),
            snapshots: Vec::new(),
            next_snapshot_id: 1,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<&Snapshot> {
        self.snapshots
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| EngineError::not_found("snapshot", id))
    }

    /// Capture the current network under a new id. Snapshots are never replaced.
    pub fn save_snapshot(
        &mut self,
        label: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotSummary> {
        let snapshot = Snapshot::capture(self.next_snapshot_id, label, &self.network, created_at)?;
        let summary = snapshot.summary();
        self.snapshots.push(snapshot);
        self.next_snapshot_id += 1;
        Ok(summary)
    }

    pub fn begin(&mut self) -> Transaction<'_> {
        Transaction {
            network: self.network.clone(),
            log: self.log.clone(),
            base: self,
        }
    }
}

/// Private working copy of the network and log
pub struct Transaction<'a> {
    base: &'a mut EngineState,
    pub network: Network,
    pub log: AuditLog,
}

impl<'a> Transaction<'a> {
    /// Log length before any change in this transaction
    pub fn base_log_len(&self) -> usize {
        self.base.log.len()
    }

    pub fn commit(self) {
        self.base.network = self.network;
        self.base.log = self.log;
    }

    /// Run `work` on a fresh transaction; commit on Ok, discard on Err.
    pub fn run<T>(
        state: &mut EngineState,
        work: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = state.begin();
        match work(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                if !err.is_precondition() {
                    warn!(error = %err, "transaction rolled back");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, demo_network};

    #[test]
    fn test_commit_applies_changes() {
        let mut state = EngineState::new(demo_network().unwrap());
        Transaction::run(&mut state, |tx| {
            tx.network.flight_mut(1)?.apply_delay(30)?;
            tx.log.record(1, 30, "Weather", None, 0, 0, at(6, 0));
            Ok(())
        })
        .unwrap();

        assert_eq!(state.network().flight(1).unwrap().delay_minutes, 30);
        assert_eq!(state.log().len(), 1);
    }

    #[test]
    fn test_error_discards_changes() {
        let mut state = EngineState::new(demo_network().unwrap());
        let result: Result<()> = Transaction::run(&mut state, |tx| {
            tx.network.flight_mut(1)?.apply_delay(30)?;
            tx.log.record(1, 30, "Weather", None, 0, 0, at(6, 0));
            Err(EngineError::storage("disk on fire"))
        });

        assert!(result.is_err());
        assert_eq!(state.network().flight(1).unwrap().delay_minutes, 0);
        assert!(state.log().is_empty());
    }

    #[test]
    fn test_dropped_transaction_is_rollback() {
        let mut state = EngineState::new(demo_network().unwrap());
        {
            let mut tx = state.begin();
            tx.network.flight_mut(2).unwrap().apply_delay(10).unwrap();
        }
        assert_eq!(state.network().flight(2).unwrap().delay_minutes, 0);
    }

    #[test]
    fn test_snapshot_ids_increase() {
        let mut state = EngineState::new(demo_network().unwrap());
        let a = state.save_snapshot("a", at(6, 0)).unwrap();
        let b = state.save_snapshot("b", at(7, 0)).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(state.snapshot(2).unwrap().label, "b");
        assert!(matches!(state.snapshot(9), Err(EngineError::NotFound { .. })));
    }
}
