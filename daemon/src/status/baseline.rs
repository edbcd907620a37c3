use forgeserv_protocol::status::Snapshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct BaselineState {
    generation: u64,
    snapshot: Arc<Snapshot>,
}

/// Last broadcast snapshot, shared by every subscriber of one notifier.
///
/// Only ever replaced whole. `generation` grows by one per replacement so a
/// subscriber can tell that someone else already saw a change. The lock is
/// never held across an await point.
pub struct Baseline {
    state: Mutex<BaselineState>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self::new(Snapshot::new())
    }
}

impl Baseline {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(BaselineState {
                generation: 0,
                snapshot: Arc::new(snapshot),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BaselineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn current(&self) -> (u64, Arc<Snapshot>) {
        let state = self.lock();
        (state.generation, state.snapshot.clone())
    }

    pub fn replace(&self, snapshot: Snapshot) -> (u64, Arc<Snapshot>) {
        let mut state = self.lock();
        state.generation += 1;
        state.snapshot = Arc::new(snapshot);
        (state.generation, state.snapshot.clone())
    }

    /// Installs `candidate` unless it equals the current snapshot, record for
    /// record and in order.
    pub fn replace_if_changed(&self, candidate: Snapshot) -> Option<(u64, Arc<Snapshot>)> {
        let mut state = self.lock();
        if *state.snapshot == candidate {
            return None;
        }
        state.generation += 1;
        state.snapshot = Arc::new(candidate);
        Some((state.generation, state.snapshot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeserv_protocol::status::ServerStatusRecord;

    fn record(name: &str) -> ServerStatusRecord {
        ServerStatusRecord {
            name: name.into(),
            server_type: "Vanilla".into(),
            status: "running".into(),
            health: "healthy".into(),
            players: vec![],
            online: 0,
            max: 20,
            icon: None,
            motd: String::new(),
            version: "1.20.1".into(),
            dynmap: None,
        }
    }

    #[test]
    fn equal_snapshot_is_not_a_change() {
        let baseline = Baseline::new(vec![record("a"), record("b")]);
        assert!(baseline
            .replace_if_changed(vec![record("a"), record("b")])
            .is_none());
        assert_eq!(baseline.generation(), 0);
    }

    #[test]
    fn reordering_is_a_change() {
        let baseline = Baseline::new(vec![record("a"), record("b")]);
        let (generation, snapshot) = baseline
            .replace_if_changed(vec![record("b"), record("a")])
            .unwrap();
        assert_eq!(generation, 1);
        assert_eq!(snapshot[0].name, "b");
        assert_eq!(baseline.current().1, snapshot);
    }

    #[test]
    fn replaced_snapshot_is_new_reference() {
        let baseline = Baseline::default();
        let (_, before) = baseline.current();
        baseline.replace(vec![record("a")]);
        assert!(before.is_empty());
        assert_eq!(baseline.current().1.len(), 1);
        assert_eq!(baseline.generation(), 1);
    }
}
