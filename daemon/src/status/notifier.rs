use forgeserv_protocol::status::Snapshot;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Baseline, StatusSource};

/// Turns repeated assembly into a stream of changed snapshots.
pub struct ChangeDetectingNotifier {
    source: Arc<dyn StatusSource>,
    baseline: Arc<Baseline>,
    interval: Duration,
}

impl ChangeDetectingNotifier {
    pub fn new(source: Arc<dyn StatusSource>, baseline: Arc<Baseline>, interval: Duration) -> Self {
        Self {
            source,
            baseline,
            interval,
        }
    }

    pub fn baseline(&self) -> &Arc<Baseline> {
        &self.baseline
    }

    /// Seeds the baseline so the first broadcast is a real change.
    pub async fn prime(&self) {
        let snapshot = self.source.assemble_all().await;
        debug!("baseline primed with {} record(s)", snapshot.len());
        self.baseline.replace(snapshot);
    }

    /// Polls until the status differs from what this subscriber last saw.
    ///
    /// `seen` is the baseline generation the subscriber last received. If
    /// another subscriber already moved the baseline past it, that snapshot
    /// is returned without polling.
    pub async fn wait_for_change(&self, seen: &mut u64) -> Arc<Snapshot> {
        loop {
            let (generation, current) = self.baseline.current();
            if generation != *seen {
                *seen = generation;
                return current;
            }

            let candidate = self.source.assemble_all().await;
            if let Some((generation, snapshot)) = self.baseline.replace_if_changed(candidate) {
                debug!("status changed, baseline generation {}", generation);
                *seen = generation;
                return snapshot;
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Starts a polling loop for one subscriber.
    ///
    /// The loop ends when the [`Subscription`] is dropped; other subscribers
    /// keep running.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, receiver) = mpsc::channel(1);
        let notifier = self.clone();
        let mut seen = self.baseline.generation();

        let task = tokio::spawn(async move {
            loop {
                let snapshot = tokio::select! {
                    snapshot = notifier.wait_for_change(&mut seen) => snapshot,
                    _ = tx.closed() => break,
                };
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
            debug!("subscriber loop finished");
        });

        Subscription { receiver, task }
    }
}

/// Receiving end of one subscriber's polling loop.
pub struct Subscription {
    receiver: mpsc::Receiver<Arc<Snapshot>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Next changed snapshot; `None` once the loop has stopped.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeserv_protocol::status::ServerStatusRecord;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::timeout;

    const INTERVAL: Duration = Duration::from_millis(10);
    const QUIET: Duration = Duration::from_millis(150);
    const WAIT: Duration = Duration::from_secs(2);

    /// Returns whatever snapshot the test last set.
    #[derive(Default)]
    struct SettableSource {
        current: Mutex<Snapshot>,
        calls: AtomicUsize,
    }

    impl SettableSource {
        fn set(&self, snapshot: Snapshot) {
            *self.current.lock().unwrap() = snapshot;
        }
    }

    #[async_trait::async_trait]
    impl StatusSource for SettableSource {
        async fn assemble_all(&self) -> Snapshot {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.current.lock().unwrap().clone()
        }
    }

    fn record(name: &str, online: usize) -> ServerStatusRecord {
        ServerStatusRecord {
            name: name.into(),
            server_type: "Vanilla".into(),
            status: "running".into(),
            health: "healthy".into(),
            players: vec![],
            online,
            max: 20,
            icon: None,
            motd: "hi".into(),
            version: "1.20.1".into(),
            dynmap: None,
        }
    }

    fn notifier(initial: Snapshot) -> (Arc<SettableSource>, Arc<ChangeDetectingNotifier>) {
        let source = Arc::new(SettableSource::default());
        source.set(initial.clone());
        let notifier = Arc::new(ChangeDetectingNotifier::new(
            source.clone(),
            Arc::new(Baseline::new(initial)),
            INTERVAL,
        ));
        (source, notifier)
    }

    #[tokio::test]
    async fn unchanged_status_is_not_broadcast() {
        let (source, notifier) = notifier(vec![record("a", 0)]);
        let mut subscription = notifier.subscribe();

        assert!(timeout(QUIET, subscription.next()).await.is_err());
        assert!(source.calls.load(Ordering::SeqCst) > 1);
        assert_eq!(notifier.baseline().generation(), 0);
    }

    #[tokio::test]
    async fn change_is_broadcast_once_and_becomes_baseline() {
        let (source, notifier) = notifier(vec![record("a", 0)]);
        let mut subscription = notifier.subscribe();

        let changed = vec![record("a", 1)];
        source.set(changed.clone());
        let received = timeout(WAIT, subscription.next()).await.unwrap().unwrap();
        assert_eq!(*received, changed);
        assert_eq!(*notifier.baseline().current().1, changed);

        assert!(timeout(QUIET, subscription.next()).await.is_err());
    }

    #[tokio::test]
    async fn reordering_is_broadcast() {
        let (source, notifier) = notifier(vec![record("a", 0), record("b", 0)]);
        let mut subscription = notifier.subscribe();

        source.set(vec![record("b", 0), record("a", 0)]);
        let received = timeout(WAIT, subscription.next()).await.unwrap().unwrap();
        let names: Vec<_> = received.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn every_subscriber_gets_the_first_change() {
        let (source, notifier) = notifier(vec![record("a", 0)]);
        let mut early = notifier.subscribe();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let mut late = notifier.subscribe();

        source.set(vec![record("a", 1)]);
        let from_early = timeout(WAIT, early.next()).await.unwrap().unwrap();
        let from_late = timeout(WAIT, late.next()).await.unwrap().unwrap();
        assert_eq!(from_early, from_late);
        assert_eq!(notifier.baseline().generation(), 1);

        source.set(vec![record("a", 2)]);
        assert_eq!(timeout(WAIT, early.next()).await.unwrap().unwrap()[0].online, 2);
        assert_eq!(timeout(WAIT, late.next()).await.unwrap().unwrap()[0].online, 2);
    }

    #[tokio::test]
    async fn dropped_subscriber_leaves_others_running() {
        let (source, notifier) = notifier(vec![record("a", 0)]);
        let gone = notifier.subscribe();
        let mut staying = notifier.subscribe();
        drop(gone);

        source.set(vec![record("a", 5)]);
        let received = timeout(WAIT, staying.next()).await.unwrap().unwrap();
        assert_eq!(received[0].online, 5);
        assert_eq!(notifier.baseline().current().1[0].online, 5);
    }

    #[tokio::test]
    async fn dropped_subscriber_stops_polling() {
        let (source, notifier) = notifier(vec![record("a", 0)]);
        let subscription = notifier.subscribe();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(subscription);
        tokio::time::sleep(Duration::from_millis(30)).await;

        let calls = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn prime_replaces_baseline() {
        let (source, notifier) = notifier(vec![]);
        source.set(vec![record("a", 0)]);
        notifier.prime().await;
        assert_eq!(notifier.baseline().current().1.len(), 1);

        let mut seen = 0;
        let snapshot = notifier.wait_for_change(&mut seen).await;
        assert_eq!(seen, 1);
        assert_eq!(snapshot.len(), 1);
    }
}
