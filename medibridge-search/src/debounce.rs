//! Debounced drug search for interactive input.
//!
//! Every call to [`DebouncedSearch::submit`] takes a new generation number and
//! schedules a lookup after the quiet period. A scheduled lookup only runs if
//! no newer query was submitted while it waited. Lookups already running are
//! never cancelled, but their results are only published if nothing newer has
//! been published in the meantime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use medibridge_core::DrugRecord;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::service::DrugLookup;

/// Results of one lookup, stamped with the generation that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    /// Generation returned by the `submit` call this snapshot answers
    pub generation: u64,
    /// Query as submitted
    pub query: String,
    /// Matching drugs, at most the lookup's result limit
    pub results: Vec<DrugRecord>,
}

/// Debouncing front end for a [`DrugLookup`].
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct DebouncedSearch {
    lookup: Arc<DrugLookup>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    snapshots: Arc<watch::Sender<SearchSnapshot>>,
}

impl DebouncedSearch {
    /// Creates a debouncer waiting `delay` after each submission.
    pub fn new(lookup: Arc<DrugLookup>, delay: Duration) -> Self {
        let (snapshots, _) = watch::channel(SearchSnapshot::default());
        Self {
            lookup,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Receiver notified whenever a newer snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.snapshots.subscribe()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> SearchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Schedules a lookup for `query` and returns its generation.
    ///
    /// Queries too short to search publish an empty snapshot immediately.
    pub fn submit(&self, query: impl Into<String>) -> u64 {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.lookup.is_searchable(&query) {
            publish(
                &self.snapshots,
                SearchSnapshot {
                    generation,
                    query,
                    results: Vec::new(),
                },
            );
            return generation;
        }

        let lookup = Arc::clone(&self.lookup);
        let latest = Arc::clone(&self.generation);
        let snapshots = Arc::clone(&self.snapshots);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if latest.load(Ordering::SeqCst) != generation {
                trace!("Query '{query}' (generation {generation}) superseded before running");
                return;
            }

            let results = lookup.search(&query).await;
            publish(
                &snapshots,
                SearchSnapshot {
                    generation,
                    query,
                    results,
                },
            );
        });

        generation
    }

    /// Waits until the most recent submission has been answered.
    pub async fn settled(&self) -> SearchSnapshot {
        let target = self.generation.load(Ordering::SeqCst);
        let mut receiver = self.subscribe();

        match receiver.wait_for(|snapshot| snapshot.generation >= target).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.latest(),
        }
    }
}

fn publish(snapshots: &watch::Sender<SearchSnapshot>, snapshot: SearchSnapshot) -> bool {
    snapshots.send_if_modified(|current| {
        if snapshot.generation <= current.generation {
            debug!(
                "Dropping stale results for '{}' (generation {} <= {})",
                snapshot.query, snapshot.generation, current.generation
            );
            return false;
        }
        *current = snapshot;
        true
    })
}

#[cfg(test)]
mod tests {
    use medibridge_core::config::SearchConfig;

    use super::*;
    use crate::providers::MockProvider;

    const DELAY: Duration = Duration::from_millis(300);

    fn formulary() -> Vec<DrugRecord> {
        vec![
            DrugRecord::new("D1", "Paracetamol", None, None),
            DrugRecord::new("D2", "Cetirizine", None, None),
        ]
    }

    fn debounced(mock: MockProvider) -> DebouncedSearch {
        let lookup = DrugLookup::new(Box::new(mock), &SearchConfig::default());
        DebouncedSearch::new(Arc::new(lookup), DELAY)
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_within_window_runs_once() {
        let mock = MockProvider::new(formulary());
        let log = mock.query_log();
        let search = debounced(mock);

        search.submit("para");
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = search.submit("para");

        let snapshot = search.settled().await;
        assert_eq!(snapshot.generation, second);
        assert_eq!(snapshot.results.len(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_collapses_to_last_query() {
        let mock = MockProvider::new(formulary());
        let log = mock.query_log();
        let search = debounced(mock);

        for query in ["pa", "par", "para", "parac"] {
            search.submit(query);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let snapshot = search.settled().await;
        assert_eq!(snapshot.query, "parac");
        assert_eq!(*log.lock(), vec!["parac".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_publishes_empty_without_lookup() {
        let mock = MockProvider::new(formulary());
        let log = mock.query_log();
        let search = debounced(mock);

        let generation = search.submit("p");

        let snapshot = search.latest();
        assert_eq!(snapshot.generation, generation);
        assert!(snapshot.results.is_empty());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_does_not_overwrite_newer_results() {
        let mock = MockProvider::new(formulary()).with_delay("par", Duration::from_secs(1));
        let log = mock.query_log();
        let search = debounced(mock);

        search.submit("par");
        // Let the first lookup start, then supersede it while in flight
        tokio::time::sleep(Duration::from_millis(350)).await;
        let newer = search.submit("ceti");

        let snapshot = search.settled().await;
        assert_eq!(snapshot.generation, newer);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let latest = search.latest();
        assert_eq!(latest.query, "ceti");
        assert_eq!(latest.results[0].name(), "Cetirizine");
        assert_eq!(log.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_published_snapshots() {
        let search = debounced(MockProvider::new(formulary()));
        let mut receiver = search.subscribe();

        let generation = search.submit("ceti");
        receiver.changed().await.unwrap();

        assert_eq!(receiver.borrow().generation, generation);
        assert_eq!(receiver.borrow().results.len(), 1);
    }
}
