//! Process-wide lazy handle to the rules index.
//!
//! The first `get()` runs the loader; concurrent first callers wait on the
//! same in-flight load and every caller sees the same outcome. The outcome
//! is kept for the life of the process, including a failed load: re-ingest
//! and restart to pick up a new collection.

use std::sync::Arc;

use chrono::Utc;
use judgebot_core::error::IndexError;
use judgebot_core::event::{DomainEvent, EventBus};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::index::{IndexLoader, RulesIndex};

#[derive(Debug, Clone, PartialEq)]
pub enum IndexState {
    Uninitialized,
    Ready { entries: usize },
    Unavailable(IndexError),
}

pub struct SharedRulesIndex {
    loader: Box<dyn IndexLoader>,
    cell: OnceCell<Result<Arc<RulesIndex>, IndexError>>,
    event_bus: Option<Arc<EventBus>>,
}

impl SharedRulesIndex {
    pub fn new(loader: impl IndexLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// The loaded index, loading it on first use.
    pub async fn get(&self) -> Result<Arc<RulesIndex>, IndexError> {
        self.cell
            .get_or_init(|| async {
                let outcome = self.loader.load().await.map(Arc::new);
                if let Err(e) = &outcome {
                    warn!(error = %e, "Rules index unavailable");
                }
                if let Some(bus) = &self.event_bus {
                    bus.publish(DomainEvent::RulesIndexLoaded {
                        entries: outcome.as_ref().map_or(0, |i| i.len()),
                        available: outcome.is_ok(),
                        timestamp: Utc::now(),
                    });
                }
                outcome
            })
            .await
            .clone()
    }

    /// Where the handle is in its lifecycle; never triggers a load.
    pub fn state(&self) -> IndexState {
        match self.cell.get() {
            None => IndexState::Uninitialized,
            Some(Ok(index)) => IndexState::Ready {
                entries: index.len(),
            },
            Some(Err(e)) => IndexState::Unavailable(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::store::CollectionManifest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl IndexLoader for CountingLoader {
        async fn load(&self) -> Result<RulesIndex, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(IndexError::NotAvailable("no collection".into()));
            }
            Ok(RulesIndex::from_parts(
                CollectionManifest {
                    collection: "rules".into(),
                    embedder: "hashing".into(),
                    dimensions: 8,
                    chunk_count: 0,
                    built_at: Utc::now(),
                },
                vec![],
                Arc::new(HashingEmbedder::new(8)),
            ))
        }
    }

    fn shared(fail: bool) -> (Arc<SharedRulesIndex>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let index = SharedRulesIndex::new(CountingLoader {
            calls: calls.clone(),
            fail,
        });
        (Arc::new(index), calls)
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_load() {
        let (index, calls) = shared(false);
        assert_eq!(index.state(), IndexState::Uninitialized);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                tokio::spawn(async move { index.get().await })
            })
            .collect();

        let mut loaded = Vec::new();
        for handle in handles {
            loaded.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(index.state(), IndexState::Ready { entries: 0 });
    }

    #[tokio::test]
    async fn failure_is_cached_and_shared() {
        let (index, calls) = shared(true);

        let (a, b) = tokio::join!(index.get(), index.get());
        assert_eq!(a.unwrap_err(), IndexError::NotAvailable("no collection".into()));
        assert_eq!(b.unwrap_err(), IndexError::NotAvailable("no collection".into()));
        assert!(index.get().await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(index.state(), IndexState::Unavailable(IndexError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn publishes_load_event() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let index = SharedRulesIndex::new(CountingLoader { calls, fail: true }).with_event_bus(bus);

        let _ = index.get().await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            *event,
            DomainEvent::RulesIndexLoaded { available: false, entries: 0, .. }
        ));
    }
}
