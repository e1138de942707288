//! # Change Feed & Live Queries
//!
//! Every committed write publishes a [`Change`]. A live query subscribes to
//! the feed, yields an initial snapshot, and re-runs its query whenever a
//! relevant change for the same user arrives.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Live Query Flow                                 │
//! │                                                                         │
//! │  repo write ──commit──► ChangeFeed::publish(Change{Products, user})     │
//! │                              │  (tokio broadcast)                       │
//! │             ┌────────────────┼────────────────┐                         │
//! │             ▼                ▼                ▼                         │
//! │        LiveQuery A      LiveQuery B      LiveQuery C                    │
//! │        products/u1      sales/u1         invoices/u2  (ignores u1)      │
//! │             │                                                           │
//! │             ▼                                                           │
//! │        re-run fetch() ──► next snapshot                                 │
//! │                                                                         │
//! │  • Subscribe happens BEFORE the first fetch: no gap                     │
//! │  • A burst of changes (or a lagged receiver) yields ONE re-fetch        │
//! │  • Dropping the stream drops the receiver: unsubscribed                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace};

use crate::error::DbResult;

/// Buffered changes per subscriber before it is considered lagged.
const FEED_CAPACITY: usize = 256;

/// What kind of record a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Sales,
    Invoices,
}

/// A committed write, scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub collection: Collection,
    pub user_id: String,
}

/// Process-wide broadcast of committed writes.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Change>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A stream of snapshots; `Unpin` so callers can poll it directly.
pub type LiveStream<T> = Pin<Box<dyn Stream<Item = DbResult<T>> + Send>>;

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed { tx }
    }

    /// Announces a committed write. Having no subscribers is not an error.
    pub fn publish(&self, collection: Collection, user_id: &str) {
        let receivers = self
            .tx
            .send(Change {
                collection,
                user_id: user_id.to_string(),
            })
            .unwrap_or(0);
        trace!(?collection, user_id, receivers, "Change published");
    }

    /// Number of live subscriptions currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Builds a live query.
    ///
    /// `fetch` runs once immediately, then again after each burst of changes
    /// to any of `watch` for `user_id`. The stream ends only when the feed
    /// itself is gone.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let repo = db.products();
    /// let live = db.feed().live(user_id, &[Collection::Products], move || {
    ///     let repo = repo.clone();
    ///     let user = user.clone();
    ///     async move { repo.list(&user).await }
    /// });
    /// ```
    pub fn live<T, F, Fut>(&self, user_id: &str, watch: &'static [Collection], fetch: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
    {
        let state = LiveState {
            rx: self.tx.subscribe(),
            user_id: user_id.to_string(),
            watch,
            fetch,
            primed: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            if state.primed && !state.wait_for_change().await {
                debug!(user_id = %state.user_id, "Change feed closed, ending live query");
                return None;
            }
            state.primed = true;
            let snapshot = (state.fetch)().await;
            Some((snapshot, state))
        }))
    }
}

struct LiveState<F> {
    rx: broadcast::Receiver<Change>,
    user_id: String,
    watch: &'static [Collection],
    fetch: F,
    primed: bool,
}

impl<F> LiveState<F> {
    fn is_relevant(&self, change: &Change) -> bool {
        change.user_id == self.user_id && self.watch.contains(&change.collection)
    }

    /// Waits for a relevant change, then drains whatever else is already
    /// queued. Returns `false` once the feed is closed.
    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.is_relevant(&change) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Live query lagged, re-fetching");
                    break;
                }
                Err(RecvError::Closed) => return false,
            }
        }

        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Closed) => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting(counter: Arc<AtomicUsize>) -> impl Fn() -> futures::future::Ready<DbResult<usize>> {
        move || futures::future::ready(Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_refetch_on_change() {
        let feed = ChangeFeed::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut live = feed.live("u1", &[Collection::Products], counting(counter.clone()));

        assert_eq!(live.next().await.unwrap().unwrap(), 1);

        feed.publish(Collection::Products, "u1");
        assert_eq!(live.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ignores_other_users_and_collections() {
        let feed = ChangeFeed::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut live = feed.live("u1", &[Collection::Invoices], counting(counter.clone()));
        live.next().await.unwrap().unwrap();

        feed.publish(Collection::Invoices, "u2");
        feed.publish(Collection::Products, "u1");

        let next = tokio::time::timeout(Duration::from_millis(50), live.next()).await;
        assert!(next.is_err(), "no snapshot expected for unrelated changes");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let feed = ChangeFeed::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut live = feed.live("u1", &[Collection::Sales], counting(counter.clone()));
        live.next().await.unwrap().unwrap();

        for _ in 0..5 {
            feed.publish(Collection::Sales, "u1");
        }
        assert_eq!(live.next().await.unwrap().unwrap(), 2);

        let next = tokio::time::timeout(Duration::from_millis(50), live.next()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new();
        let live = feed.live("u1", &[Collection::Sales], counting(Arc::new(AtomicUsize::new(0))));
        assert_eq!(feed.subscriber_count(), 1);
        drop(live);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
