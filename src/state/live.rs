//! Live queries over the catalog
//!
//! Every committed write that changed rows publishes the tables it touched
//! on a `ChangeFeed`.
//! A `LiveQuery` re-runs its query whenever one of the tables it reads
//! from changes, so callers see new snapshots without polling.

use crate::error::Result;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

/// Buffered change events per subscriber before it is considered lagged
const FEED_CAPACITY: usize = 64;

/// Tables a query can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ClothingItems,
    Categories,
    Outfits,
    OutfitItems,
}

/// Multicast publisher of table changes
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Table>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Announce committed changes to every current subscriber
    pub fn publish(&self, tables: &[Table]) {
        for table in tables {
            // No subscribers is fine
            let _ = self.tx.send(*table);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

type QueryFn<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A query that yields a fresh snapshot after every relevant write
///
/// The first call to `next`/`try_next` always yields the current snapshot.
/// Dropping the `LiveQuery` ends the subscription.
pub struct LiveQuery<T> {
    tables: Vec<Table>,
    rx: broadcast::Receiver<Table>,
    query: QueryFn<T>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub fn new<F>(feed: &ChangeFeed, tables: &[Table], query: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            tables: tables.to_vec(),
            rx: feed.subscribe(),
            query: Box::new(query),
            primed: false,
        }
    }

    /// Run the query now, independent of the subscription state
    pub fn current(&self) -> Result<T> {
        (self.query)()
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once the catalog behind the feed is gone.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if !self.primed {
            self.primed = true;
            return Some(self.current());
        }
        loop {
            match self.rx.recv().await {
                Ok(table) if self.depends_on(table) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live query lagged, refreshing");
                    break;
                }
                Err(RecvError::Closed) => return None,
            }
        }
        self.drain();
        Some(self.current())
    }

    /// Snapshot if something relevant changed since the last one, without waiting
    pub fn try_next(&mut self) -> Option<Result<T>> {
        if !self.primed {
            self.primed = true;
            return Some(self.current());
        }
        if self.drain() {
            Some(self.current())
        } else {
            None
        }
    }

    fn depends_on(&self, table: Table) -> bool {
        self.tables.contains(&table)
    }

    /// Consume queued events; true if any of them was relevant
    fn drain(&mut self) -> bool {
        let mut relevant = false;
        loop {
            match self.rx.try_recv() {
                Ok(table) => relevant |= self.depends_on(table),
                Err(TryRecvError::Lagged(_)) => relevant = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return relevant,
            }
        }
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("tables", &self.tables)
            .field("primed", &self.primed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_query(feed: &ChangeFeed, tables: &[Table]) -> (LiveQuery<u32>, Arc<AtomicU32>) {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let query = LiveQuery::new(feed, tables, move || Ok(counter.fetch_add(1, Ordering::SeqCst) + 1));
        (query, runs)
    }

    #[test]
    fn test_first_poll_yields_snapshot() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, &[Table::Categories]);

        assert_eq!(query.try_next().unwrap().unwrap(), 1);
        assert!(query.try_next().is_none());
    }

    #[test]
    fn test_unrelated_change_is_ignored() {
        let feed = ChangeFeed::new();
        let (mut query, runs) = counting_query(&feed, &[Table::Categories]);
        query.try_next();

        feed.publish(&[Table::Outfits]);

        assert!(query.try_next().is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_burst_coalesces_into_one_snapshot() {
        let feed = ChangeFeed::new();
        let (mut query, runs) = counting_query(&feed, &[Table::ClothingItems]);
        query.try_next();

        feed.publish(&[Table::ClothingItems, Table::Categories]);
        feed.publish(&[Table::ClothingItems]);

        assert_eq!(query.try_next().unwrap().unwrap(), 2);
        assert!(query.try_next().is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lagged_subscriber_refreshes() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, &[Table::Categories]);
        query.try_next();

        for _ in 0..(FEED_CAPACITY * 2) {
            feed.publish(&[Table::Outfits]);
        }

        assert!(query.try_next().is_some());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new();
        let (query, _) = counting_query(&feed, &[Table::Categories]);
        assert_eq!(feed.subscriber_count(), 1);
        drop(query);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_next_waits_for_relevant_change() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, &[Table::Outfits, Table::OutfitItems]);
        assert_eq!(query.next().await.unwrap().unwrap(), 1);

        let publisher = feed.clone();
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            publisher.publish(&[Table::Categories]);
            publisher.publish(&[Table::OutfitItems]);
        });

        assert_eq!(query.next().await.unwrap().unwrap(), 2);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_next_ends_when_feed_is_gone() {
        let feed = ChangeFeed::new();
        let (mut query, _) = counting_query(&feed, &[Table::Categories]);
        query.next().await;

        drop(feed);

        assert!(query.next().await.is_none());
    }
}
