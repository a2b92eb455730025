//! Reactive repositories over the store
//!
//! Each repository keeps watch-channel snapshots of its tables that are
//! republished after every mutation, and funnels all store access through
//! the single writer.

mod places;
mod recordings;

pub use places::PlacesRepository;
pub use recordings::RecordingsRepository;

use std::sync::Arc;
use tokio::sync::watch;

/// Reactive snapshot of one store table: the rows and their count,
/// republished as a unit.
///
/// Mutations clone the table handle into the store writer's job and call
/// [`publish`](Self::publish) there with a fresh re-read, so every
/// republish carries a verbatim store state and lands in write order.
/// Readers get the current snapshot without touching the store.
struct ReactiveTable<T> {
    rows_tx: watch::Sender<Arc<Vec<T>>>,
    count_tx: watch::Sender<usize>,
}

impl<T> ReactiveTable<T> {
    fn new(rows: Vec<T>) -> Self {
        let (count_tx, _) = watch::channel(rows.len());
        let (rows_tx, _) = watch::channel(Arc::new(rows));
        Self { rows_tx, count_tx }
    }

    fn watch_rows(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.rows_tx.subscribe()
    }

    fn watch_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn borrow_rows(&self) -> watch::Ref<'_, Arc<Vec<T>>> {
        self.rows_tx.borrow()
    }

    /// Swap in a new snapshot, notifying all subscribers.
    fn publish(&self, rows: Vec<T>) {
        self.count_tx.send_replace(rows.len());
        self.rows_tx.send_replace(Arc::new(rows));
    }
}

impl<T> Clone for ReactiveTable<T> {
    fn clone(&self) -> Self {
        Self {
            rows_tx: self.rows_tx.clone(),
            count_tx: self.count_tx.clone(),
        }
    }
}
