use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::sqlite::Store;
use crate::error::{Error, Result};

type Job = Box<dyn FnOnce(&mut Store) + Send>;

/// Handle to the single store writer.
///
/// The writer is a dedicated thread that owns the [`Store`]; every access
/// goes through its job queue, so store operations from concurrent tasks
/// never interleave and are applied in submission order. Repositories
/// publish their snapshots from inside the job, which makes the
/// mutation→republish pairing part of that same total order.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Job>,
}

impl StoreHandle {
    /// Move the store onto its writer thread and return a handle to it.
    pub fn spawn(mut store: Store) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(64);
        thread::spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                job(&mut store);
            }
            debug!("store writer finished");
        });
        Self { tx }
    }

    /// Run a closure against the store, suspending the caller until the
    /// writer has executed it.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |store| {
            // The caller may have been cancelled; a dropped receiver is fine.
            let _ = reply_tx.send(f(store));
        });
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Storage("store writer has shut down".into()))?;
        reply_rx
            .await
            .map_err(|_| Error::Storage("store writer has shut down".into()))?
    }
}
