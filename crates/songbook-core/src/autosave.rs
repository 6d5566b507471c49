use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::DocumentStats;
use crate::status::StatusMachine;
use crate::store::DocumentStore;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

/// Trailing-edge debounce timer: `arm` replaces any pending timer, and only
/// a timer left alone for the full delay fires.
///
/// Cancelling only ever cancels the wait. Once the delay elapses the action
/// runs on its own task, so re-arming or cancelling cannot interrupt it.
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn arm<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = tokio::time::Instant::now() + self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tokio::spawn(action);
        });
        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drop the pending timer, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

/// Coalesces bursts of edits into one persist after a quiet period.
pub struct AutosaveScheduler {
    store: DocumentStore,
    status: StatusMachine,
    debouncer: Debouncer,
    stats: Arc<watch::Sender<DocumentStats>>,
}

impl AutosaveScheduler {
    pub fn new(store: DocumentStore, delay: Duration) -> Self {
        let status = store.status().clone();
        let (stats, _rx) = watch::channel(DocumentStats::default());
        Self {
            store,
            status,
            debouncer: Debouncer::new(delay),
            stats: Arc::new(stats),
        }
    }

    /// Record an edit: mark the journal active and restart the quiet-period
    /// timer. A persist already in flight is not affected; the one armed here
    /// queues behind it and writes whatever is in memory when it runs.
    pub fn on_edit(&self) {
        self.status.mark_active();
        let store = self.store.clone();
        let stats = self.stats.clone();
        self.debouncer.arm(async move {
            match store.persist().await {
                Ok(()) => {}
                // lock() already saved this edit before dropping the key
                Err(StoreError::Locked) => debug!("autosave skipped: journal locked"),
                Err(e) => warn!("autosave failed: {e}"),
            }
            stats.send_replace(store.stats());
        });
    }

    /// Cancel the pending timer and persist right away.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.debouncer.cancel();
        self.store.persist().await?;
        self.stats.send_replace(self.store.stats());
        Ok(())
    }

    pub fn cancel(&self) -> bool {
        self.debouncer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Stats as of the last autosave.
    pub fn last_stats(&self) -> DocumentStats {
        *self.stats.borrow()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<DocumentStats> {
        self.stats.subscribe()
    }
}
