use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    #[default]
    Idle,
    Active,
    Saving,
    Fetching,
    LoadingCapability,
    ProcessingBackgroundTask,
    Error,
}

impl AppStatus {
    /// Badge text shown by the presentation layer.
    pub fn label(&self) -> &'static str {
        match self {
            AppStatus::Idle => "Ready",
            AppStatus::Active => "Typing...",
            AppStatus::Saving => "Saving...",
            AppStatus::Fetching => "Fetching...",
            AppStatus::LoadingCapability => "Loading AI...",
            AppStatus::ProcessingBackgroundTask => "Thinking...",
            AppStatus::Error => "Error",
        }
    }
}

/// Shared status handle. Clones observe and drive the same machine.
///
/// Transitions are plain replacements: the latest call wins and nothing is
/// queued. `Error` stays until some later operation moves the machine on.
#[derive(Debug, Clone)]
pub struct StatusMachine {
    tx: Arc<watch::Sender<AppStatus>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppStatus::Idle);
        Self {
            tx: Arc::new(tx),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn current(&self) -> AppStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppStatus> {
        self.tx.subscribe()
    }

    /// Message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn transition(&self, next: AppStatus) {
        let prev = self.tx.send_replace(next);
        if prev != next {
            info!("state transition: {:?} -> {:?}", prev, next);
        }
    }

    pub fn mark_active(&self) {
        if self.current() != AppStatus::Active {
            self.transition(AppStatus::Active);
        }
    }

    pub fn mark_idle(&self) {
        self.transition(AppStatus::Idle);
    }

    pub fn fail(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
        self.transition(AppStatus::Error);
    }
}
