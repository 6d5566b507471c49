//! Speech-to-text capability seam.
//!
//! The recognizer itself lives outside this crate. All the journal needs is a
//! model that can be loaded once and a call that turns audio into text.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::CapabilityError;
use crate::status::{AppStatus, StatusMachine};

/// Mono PCM samples as handed over by the recorder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Load the model. Called once before the first transcription and again
    /// after a failed load.
    async fn prepare(&self) -> Result<(), CapabilityError>;

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, CapabilityError>;
}

pub struct Dictation {
    transcriber: Box<dyn Transcriber>,
    ready: Mutex<bool>,
    status: StatusMachine,
}

impl Dictation {
    pub fn new(transcriber: Box<dyn Transcriber>, status: StatusMachine) -> Self {
        Self {
            transcriber,
            ready: Mutex::new(false),
            status,
        }
    }

    /// Turn `clip` into trimmed text, loading the model first if needed.
    /// Failures move the status to `Error` with the failure message. An empty
    /// clip yields empty text without touching the model.
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String, CapabilityError> {
        if clip.is_empty() {
            return Ok(String::new());
        }
        self.ensure_ready().await?;

        self.status.transition(AppStatus::ProcessingBackgroundTask);
        match self.transcriber.transcribe(clip).await {
            Ok(text) => {
                self.status.mark_idle();
                Ok(text.trim().to_string())
            }
            Err(e) => {
                warn!("transcription failed: {e}");
                self.status.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn ensure_ready(&self) -> Result<(), CapabilityError> {
        let mut ready = self.ready.lock().await;
        if *ready {
            return Ok(());
        }
        self.status.transition(AppStatus::LoadingCapability);
        match self.transcriber.prepare().await {
            Ok(()) => {
                info!("transcription model loaded");
                *ready = true;
                Ok(())
            }
            Err(e) => {
                warn!("transcription model failed to load: {e}");
                self.status.fail(e.to_string());
                Err(e)
            }
        }
    }
}
