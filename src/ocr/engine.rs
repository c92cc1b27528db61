//! OCR engine abstraction.
//!
//! The engine is an opaque capability: given an image, optionally return
//! recognized text. Real engines load a language model on first use, which
//! is why initialization is a separate, explicitly retried step.

use crate::capture::RasterBuffer;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by OCR engines and the dispatcher.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("engine initialization failed: {0}")]
    InitFailed(String),
    #[error("recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("recognition requested on a disposed dispatcher")]
    Disposed,
}

/// Trait for OCR engine implementations.
///
/// `init` runs once before the first recognition: it loads the language
/// model and applies the optional character allow-list. `recognize` returns
/// `Ok(None)` when the engine cannot decode or read the image; that is an
/// expected per-frame outcome, not an error.
#[async_trait]
pub trait OcrEngine: Send {
    /// Performs one-time engine initialization.
    async fn init(&mut self, allow_list: Option<&str>) -> Result<(), OcrError>;

    /// Recognizes text in the image, returning the raw (uncleaned) text.
    async fn recognize(&mut self, image: &RasterBuffer) -> Result<Option<String>, OcrError>;
}

/// Observable state of a [`MockOcrEngine`], shared with the test that
/// created it.
#[derive(Debug, Default)]
pub struct MockEngineState {
    /// Number of successful or failed init attempts.
    pub init_calls: u32,
    /// Allow-list passed to the most recent init.
    pub allow_list: Option<String>,
    /// Number of recognize calls.
    pub recognize_calls: u32,
}

/// Scriptable mock engine for tests and the demo binary.
///
/// Responses are consumed front to back; once the script runs out the
/// engine reports recognition failure. `None` entries simulate an
/// undecodable image.
pub struct MockOcrEngine {
    script: VecDeque<Option<String>>,
    init_failures: u32,
    state: Arc<Mutex<MockEngineState>>,
}

impl MockOcrEngine {
    /// Creates an engine that always reports recognition failure.
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    /// Creates an engine that replays the given responses in order.
    pub fn with_script(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            init_failures: 0,
            state: Arc::new(Mutex::new(MockEngineState::default())),
        }
    }

    /// Makes the first `times` init attempts fail.
    pub fn failing_init(mut self, times: u32) -> Self {
        self.init_failures = times;
        self
    }

    /// Returns a handle to the recorded call state.
    pub fn state(&self) -> Arc<Mutex<MockEngineState>> {
        Arc::clone(&self.state)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockEngineState> {
        // A poisoned mock is still observable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn init(&mut self, allow_list: Option<&str>) -> Result<(), OcrError> {
        let mut state = self.lock_state();
        state.init_calls += 1;
        state.allow_list = allow_list.map(str::to_owned);
        drop(state);

        if self.init_failures > 0 {
            self.init_failures -= 1;
            return Err(OcrError::InitFailed("scripted init failure".into()));
        }
        Ok(())
    }

    async fn recognize(&mut self, _image: &RasterBuffer) -> Result<Option<String>, OcrError> {
        self.lock_state().recognize_calls += 1;
        Ok(self.script.pop_front().flatten())
    }
}
