//! Serialized OCR dispatch.
//!
//! The dispatcher owns the engine capability and guarantees at most one
//! recognition is in flight: a request arriving while busy is dropped
//! without touching the outstanding one. Engine initialization happens
//! lazily on the first request and is retried on the next request if it
//! fails.

use super::engine::{OcrEngine, OcrError};
use super::subscriber::RecognitionHandler;
use crate::capture::RasterBuffer;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{broadcast, Mutex};

/// Broadcast buffer for the non-blocking notification path; slow receivers
/// lose old results rather than stalling recognition.
const NOTIFY_CAPACITY: usize = 16;

/// Lifecycle states of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatcherState {
    /// Engine not yet initialized; the first request will initialize it.
    Uninitialized = 0,
    /// Engine initialized and idle.
    Ready = 1,
    /// A recognition is in flight; new requests are dropped.
    Busy = 2,
    /// Torn down; no further requests are accepted.
    Disposed = 3,
}

impl DispatcherState {
    fn from_u8(value: u8) -> DispatcherState {
        match value {
            0 => DispatcherState::Uninitialized,
            1 => DispatcherState::Ready,
            2 => DispatcherState::Busy,
            _ => DispatcherState::Disposed,
        }
    }

    /// Returns whether transitioning from `self` to `next` is valid.
    ///
    /// Requests pass through `Busy` even for the initializing first call;
    /// `Busy -> Uninitialized` is the init-failure retry path. Disposal is
    /// reachable from every state.
    pub fn can_transition_to(self, next: DispatcherState) -> bool {
        matches!(
            (self, next),
            (DispatcherState::Uninitialized, DispatcherState::Busy)
                | (DispatcherState::Ready, DispatcherState::Busy)
                | (DispatcherState::Busy, DispatcherState::Ready)
                | (DispatcherState::Busy, DispatcherState::Uninitialized)
                | (_, DispatcherState::Disposed)
        )
    }
}

/// What became of one recognition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Recognition ran; the cleaned text, or `None` when the engine could
    /// not read the image or nothing remained after cleaning.
    Completed(Option<String>),
    /// A recognition was already in flight; this frame was dropped.
    Dropped,
    /// The dispatcher was disposed while this request was in flight; the
    /// result was discarded without notifying subscribers.
    Discarded,
}

/// Serializes access to the OCR engine and fans results out to subscribers.
pub struct OcrDispatcher<E: OcrEngine> {
    engine: Mutex<Option<E>>,
    state: AtomicU8,
    allow_list: Option<String>,
    handlers: Vec<Box<dyn RecognitionHandler>>,
    notify_tx: broadcast::Sender<String>,
}

impl<E: OcrEngine> OcrDispatcher<E> {
    /// Creates a dispatcher owning `engine`.
    ///
    /// The allow-list is applied during the engine's one-time
    /// initialization and cannot change afterwards.
    pub fn new(engine: E, allow_list: Option<String>) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            engine: Mutex::new(Some(engine)),
            state: AtomicU8::new(DispatcherState::Uninitialized as u8),
            allow_list,
            handlers: Vec::new(),
            notify_tx,
        }
    }

    /// Registers a blocking handler. Handlers are fixed before the
    /// dispatcher is shared with the pipeline.
    pub fn add_handler(&mut self, handler: Box<dyn RecognitionHandler>) {
        self.handlers.push(handler);
    }

    /// Subscribes to the non-blocking notification path.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.notify_tx.subscribe()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Runs one recognition request to completion.
    ///
    /// Initializes the engine on the first request; an init failure is
    /// returned to this caller and retried by the next request. Non-empty
    /// cleaned text is delivered to every blocking handler and to the
    /// broadcast channel; absent or empty results notify nobody.
    ///
    /// Calling after [`dispose`](Self::dispose) is a caller error.
    pub async fn recognize(&self, image: RasterBuffer) -> Result<DispatchOutcome, OcrError> {
        let was_uninitialized = loop {
            match self.state() {
                DispatcherState::Disposed => return Err(OcrError::Disposed),
                DispatcherState::Busy => {
                    tracing::debug!(sequence = image.sequence(), "recognition in flight, dropping frame");
                    return Ok(DispatchOutcome::Dropped);
                }
                current => {
                    if self
                        .state
                        .compare_exchange(
                            current as u8,
                            DispatcherState::Busy as u8,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        break current == DispatcherState::Uninitialized;
                    }
                }
            }
        };

        let mut guard = self.engine.lock().await;
        let Some(engine) = guard.as_mut() else {
            // Disposal won the race for the engine.
            return Ok(DispatchOutcome::Discarded);
        };

        if was_uninitialized {
            if let Err(e) = engine.init(self.allow_list.as_deref()).await {
                drop(guard);
                // Back to uninitialized so the next request retries; a
                // concurrent dispose wins.
                let _ = self.state.compare_exchange(
                    DispatcherState::Busy as u8,
                    DispatcherState::Uninitialized as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                return Err(e);
            }
            tracing::info!(
                allow_list = self.allow_list.as_deref().unwrap_or(""),
                "OCR engine initialized"
            );
        }

        let raw = match engine.recognize(&image).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, sequence = image.sequence(), "recognition failed");
                None
            }
        };
        drop(guard);

        let cleaned = raw.map(clean_text).filter(|text| !text.is_empty());

        if self
            .state
            .compare_exchange(
                DispatcherState::Busy as u8,
                DispatcherState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!("dispatcher disposed mid-flight, result discarded");
            return Ok(DispatchOutcome::Discarded);
        }

        if let Some(text) = &cleaned {
            for handler in &self.handlers {
                handler.on_text(text);
            }
            if self.notify_tx.receiver_count() > 0 {
                let _ = self.notify_tx.send(text.clone());
            }
            tracing::debug!(text = %text, "recognized text delivered");
        } else {
            tracing::trace!(sequence = image.sequence(), "no text recognized");
        }

        Ok(DispatchOutcome::Completed(cleaned))
    }

    /// Tears the dispatcher down.
    ///
    /// New requests are refused immediately; any in-flight recognition is
    /// allowed to finish and its result discarded. The engine capability is
    /// released once the in-flight request (if any) has completed.
    pub async fn dispose(&self) {
        let previous = self.state.swap(DispatcherState::Disposed as u8, Ordering::AcqRel);

        // Taking the engine waits for an in-flight recognition to release
        // the lock.
        self.engine.lock().await.take();

        if DispatcherState::from_u8(previous) != DispatcherState::Disposed {
            tracing::info!("OCR dispatcher disposed");
        }
    }
}

/// Strips all whitespace from recognized text.
fn clean_text(raw: String) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;
    use crate::ocr::engine::MockOcrEngine;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Notify;

    fn image() -> RasterBuffer {
        RasterBuffer::new(vec![0u8; 16], 4, 4, PixelFormat::Gray8, 1)
    }

    fn recording_handler() -> (Arc<StdMutex<Vec<String>>>, Box<dyn RecognitionHandler>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |text: &str| {
            sink.lock().unwrap().push(text.to_string());
        };
        (seen, Box::new(handler))
    }

    #[tokio::test]
    async fn test_lazy_init_happens_once() {
        let engine = MockOcrEngine::with_script([Some("a".into()), Some("b".into())]);
        let state = engine.state();
        let dispatcher = OcrDispatcher::new(engine, None);

        assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);
        dispatcher.recognize(image()).await.unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Ready);
        dispatcher.recognize(image()).await.unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.init_calls, 1);
        assert_eq!(state.recognize_calls, 2);
    }

    #[tokio::test]
    async fn test_whitespace_stripped_and_delivered() {
        let engine = MockOcrEngine::with_script([Some(" 12 3 ".into())]);
        let state = engine.state();
        let mut dispatcher = OcrDispatcher::new(engine, Some("0123456789".into()));
        let (seen, handler) = recording_handler();
        dispatcher.add_handler(handler);
        let mut rx = dispatcher.subscribe();

        let outcome = dispatcher.recognize(image()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed(Some("123".into())));

        assert_eq!(seen.lock().unwrap().as_slice(), ["123"]);
        assert_eq!(rx.recv().await.unwrap(), "123");
        assert_eq!(
            state.lock().unwrap().allow_list.as_deref(),
            Some("0123456789")
        );
    }

    #[tokio::test]
    async fn test_decode_failure_notifies_nobody() {
        let engine = MockOcrEngine::with_script([None]);
        let mut dispatcher = OcrDispatcher::new(engine, None);
        let (seen, handler) = recording_handler();
        dispatcher.add_handler(handler);
        let mut rx = dispatcher.subscribe();

        let outcome = dispatcher.recognize(image()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed(None));
        assert!(seen.lock().unwrap().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_notifies_nobody() {
        let engine = MockOcrEngine::with_script([Some("  \t ".into())]);
        let mut dispatcher = OcrDispatcher::new(engine, None);
        let (seen, handler) = recording_handler();
        dispatcher.add_handler(handler);

        let outcome = dispatcher.recognize(image()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed(None));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_failure_retries_on_next_request() {
        let engine = MockOcrEngine::with_script([Some("ok".into())]).failing_init(1);
        let state = engine.state();
        let dispatcher = OcrDispatcher::new(engine, None);

        assert!(matches!(
            dispatcher.recognize(image()).await,
            Err(OcrError::InitFailed(_))
        ));
        assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);

        let outcome = dispatcher.recognize(image()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed(Some("ok".into())));
        assert_eq!(state.lock().unwrap().init_calls, 2);
    }

    #[tokio::test]
    async fn test_recognize_after_dispose_is_error() {
        let dispatcher = OcrDispatcher::new(MockOcrEngine::new(), None);
        dispatcher.dispose().await;
        assert_eq!(dispatcher.state(), DispatcherState::Disposed);
        assert!(matches!(
            dispatcher.recognize(image()).await,
            Err(OcrError::Disposed)
        ));
    }

    /// Engine that blocks inside recognize until released, so tests can
    /// observe the busy window.
    struct GatedEngine {
        gate: Arc<Notify>,
        text: String,
    }

    #[async_trait]
    impl OcrEngine for GatedEngine {
        async fn init(&mut self, _allow_list: Option<&str>) -> Result<(), OcrError> {
            Ok(())
        }

        async fn recognize(&mut self, _image: &RasterBuffer) -> Result<Option<String>, OcrError> {
            self.gate.notified().await;
            Ok(Some(self.text.clone()))
        }
    }

    #[tokio::test]
    async fn test_busy_dispatcher_drops_new_frames() {
        let gate = Arc::new(Notify::new());
        let dispatcher = Arc::new(OcrDispatcher::new(
            GatedEngine {
                gate: Arc::clone(&gate),
                text: "42".into(),
            },
            None,
        ));

        let first = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.recognize(image()).await })
        };

        // Wait until the first request is visibly in flight.
        while dispatcher.state() != DispatcherState::Busy {
            tokio::task::yield_now().await;
        }

        // A second request is dropped without disturbing the first.
        let second = dispatcher.recognize(image()).await.unwrap();
        assert_eq!(second, DispatchOutcome::Dropped);
        assert_eq!(dispatcher.state(), DispatcherState::Busy);

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, DispatchOutcome::Completed(Some("42".into())));
        assert_eq!(dispatcher.state(), DispatcherState::Ready);
    }

    #[tokio::test]
    async fn test_dispose_mid_flight_discards_result() {
        let gate = Arc::new(Notify::new());
        let dispatcher = Arc::new(OcrDispatcher::new(
            GatedEngine {
                gate: Arc::clone(&gate),
                text: "lost".into(),
            },
            None,
        ));
        let mut rx = dispatcher.subscribe();

        let in_flight = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.recognize(image()).await })
        };
        while dispatcher.state() != DispatcherState::Busy {
            tokio::task::yield_now().await;
        }

        let disposal = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispose().await })
        };
        // Disposal must wait for the in-flight recognition.
        tokio::task::yield_now().await;

        gate.notify_one();
        let outcome = in_flight.await.unwrap().unwrap();
        disposal.await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Discarded);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_transition_table() {
        use DispatcherState::*;
        assert!(Uninitialized.can_transition_to(Busy));
        assert!(Ready.can_transition_to(Busy));
        assert!(Busy.can_transition_to(Ready));
        assert!(Busy.can_transition_to(Uninitialized));
        assert!(Uninitialized.can_transition_to(Disposed));
        assert!(Busy.can_transition_to(Disposed));

        assert!(!Uninitialized.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Uninitialized));
        assert!(!Disposed.can_transition_to(Busy));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(" 12 3 ".into()), "123");
        assert_eq!(clean_text("a\tb\nc".into()), "abc");
        assert_eq!(clean_text("   ".into()), "");
    }
}
