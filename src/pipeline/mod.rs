//! Pipeline orchestration.
//!
//! Wires the stages together: throttle on the capture thread, geometry and
//! orientation correction for sampled frames, and a single spawned
//! recognition task. Backpressure is structural: an explicit in-flight
//! permit is claimed before a frame enters the transform stages and
//! released when its recognition resolves, so OCR latency can never stack
//! up a backlog.

use crate::capture::{ConfigError, PipelineConfig, RasterBuffer};
use crate::geometry::{GeometryMapper, OrientationNormalizer, Rect, ViewSpace};
use crate::ocr::{DispatchOutcome, OcrDispatcher, OcrEngine, OcrError, RecognitionHandler};
use crate::sampling::FrameThrottle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// What happened to one delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFate {
    /// The frame entered the transform stages and was submitted for
    /// recognition.
    Sampled,
    /// Dropped by the sampling interval.
    Throttled,
    /// Sampled, but a recognition was still in flight.
    DroppedBusy,
    /// Sampled, but its crop region fell outside the buffer.
    SkippedGeometry,
    /// The pipeline has been stopped.
    Stopped,
}

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames delivered by the source.
    pub frames_seen: u64,
    /// Frames released by the throttle.
    pub frames_sampled: u64,
    /// Sampled frames dropped because a recognition was in flight.
    pub dropped_busy: u64,
    /// Sampled frames skipped for geometry reasons.
    pub skipped_geometry: u64,
    /// Recognition requests that failed engine initialization.
    pub init_failures: u64,
}

/// Normalized image and recognition result surfaced in debug mode.
#[derive(Debug, Clone)]
pub struct DebugSnapshot {
    /// The upright, bounded-resolution image that was recognized.
    pub image: RasterBuffer,
    /// The cleaned text, or `None` when nothing was recognized.
    pub text: Option<String>,
}

/// The frame-to-OCR pipeline.
///
/// Frames are pushed in via [`handle_frame`](Self::handle_frame) from the
/// capture thread; recognized text comes back through the blocking handlers
/// and/or the broadcast channel.
pub struct OcrPipeline<E: OcrEngine + 'static> {
    config: PipelineConfig,
    target: Rect<ViewSpace>,
    throttle: FrameThrottle,
    mapper: GeometryMapper,
    normalizer: OrientationNormalizer,
    dispatcher: Arc<OcrDispatcher<E>>,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    runtime: tokio::runtime::Handle,
    debug_tx: watch::Sender<Option<DebugSnapshot>>,
    dropped_busy: AtomicU64,
    skipped_geometry: AtomicU64,
    init_failures: Arc<AtomicU64>,
}

impl<E: OcrEngine + 'static> OcrPipeline<E> {
    /// Creates a pipeline from a validated configuration and an engine.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime; the recognition task is
    /// spawned onto the runtime that created the pipeline.
    pub fn new(config: PipelineConfig, engine: E) -> Result<Self, ConfigError> {
        config.validate()?;

        let throttle = FrameThrottle::new(config.sample_interval)?;
        let mapper = GeometryMapper::new(config.viewport())?;
        let normalizer = OrientationNormalizer::new(config.max_dimension);
        let dispatcher = Arc::new(OcrDispatcher::new(
            engine,
            config.allow_list().map(str::to_owned),
        ));
        let (debug_tx, _) = watch::channel(None);
        let target = config.target_rect();

        tracing::info!(
            interval = config.sample_interval,
            overlay = ?target,
            orientation = ?config.orientation,
            "pipeline created"
        );

        Ok(Self {
            config,
            target,
            throttle,
            mapper,
            normalizer,
            dispatcher,
            in_flight: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            runtime: tokio::runtime::Handle::current(),
            debug_tx,
            dropped_busy: AtomicU64::new(0),
            skipped_geometry: AtomicU64::new(0),
            init_failures: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Registers a blocking text handler.
    ///
    /// Handlers are part of the read-once configuration surface: they must
    /// be registered before the first frame is processed.
    pub fn add_handler(&mut self, handler: Box<dyn RecognitionHandler>) {
        match Arc::get_mut(&mut self.dispatcher) {
            Some(dispatcher) => dispatcher.add_handler(handler),
            None => {
                tracing::warn!("handler registered after activation; ignored");
            }
        }
    }

    /// Subscribes to the non-blocking notification path.
    pub fn subscribe_text(&self) -> broadcast::Receiver<String> {
        self.dispatcher.subscribe()
    }

    /// Returns a receiver for debug snapshots (always `None` unless debug
    /// mode is enabled).
    pub fn debug_frames(&self) -> watch::Receiver<Option<DebugSnapshot>> {
        self.debug_tx.subscribe()
    }

    /// Offers one frame to the pipeline.
    ///
    /// Called from the capture thread for every delivered frame; returns
    /// immediately. The frame is dropped unless the throttle releases it
    /// and no recognition is in flight; a released frame is cropped,
    /// normalized, and submitted to the dispatcher on the runtime.
    pub fn handle_frame(&self, frame: RasterBuffer) -> FrameFate {
        if self.cancel.is_cancelled() {
            return FrameFate::Stopped;
        }

        if !self.throttle.should_sample() {
            return FrameFate::Throttled;
        }

        // Claim the permit before doing any transform work; frames arriving
        // during a busy period are dropped at the cheapest point.
        if self.in_flight.swap(true, Ordering::AcqRel) {
            self.dropped_busy.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                sequence = frame.sequence(),
                "recognition in flight, dropping sampled frame"
            );
            return FrameFate::DroppedBusy;
        }

        let crop = match self
            .mapper
            .sensor_crop(&self.target, frame.width(), frame.height())
        {
            Ok(rect) => rect,
            Err(e) => {
                self.in_flight.store(false, Ordering::Release);
                self.skipped_geometry.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    error = %e,
                    sequence = frame.sequence(),
                    "skipping frame"
                );
                return FrameFate::SkippedGeometry;
            }
        };

        let cropped = frame.crop(
            crop.x as u32,
            crop.y as u32,
            crop.width.ceil() as u32,
            crop.height.ceil() as u32,
        );

        let normalized = match self.normalizer.normalize(&cropped, self.config.orientation) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.in_flight.store(false, Ordering::Release);
                self.skipped_geometry.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    error = %e,
                    sequence = frame.sequence(),
                    "skipping frame"
                );
                return FrameFate::SkippedGeometry;
            }
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let in_flight = Arc::clone(&self.in_flight);
        let init_failures = Arc::clone(&self.init_failures);
        let debug_tx = self.config.debug_mode.then(|| self.debug_tx.clone());
        let preview = debug_tx.as_ref().map(|_| normalized.clone());

        self.runtime.spawn(async move {
            let outcome = dispatcher.recognize(normalized).await;
            in_flight.store(false, Ordering::Release);

            match outcome {
                Ok(DispatchOutcome::Completed(text)) => {
                    if let (Some(tx), Some(image)) = (debug_tx, preview) {
                        let _ = tx.send(Some(DebugSnapshot { image, text }));
                    }
                }
                Ok(_) => {}
                Err(OcrError::Disposed) => {
                    tracing::debug!("frame submitted around disposal; ignored");
                }
                Err(e) => {
                    init_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "recognition request failed");
                }
            }
        });

        FrameFate::Sampled
    }

    /// Returns a snapshot of the pipeline counters.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_seen: self.throttle.total_seen(),
            frames_sampled: self.throttle.total_sampled(),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            skipped_geometry: self.skipped_geometry.load(Ordering::Relaxed),
            init_failures: self.init_failures.load(Ordering::Relaxed),
        }
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the pipeline.
    ///
    /// New frames are refused immediately; an in-flight recognition
    /// completes and its result is discarded. Safe to call more than once.
    pub async fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.dispatcher.dispose().await;
        tracing::info!(stats = ?self.stats(), "pipeline stopped");
    }
}
