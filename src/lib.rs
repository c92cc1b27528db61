//! Aim OCR Library
//!
//! A live-camera OCR pipeline: frames are sampled at a bounded rate,
//! cropped to the on-screen "aim" rectangle, rotated upright, and fed to
//! an OCR engine whose text fans out to subscribers.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → sampling → geometry → ocr
//!    ↓         ↓           ↓        ↓
//!              pipeline (orchestration)
//! ```
//!
//! # Design Principles
//!
//! - **Drop, never queue**: a frame that cannot be processed right now is
//!   permanently dropped; backpressure is structural, with at most one
//!   recognition in flight
//! - **Typed coordinate spaces**: view-space and sensor-space rectangles
//!   cannot be mixed by accident
//! - **Opaque collaborators**: the camera and the OCR engine live behind
//!   traits; the pipeline owns only the transform and dispatch logic
//! - **Fail loud at setup, recover per frame**: configuration errors are
//!   rejected immediately; geometry and recognition failures skip a frame
//!   and move on
//!
//! # Example
//!
//! ```no_run
//! use aim_ocr::{
//!     capture::{CaptureConfig, FrameSource, MockFrameSource, PipelineConfig},
//!     ocr::MockOcrEngine,
//!     pipeline::OcrPipeline,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! runtime.block_on(async {
//!     // A scripted engine stands in for a real OCR backend.
//!     let engine = MockOcrEngine::with_script([Some("12345".to_string())]);
//!     let pipeline = OcrPipeline::new(PipelineConfig::default(), engine)?;
//!     let mut text_rx = pipeline.subscribe_text();
//!
//!     let mut source = MockFrameSource::new();
//!     source.open(&CaptureConfig::default())?;
//!
//!     // Feed frames; with the default interval of 20 the 21st samples.
//!     for _ in 0..25 {
//!         let frame = source.next_frame()?;
//!         pipeline.handle_frame(frame);
//!     }
//!
//!     println!("recognized: {}", text_rx.recv().await?);
//!     pipeline.stop().await;
//!     Ok::<_, Box<dyn std::error::Error>>(())
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod geometry;
pub mod ocr;
pub mod pipeline;
pub mod sampling;

// Re-export commonly used types at crate root
pub use capture::{
    CaptureConfig, ConfigError, FrameSource, MockFrameSource, PipelineConfig, PixelFormat,
    RasterBuffer, SourceError,
};
pub use geometry::{
    GeometryMapper, GeometryError, Orientation, OrientationNormalizer, Rect, SensorSpace,
    ViewSpace, Viewport,
};
pub use ocr::{MockOcrEngine, OcrDispatcher, OcrEngine, OcrError, RecognitionHandler};
pub use pipeline::{DebugSnapshot, FrameFate, OcrPipeline, PipelineStats};
pub use sampling::FrameThrottle;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
