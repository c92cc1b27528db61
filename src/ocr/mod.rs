//! OCR engine access and result dispatch.
//!
//! The engine itself is an opaque capability behind [`OcrEngine`]; this
//! module's job is serializing access to it, one-time lazy initialization,
//! result cleaning, and subscriber notification.

mod dispatcher;
mod engine;
mod subscriber;

pub use dispatcher::{DispatchOutcome, DispatcherState, OcrDispatcher};
pub use engine::{MockEngineState, MockOcrEngine, OcrEngine, OcrError};
pub use subscriber::RecognitionHandler;
