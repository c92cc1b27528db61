//! Frame input and configuration.
//!
//! This module provides the raster buffer type frames travel in, the
//! frame source abstraction, and the read-once configuration surface.
//! The camera itself is an external collaborator behind the
//! [`FrameSource`] trait.

mod config;
mod frame;
mod source;

pub use config::{CaptureConfig, ConfigError, FileConfig, PipelineConfig};
pub use frame::{PixelFormat, RasterBuffer};
#[cfg(feature = "camera")]
pub use source::NokhwaSource;
pub use source::{FrameSource, MockFrameSource, SourceError};
