//! Coordinate-space conversion and orientation correction.
//!
//! This module holds the dense part of the pipeline: mapping the on-screen
//! aim rectangle into the landscape-stored sensor buffer, and rendering the
//! cropped result upright through the standard eight-orientation affine
//! table.

mod mapper;
mod normalizer;
mod orientation;
mod rect;
mod transform;

pub use mapper::GeometryMapper;
pub use normalizer::{OrientationNormalizer, DEFAULT_MAX_DIMENSION};
pub use orientation::{capture_rotation, CameraFacing, Orientation};
pub use rect::{CoordSpace, Rect, SensorSpace, Viewport, ViewSpace};
pub use transform::AffineTransform;

/// Per-frame geometry errors.
///
/// `EmptyCropRegion` is recoverable (the frame is skipped); the other
/// variants indicate caller-side contract violations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeometryError {
    #[error("crop region falls outside the {buffer_width}x{buffer_height} buffer")]
    EmptyCropRegion { buffer_width: u32, buffer_height: u32 },

    #[error("orientation transform is not invertible")]
    SingularTransform,

    #[error("unrecognized orientation code {0}")]
    UnknownOrientation(u8),
}
