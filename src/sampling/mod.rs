//! Frame sampling and rate control.
//!
//! Decouples OCR cost from the sensor frame rate: most frames are dropped
//! on arrival and only every Nth is allowed into the transform stages.

mod throttle;

pub use throttle::FrameThrottle;
