//! Frame source abstraction.
//!
//! The camera is an external collaborator: it produces landscape-stored
//! raster buffers at sensor rate and is otherwise opaque to the pipeline.
//! The trait allows swapping between live camera input and a mock
//! implementation for testing.

use super::{CaptureConfig, RasterBuffer};
#[cfg(feature = "camera")]
use super::PixelFormat;
use thiserror::Error;

/// Errors that can occur during frame source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open capture device: {0}")]
    OpenFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("frame source not initialized")]
    NotInitialized,
}

/// Trait for frame source implementations.
///
/// Implementations own the underlying platform buffer pool; a returned
/// `RasterBuffer` is a copy the pipeline may keep, so the platform buffer
/// can be recycled as soon as `next_frame` returns.
pub trait FrameSource {
    /// Opens the source with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), SourceError>;

    /// Captures the next frame.
    fn next_frame(&mut self) -> Result<RasterBuffer, SourceError>;

    /// Checks whether the source is currently open.
    fn is_open(&self) -> bool;

    /// Closes the source and releases resources.
    fn close(&mut self);
}

/// Mock frame source generating deterministic synthetic frames.
#[derive(Debug, Default)]
pub struct MockFrameSource {
    config: Option<CaptureConfig>,
    sequence: u64,
}

impl MockFrameSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSource for MockFrameSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), SourceError> {
        config
            .validate()
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!(config = ?config, "MockFrameSource opened");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RasterBuffer, SourceError> {
        let config = self.config.as_ref().ok_or(SourceError::NotInitialized)?;

        // Deterministic diagonal gradient mixed with the sequence number,
        // enough to make crops distinguishable in tests.
        let bpp = config.format.bytes_per_pixel();
        let len = config.width as usize * config.height as usize * bpp;
        let width = config.width as usize * bpp;
        let pixels: Vec<u8> = (0..len)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                ((x + y) as u64 ^ self.sequence) as u8
            })
            .collect();

        self.sequence += 1;
        Ok(RasterBuffer::new(
            pixels,
            config.width,
            config.height,
            config.format,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockFrameSource closed");
    }
}

/// Live camera source backed by `nokhwa`.
#[cfg(feature = "camera")]
pub struct NokhwaSource {
    camera: Option<nokhwa::Camera>,
    sequence: u64,
}

#[cfg(feature = "camera")]
impl NokhwaSource {
    pub fn new() -> Self {
        Self {
            camera: None,
            sequence: 0,
        }
    }
}

#[cfg(feature = "camera")]
impl Default for NokhwaSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "camera")]
impl FrameSource for NokhwaSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), SourceError> {
        use nokhwa::pixel_format::RgbFormat;
        use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};

        config
            .validate()
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;

        let index = CameraIndex::Index(config.device_id);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = nokhwa::Camera::new(index, requested)
            .map_err(|e| SourceError::DeviceNotFound(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;

        tracing::info!(device = config.device_id, "camera stream opened");
        self.camera = Some(camera);
        self.sequence = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RasterBuffer, SourceError> {
        use nokhwa::pixel_format::RgbFormat;

        let camera = self.camera.as_mut().ok_or(SourceError::NotInitialized)?;
        let frame = camera
            .frame()
            .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        self.sequence += 1;
        Ok(RasterBuffer::new(
            decoded.into_raw(),
            width,
            height,
            PixelFormat::Rgb8,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "failed to stop camera stream");
            }
        }
        tracing::info!("camera stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_lifecycle() {
        let mut source = MockFrameSource::new();
        let config = CaptureConfig::with_dimensions(64, 32);

        assert!(!source.is_open());

        source.open(&config).unwrap();
        assert!(source.is_open());

        let frame = source.next_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 32);

        let frame2 = source.next_frame().unwrap();
        assert_eq!(frame2.sequence(), 2);

        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut source = MockFrameSource::new();
        assert!(matches!(
            source.next_frame(),
            Err(SourceError::NotInitialized)
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_open() {
        let mut source = MockFrameSource::new();
        let config = CaptureConfig::with_dimensions(0, 0);
        assert!(matches!(
            source.open(&config),
            Err(SourceError::OpenFailed(_))
        ));
    }
}
