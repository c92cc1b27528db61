//! Pipeline and capture configuration.
//!
//! All settings are fixed before activation and read-only thereafter.
//! Invalid values are rejected at setup, never silently corrected.

use super::PixelFormat;
use crate::geometry::{Orientation, Rect, ViewSpace, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the frame-to-OCR pipeline.
///
/// The viewport describes the portrait on-screen preview the user aims with;
/// the overlay rectangle is the region of it that gets cropped and recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Viewport width in view units.
    pub viewport_width: f64,
    /// Viewport height in view units.
    pub viewport_height: f64,
    /// Target overlay width in view units.
    pub overlay_width: f64,
    /// Target overlay height in view units.
    pub overlay_height: f64,
    /// Overlay x origin; `None` centers the overlay horizontally.
    pub overlay_x: Option<f64>,
    /// Overlay y origin; `None` centers the overlay vertically.
    pub overlay_y: Option<f64>,
    /// Number of frames to skip between samples.
    pub sample_interval: u32,
    /// Optional character allow-list for recognition (empty = unrestricted).
    pub allow_list: Option<String>,
    /// Surface normalized images and text for visual inspection.
    pub debug_mode: bool,
    /// Upper bound on the normalized image's longer side, in pixels.
    pub max_dimension: u32,
    /// Orientation correction applied to the cropped buffer.
    pub orientation: Orientation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            viewport_width: 360.0,
            viewport_height: 800.0,
            overlay_width: 100.0,
            overlay_height: 50.0,
            overlay_x: None,
            overlay_y: None,
            sample_interval: 20,
            allow_list: None,
            debug_mode: false,
            max_dimension: 2048,
            orientation: Orientation::Right,
        }
    }
}

impl PipelineConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval == 0 {
            return Err(ConfigError::InvalidSampleInterval);
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0)
            || !self.viewport_width.is_finite()
            || !self.viewport_height.is_finite()
        {
            return Err(ConfigError::InvalidViewport);
        }
        if self.viewport_width > self.viewport_height {
            return Err(ConfigError::LandscapeViewport);
        }
        if !(self.overlay_width > 0.0 && self.overlay_height > 0.0) {
            return Err(ConfigError::DegenerateTargetRect);
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidMaxDimension);
        }
        Ok(())
    }

    /// Returns the viewport dimensions.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    /// Returns the overlay rectangle in view coordinates.
    ///
    /// Unset origins center the overlay, matching how an aim overlay
    /// is placed on screen.
    pub fn target_rect(&self) -> Rect<ViewSpace> {
        let x = self
            .overlay_x
            .unwrap_or((self.viewport_width - self.overlay_width) / 2.0);
        let y = self
            .overlay_y
            .unwrap_or((self.viewport_height - self.overlay_height) / 2.0);
        Rect::new(x, y, self.overlay_width, self.overlay_height)
    }

    /// Returns the allow-list with an empty string normalized to `None`.
    pub fn allow_list(&self) -> Option<&str> {
        self.allow_list.as_deref().filter(|s| !s.is_empty())
    }
}

/// Configuration for frame sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Camera device index or identifier.
    pub device_id: u32,
    /// Sensor buffer width in pixels (landscape-native).
    pub width: u32,
    /// Sensor buffer height in pixels (landscape-native).
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Pixel layout the source delivers.
    pub format: PixelFormat,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 1920,
            height: 1080,
            fps: 30,
            format: PixelFormat::Bgra8,
        }
    }
}

impl CaptureConfig {
    /// Creates a configuration with the specified sensor dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("sample interval must be positive")]
    InvalidSampleInterval,
    #[error("viewport dimensions must be positive and finite")]
    InvalidViewport,
    #[error("landscape viewports are not supported")]
    LandscapeViewport,
    #[error("target overlay rectangle has no area")]
    DegenerateTargetRect,
    #[error("maximum normalized dimension must be positive")]
    InvalidMaxDimension,
    #[error("invalid sensor dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.pipeline.validate()?;
        config.capture.validate()?;
        Ok(config)
    }
}
