//! View-space to sensor-space rectangle mapping.
//!
//! The sensor stores frames in its native landscape layout even though the
//! viewport is portrait, so the buffer's height axis corresponds to the
//! viewport's width axis. Mapping the aim rectangle therefore scales by the
//! ratio between those two axes and then swaps x/y and width/height.
//! Getting this wrong produces a correctly sized crop of the wrong region,
//! which only shows up visually.

use super::{GeometryError, Rect, SensorSpace, Viewport, ViewSpace};
use crate::capture::ConfigError;

/// Maps the on-screen target rectangle into sensor buffer coordinates.
#[derive(Debug, Clone)]
pub struct GeometryMapper {
    /// Portrait viewport the target rectangle is expressed in.
    viewport: Viewport,
}

impl GeometryMapper {
    /// Creates a mapper for the given viewport.
    ///
    /// Only portrait viewports are supported; the landscape case would need
    /// a different scale/swap derivation and is rejected outright.
    pub fn new(viewport: Viewport) -> Result<Self, ConfigError> {
        if !(viewport.width > 0.0 && viewport.height > 0.0) {
            return Err(ConfigError::InvalidViewport);
        }
        if !viewport.is_portrait() {
            return Err(ConfigError::LandscapeViewport);
        }
        Ok(Self { viewport })
    }

    /// Returns the viewport this mapper was built for.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Computes the sensor-space crop rectangle for a view-space target.
    ///
    /// `buffer_width` x `buffer_height` are the landscape-stored sensor
    /// dimensions. The result is clamped into the buffer; a clamp that
    /// leaves less than one pixel of area means the target lies outside the
    /// buffer and the frame should be skipped.
    pub fn sensor_crop(
        &self,
        target: &Rect<ViewSpace>,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Rect<SensorSpace>, GeometryError> {
        // The buffer's height maps to the viewport's width under the
        // landscape/portrait swap, so that pair defines the scale.
        let scale = buffer_height as f64 / self.viewport.width;
        let scaled = target.scaled(scale);

        // Swap axes: the target is expressed against a portrait view of a
        // landscape-stored buffer.
        let crop: Rect<SensorSpace> = Rect::new(scaled.y, scaled.x, scaled.height, scaled.width);

        let x0 = crop.x.clamp(0.0, buffer_width as f64);
        let y0 = crop.y.clamp(0.0, buffer_height as f64);
        let x1 = crop.right().clamp(0.0, buffer_width as f64);
        let y1 = crop.bottom().clamp(0.0, buffer_height as f64);

        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return Err(GeometryError::EmptyCropRegion {
                buffer_width,
                buffer_height,
            });
        }

        Ok(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> GeometryMapper {
        GeometryMapper::new(Viewport::new(360.0, 800.0)).unwrap()
    }

    #[test]
    fn test_landscape_viewport_rejected() {
        assert!(matches!(
            GeometryMapper::new(Viewport::new(800.0, 360.0)),
            Err(ConfigError::LandscapeViewport)
        ));
    }

    #[test]
    fn test_scale_and_axis_swap() {
        // 1080 buffer height against a 360-wide viewport scales by 3.
        let target = Rect::new(180.0, 400.0, 100.0, 50.0);
        let crop = mapper().sensor_crop(&target, 1920, 1080).unwrap();

        assert_eq!(crop.x, 1200.0);
        assert_eq!(crop.y, 540.0);
        assert_eq!(crop.width, 150.0);
        assert_eq!(crop.height, 300.0);
    }

    #[test]
    fn test_crop_clamped_to_buffer() {
        // A target hugging the viewport's bottom edge maps past the buffer's
        // right edge and gets clamped.
        let target = Rect::new(0.0, 620.0, 100.0, 50.0);
        let crop = mapper().sensor_crop(&target, 1920, 1080).unwrap();

        assert!(crop.right() <= 1920.0);
        assert!(crop.width > 0.0);
    }

    #[test]
    fn test_fully_outside_target_is_error() {
        // y=700 maps to x=2100, beyond a 1920-wide buffer.
        let target = Rect::new(0.0, 700.0, 100.0, 50.0);
        assert!(matches!(
            mapper().sensor_crop(&target, 1920, 1080),
            Err(GeometryError::EmptyCropRegion { .. })
        ));
    }

    #[test]
    fn test_round_trip_reconstructs_target_center() {
        let target = Rect::new(130.0, 375.0, 100.0, 50.0);
        let crop = mapper().sensor_crop(&target, 1920, 1080).unwrap();

        // Invert: swap axes back, then divide by the scale.
        let scale = 1080.0 / 360.0;
        let (cx, cy) = crop.center();
        let (tx, ty) = (cy / scale, cx / scale);

        let (ex, ey) = target.center();
        assert!((tx - ex).abs() < 1e-9);
        assert!((ty - ey).abs() < 1e-9);
    }
}
