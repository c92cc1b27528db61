//! Orientation normalization of cropped buffers.
//!
//! Renders a source buffer through its orientation transform into an
//! upright destination buffer, capping the longer side at a configured
//! resolution bound. Rendering walks destination pixels and samples the
//! source through the inverted transform (nearest neighbor), so every
//! orientation variant shares one code path.

use super::{AffineTransform, GeometryError, Orientation};
use crate::capture::RasterBuffer;

/// Default upper bound on the normalized image's longer side.
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Produces upright, bounded-resolution buffers from cropped frames.
#[derive(Debug, Clone)]
pub struct OrientationNormalizer {
    /// Longest allowed output side in pixels; validated at the config
    /// boundary to be positive.
    max_dimension: u32,
}

impl OrientationNormalizer {
    /// Creates a normalizer with the given resolution bound.
    pub fn new(max_dimension: u32) -> Self {
        debug_assert!(max_dimension > 0);
        Self { max_dimension }
    }

    /// Returns the configured resolution bound.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Renders `src` upright according to `orientation`.
    ///
    /// Output width/height are swapped relative to the source for the four
    /// quarter-turn variants. The output is only ever downscaled toward the
    /// resolution bound, never upscaled. An identity orientation within
    /// bounds reproduces the source exactly.
    pub fn normalize(
        &self,
        src: &RasterBuffer,
        orientation: Orientation,
    ) -> Result<RasterBuffer, GeometryError> {
        let (sw, sh) = (src.width(), src.height());
        let (ow, oh) = if orientation.swaps_axes() {
            (sh, sw)
        } else {
            (sw, sh)
        };

        // Downscale-only cap on the longer side.
        let longest = ow.max(oh);
        let scale = if longest > self.max_dimension {
            self.max_dimension as f64 / longest as f64
        } else {
            1.0
        };

        let dst_w = ((ow as f64 * scale).round() as u32).max(1);
        let dst_h = ((oh as f64 * scale).round() as u32).max(1);

        // Identity at full size needs no resampling.
        if orientation == Orientation::Up && scale == 1.0 {
            return Ok(src.clone());
        }

        let forward = AffineTransform::scale(scale, scale)
            .compose(&orientation.transform(sw as f64, sh as f64));
        let inverse = forward.inverse()?;

        let bpp = src.format().bytes_per_pixel();
        let mut data = vec![0u8; dst_w as usize * dst_h as usize * bpp];
        let row_bytes = dst_w as usize * bpp;

        for dy in 0..dst_h {
            for dx in 0..dst_w {
                // Sample at the destination pixel center.
                let (sx, sy) = inverse.apply(dx as f64 + 0.5, dy as f64 + 0.5);
                let sx = (sx.floor() as i64).clamp(0, sw as i64 - 1) as u32;
                let sy = (sy.floor() as i64).clamp(0, sh as i64 - 1) as u32;

                let offset = dy as usize * row_bytes + dx as usize * bpp;
                data[offset..offset + bpp].copy_from_slice(src.pixel(sx, sy));
            }
        }

        tracing::trace!(
            orientation = ?orientation,
            src_w = sw,
            src_h = sh,
            dst_w,
            dst_h,
            scale,
            "normalized buffer"
        );

        Ok(RasterBuffer::new(
            data,
            dst_w,
            dst_h,
            src.format(),
            src.sequence(),
        ))
    }
}

impl Default for OrientationNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}
