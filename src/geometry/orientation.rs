//! Image orientation variants and camera rotation helpers.

use super::{AffineTransform, GeometryError};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// The eight standard image orientations (EXIF 1-8).
///
/// The set is closed: every variant has an entry in the transform table and
/// there is no fallback. In the intended pipeline cropped buffers are always
/// `Right` (landscape-stored, needing a 90° clockwise correction); the other
/// variants exist so the normalizer is complete and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Upright; no correction needed.
    Up,
    /// Mirrored across the vertical axis.
    UpMirrored,
    /// Rotated 180°.
    Down,
    /// Mirrored across the horizontal axis.
    DownMirrored,
    /// Mirrored, then rotated 270° clockwise.
    LeftMirrored,
    /// Rotated 270° clockwise.
    Left,
    /// Mirrored, then rotated 90° clockwise.
    RightMirrored,
    /// Rotated 90° clockwise.
    Right,
}

impl Orientation {
    /// Converts an EXIF orientation code (1-8).
    ///
    /// Any other value is a caller-side contract violation, surfaced as an
    /// error rather than defaulting to identity.
    pub fn from_exif(value: u8) -> Result<Self, GeometryError> {
        match value {
            1 => Ok(Orientation::Up),
            2 => Ok(Orientation::UpMirrored),
            3 => Ok(Orientation::Down),
            4 => Ok(Orientation::DownMirrored),
            5 => Ok(Orientation::LeftMirrored),
            6 => Ok(Orientation::Left),
            7 => Ok(Orientation::RightMirrored),
            8 => Ok(Orientation::Right),
            other => Err(GeometryError::UnknownOrientation(other)),
        }
    }

    /// Returns the EXIF code for this orientation.
    pub fn exif(self) -> u8 {
        match self {
            Orientation::Up => 1,
            Orientation::UpMirrored => 2,
            Orientation::Down => 3,
            Orientation::DownMirrored => 4,
            Orientation::LeftMirrored => 5,
            Orientation::Left => 6,
            Orientation::RightMirrored => 7,
            Orientation::Right => 8,
        }
    }

    /// Whether correcting this orientation swaps the output width/height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Orientation::LeftMirrored
                | Orientation::Left
                | Orientation::RightMirrored
                | Orientation::Right
        )
    }

    /// Builds the affine transform that maps source pixel coordinates to
    /// upright destination coordinates for a `width` x `height` source.
    ///
    /// For axis-swapping variants the destination spans `height` x `width`.
    pub fn transform(self, width: f64, height: f64) -> AffineTransform {
        use AffineTransform as T;
        match self {
            Orientation::Up => T::identity(),
            Orientation::UpMirrored => T::translation(width, 0.0).compose(&T::scale(-1.0, 1.0)),
            Orientation::Down => T::translation(width, height).compose(&T::rotation(PI)),
            Orientation::DownMirrored => T::translation(0.0, height).compose(&T::scale(1.0, -1.0)),
            Orientation::LeftMirrored => T::translation(height, width)
                .compose(&T::scale(-1.0, 1.0))
                .compose(&T::rotation(3.0 * FRAC_PI_2)),
            Orientation::Left => T::translation(0.0, width).compose(&T::rotation(3.0 * FRAC_PI_2)),
            Orientation::RightMirrored => {
                T::scale(-1.0, 1.0).compose(&T::rotation(FRAC_PI_2))
            }
            Orientation::Right => T::translation(height, 0.0).compose(&T::rotation(FRAC_PI_2)),
        }
    }
}

/// Which way the capture device faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    /// World-facing camera.
    Back,
    /// User-facing camera; its preview is mirrored.
    Front,
}

/// Clockwise rotation (degrees) to apply to sensor output so the preview is
/// upright, given the sensor's mounting orientation and the current display
/// rotation.
///
/// The front camera compensates in the opposite direction and is then
/// mirrored, which is why the two facings are not the same formula.
pub fn capture_rotation(facing: CameraFacing, sensor_orientation: u32, display_rotation: u32) -> u32 {
    let sensor = sensor_orientation % 360;
    let display = display_rotation % 360;
    match facing {
        CameraFacing::Back => (sensor + 360 - display) % 360,
        CameraFacing::Front => (360 - (sensor + display) % 360) % 360,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exif_round_trip() {
        for code in 1..=8u8 {
            let orientation = Orientation::from_exif(code).unwrap();
            assert_eq!(orientation.exif(), code);
        }
    }

    #[test]
    fn test_unknown_exif_rejected() {
        assert!(matches!(
            Orientation::from_exif(0),
            Err(GeometryError::UnknownOrientation(0))
        ));
        assert!(matches!(
            Orientation::from_exif(9),
            Err(GeometryError::UnknownOrientation(9))
        ));
    }

    #[test]
    fn test_quarter_turns_swap_axes() {
        assert!(Orientation::Right.swaps_axes());
        assert!(Orientation::Left.swaps_axes());
        assert!(Orientation::RightMirrored.swaps_axes());
        assert!(Orientation::LeftMirrored.swaps_axes());
        assert!(!Orientation::Up.swaps_axes());
        assert!(!Orientation::Down.swaps_axes());
    }

    fn assert_maps_to(orientation: Orientation, src: (f64, f64), expected: (f64, f64)) {
        let (x, y) = orientation.transform(40.0, 30.0).apply(src.0, src.1);
        assert!(
            (x - expected.0).abs() < 1e-9 && (y - expected.1).abs() < 1e-9,
            "{:?}: expected {:?}, got ({}, {})",
            orientation,
            expected,
            x,
            y
        );
    }

    #[test]
    fn test_transform_corners() {
        // 40x30 source; quarter-turn outputs span 30x40.
        assert_maps_to(Orientation::Up, (10.0, 5.0), (10.0, 5.0));
        assert_maps_to(Orientation::UpMirrored, (10.0, 5.0), (30.0, 5.0));
        assert_maps_to(Orientation::Down, (10.0, 5.0), (30.0, 25.0));
        assert_maps_to(Orientation::DownMirrored, (10.0, 5.0), (10.0, 25.0));
        assert_maps_to(Orientation::Right, (10.0, 5.0), (25.0, 10.0));
        assert_maps_to(Orientation::Left, (10.0, 5.0), (5.0, 30.0));
        assert_maps_to(Orientation::RightMirrored, (10.0, 5.0), (5.0, 10.0));
        assert_maps_to(Orientation::LeftMirrored, (10.0, 5.0), (25.0, 30.0));
    }

    #[test]
    fn test_transforms_keep_source_inside_destination() {
        let corners = [(0.0, 0.0), (40.0, 0.0), (0.0, 30.0), (40.0, 30.0)];
        for code in 1..=8u8 {
            let orientation = Orientation::from_exif(code).unwrap();
            let (dw, dh) = if orientation.swaps_axes() {
                (30.0, 40.0)
            } else {
                (40.0, 30.0)
            };
            let m = orientation.transform(40.0, 30.0);
            for &(x, y) in &corners {
                let (dx, dy) = m.apply(x, y);
                assert!(
                    (-1e-9..=dw + 1e-9).contains(&dx) && (-1e-9..=dh + 1e-9).contains(&dy),
                    "{:?} sends ({}, {}) to ({}, {})",
                    orientation,
                    x,
                    y,
                    dx,
                    dy
                );
            }
        }
    }

    #[test]
    fn test_back_camera_rotation() {
        assert_eq!(capture_rotation(CameraFacing::Back, 90, 0), 90);
        assert_eq!(capture_rotation(CameraFacing::Back, 90, 90), 0);
        assert_eq!(capture_rotation(CameraFacing::Back, 270, 180), 90);
    }

    #[test]
    fn test_front_camera_is_mirror_of_sensor_sum() {
        for display in [0u32, 90, 180, 270] {
            for sensor in [90u32, 270] {
                let front = capture_rotation(CameraFacing::Front, sensor, display);
                // Front result mirrors the summed rotation back to zero.
                assert_eq!((front + (sensor + display) % 360) % 360, 0);
            }
        }
    }

    #[test]
    fn test_facings_are_mirrored_for_same_mounting() {
        // For the same sensor mounting, the two facings rotate in opposite
        // directions: their results sum to a full turn.
        for sensor in [90u32, 270] {
            let front = capture_rotation(CameraFacing::Front, sensor, 0);
            let back = capture_rotation(CameraFacing::Back, sensor, 0);
            assert_ne!(front, back);
            assert_eq!((front + back) % 360, 0);
        }
        // Typical phone pairing (front 270, back 90) comes out upright both
        // ways with the display unrotated.
        assert_eq!(capture_rotation(CameraFacing::Front, 270, 0), 90);
        assert_eq!(capture_rotation(CameraFacing::Back, 90, 0), 90);
    }
}
