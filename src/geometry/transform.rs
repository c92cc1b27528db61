//! 2D affine transforms.
//!
//! Orientation correction is expressed as an affine transform built from
//! translations, scales, and rotations, then applied to pixel coordinates
//! via its inverse during rendering.

use super::GeometryError;

/// A 2D affine transform in column-vector convention:
///
/// ```text
/// | x' |   | a  c  tx |   | x |
/// | y' | = | b  d  ty | * | y |
/// |  1 |   | 0  0   1 |   | 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    /// Linear part, row 1 column 1.
    pub a: f64,
    /// Linear part, row 2 column 1.
    pub b: f64,
    /// Linear part, row 1 column 2.
    pub c: f64,
    /// Linear part, row 2 column 2.
    pub d: f64,
    /// Translation in x.
    pub tx: f64,
    /// Translation in y.
    pub ty: f64,
}

impl AffineTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// A pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    /// A pure axis scale.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// A counter-clockwise rotation by `radians` about the origin.
    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Composition `self ∘ other`: `other` is applied first.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Applies the transform to a point.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Determinant of the linear part.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Returns the inverse transform.
    ///
    /// Every transform in the orientation table is invertible; a singular
    /// transform here is a caller-side contract violation.
    pub fn inverse(&self) -> Result<AffineTransform, GeometryError> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return Err(GeometryError::SingularTransform);
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        Ok(AffineTransform {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }
}
