//! Quadrupole distortion field and its forward and inverse point transforms.
//!
//! The field is a 2-fold symmetric displacement about the plate origin:
//!
//! ```text
//! displacement(p) = magnitude * r * Q p,   Q = [[cos 2a,  sin 2a],
//!                                               [sin 2a, -cos 2a]]
//! ```
//!
//! where `r = |p|` and `a` is the quadrupole angle. The displacement has
//! length `magnitude * r^2`, a radial component of
//! `magnitude * r^2 * cos(2 * (theta - a))` and vanishes at the origin, so
//! `magnitude` is in units of 1/length.
//!
//! The forward map is nonlinear, so [`QuadrupoleModel::apply_inverse`] solves
//! it with Newton's method seeded by the first-order approximation
//! `q - displacement(q)`. The solution reproduces the distorted point to
//! within [`INVERSE_TOLERANCE`]. The first-order seed alone leaves a forward
//! residual of about `2 * magnitude^2 * r^3`.

use crate::error::{ConfigError, InversionError};

use super::types::Point2D;

/// Forward residual (length units) at which the inverse is accepted.
pub const INVERSE_TOLERANCE: f64 = 1e-9;

/// Newton iterations allowed before the inverse is declared divergent.
pub const MAX_INVERSE_ITERATIONS: u32 = 50;

const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Quadrupole correction with fixed magnitude and angle.
///
/// The default model is the identity. A `FileAdjuster` keeps its own copy,
/// so the parameters stay fixed for the whole batch it processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrupoleModel {
    magnitude: f64,
    angle_deg: f64,
    cos_2a: f64,
    sin_2a: f64,
}

/// Jacobian of the forward map, row-major.
#[derive(Debug, Clone, Copy)]
struct Jacobian {
    xx: f64,
    xy: f64,
    yx: f64,
    yy: f64,
}

impl Jacobian {
    const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
    };

    fn determinant(self) -> f64 {
        self.xx.mul_add(self.yy, -(self.xy * self.yx))
    }

    /// Solves `J * delta = rhs`, or `None` when `J` is numerically singular.
    fn solve(self, rhs: Point2D) -> Option<Point2D> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DETERMINANT {
            return None;
        }
        Some(Point2D::new(
            self.yy.mul_add(rhs.x, -(self.xy * rhs.y)) / det,
            self.xx.mul_add(rhs.y, -(self.yx * rhs.x)) / det,
        ))
    }
}

impl Default for QuadrupoleModel {
    fn default() -> Self {
        Self {
            magnitude: 0.0,
            angle_deg: 0.0,
            cos_2a: 1.0,
            sin_2a: 0.0,
        }
    }
}

impl QuadrupoleModel {
    /// Builds a model from a magnitude and an angle in degrees.
    ///
    /// The angle may take any finite value; it is used modulo 180 degrees.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMagnitude`] for a negative or non-finite
    /// magnitude and [`ConfigError::InvalidAngle`] for a non-finite angle.
    pub fn from_magnitude_angle(magnitude: f64, angle_deg: f64) -> Result<Self, ConfigError> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(ConfigError::InvalidMagnitude(magnitude));
        }
        if !angle_deg.is_finite() {
            return Err(ConfigError::InvalidAngle(angle_deg));
        }

        let two_a = 2.0 * angle_deg.to_radians();
        Ok(Self {
            magnitude,
            angle_deg,
            cos_2a: two_a.cos(),
            sin_2a: two_a.sin(),
        })
    }

    /// Replaces the magnitude and angle.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_magnitude_angle`]; on error `self` is unchanged.
    pub fn set_magnitude_angle(
        &mut self,
        magnitude: f64,
        angle_deg: f64,
    ) -> Result<(), ConfigError> {
        *self = Self::from_magnitude_angle(magnitude, angle_deg)?;
        Ok(())
    }

    /// Returns `(magnitude, angle_deg)` as last set.
    pub const fn magnitude_angle(&self) -> (f64, f64) {
        (self.magnitude, self.angle_deg)
    }

    /// True when the model leaves every point where it is.
    pub fn is_identity(&self) -> bool {
        self.magnitude <= 0.0
    }

    /// Displacement of the ideal point `p` in the distorted frame.
    pub fn displacement(&self, p: Point2D) -> Point2D {
        let scale = self.magnitude * p.radius();
        let q = self.unit_tensor_times(p);
        Point2D::new(scale * q.x, scale * q.y)
    }

    /// Maps an ideal position to where the machine actually puts it.
    pub fn apply_forward(&self, p: Point2D) -> Point2D {
        p + self.displacement(p)
    }

    /// First-order inverse: subtracts the displacement evaluated at `q`.
    ///
    /// Only accurate while `magnitude * r` is small; the forward residual is
    /// about `2 * magnitude^2 * r^3`.
    pub fn apply_first_order_inverse(&self, q: Point2D) -> Point2D {
        q - self.displacement(q)
    }

    /// Recovers the ideal position whose forward image is `q`.
    ///
    /// # Errors
    ///
    /// Returns an [`InversionError`] if `q` is not finite, if the map is
    /// singular along the iteration, or if the residual is still above
    /// [`INVERSE_TOLERANCE`] after [`MAX_INVERSE_ITERATIONS`] steps.
    pub fn apply_inverse(&self, q: Point2D) -> Result<Point2D, InversionError> {
        if !q.is_finite() {
            return Err(InversionError::NonFinite { point: q });
        }
        if self.is_identity() {
            return Ok(q);
        }

        let mut p = self.apply_first_order_inverse(q);
        for _ in 0..MAX_INVERSE_ITERATIONS {
            let error = self.apply_forward(p) - q;
            let residual = error.radius();
            if !residual.is_finite() {
                return Err(InversionError::NonFinite { point: q });
            }
            if residual <= INVERSE_TOLERANCE {
                return Ok(p);
            }

            let step = self
                .jacobian(p)
                .solve(error)
                .ok_or(InversionError::SingularJacobian { point: q })?;
            p = p - step;
        }

        let residual = (self.apply_forward(p) - q).radius();
        if residual <= INVERSE_TOLERANCE {
            return Ok(p);
        }
        Err(InversionError::NoConvergence {
            point: q,
            iterations: MAX_INVERSE_ITERATIONS,
            residual,
        })
    }

    /// Applies the forward transform, or the inverse when `do_inverse` is set.
    ///
    /// # Errors
    ///
    /// Only the inverse can fail; see [`Self::apply_inverse`].
    pub fn apply_one(&self, point: Point2D, do_inverse: bool) -> Result<Point2D, InversionError> {
        if do_inverse {
            self.apply_inverse(point)
        } else {
            Ok(self.apply_forward(point))
        }
    }

    fn unit_tensor_times(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.cos_2a.mul_add(p.x, self.sin_2a * p.y),
            self.sin_2a.mul_add(p.x, -(self.cos_2a * p.y)),
        )
    }

    // d(m r Q p)/dp = m (Q p p^T / r + r Q)
    fn jacobian(&self, p: Point2D) -> Jacobian {
        let r = p.radius();
        if r <= f64::MIN_POSITIVE {
            return Jacobian::IDENTITY;
        }
        let magnitude = self.magnitude;
        let qp = self.unit_tensor_times(p);
        Jacobian {
            xx: magnitude.mul_add(r.mul_add(self.cos_2a, qp.x * p.x / r), 1.0),
            xy: magnitude * r.mul_add(self.sin_2a, qp.x * p.y / r),
            yx: magnitude * r.mul_add(self.sin_2a, qp.y * p.x / r),
            yy: magnitude.mul_add((-r).mul_add(self.cos_2a, qp.y * p.y / r), 1.0),
        }
    }
}
