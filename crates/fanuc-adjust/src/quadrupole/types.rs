//! Plane point type used by the quadrupole model.

use std::ops::{Add, Sub};

use serde::Serialize;

/// 2D point in drill-file coordinates (mm or inches, as the file uses).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2D {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point2D {
    /// The origin of the plate frame.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a point from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the origin.
    pub fn radius(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        (self - other).radius()
    }

    /// True when both coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_is_euclidean_norm() {
        assert!((Point2D::new(3.0, -4.0).radius() - 5.0).abs() < f64::EPSILON);
        assert!(Point2D::ORIGIN.radius().abs() < f64::EPSILON);
    }

    #[test]
    fn add_and_sub_are_componentwise() {
        let a = Point2D::new(1.5, -2.0);
        let b = Point2D::new(0.5, 4.0);
        assert_eq!(a + b, Point2D::new(2.0, 2.0));
        assert_eq!(a - b, Point2D::new(1.0, -6.0));
        assert!((a.distance(b) - (1.0_f64 + 36.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn nan_is_not_finite() {
        assert!(Point2D::new(1.0, 2.0).is_finite());
        assert!(!Point2D::new(f64::NAN, 2.0).is_finite());
        assert!(!Point2D::new(1.0, f64::INFINITY).is_finite());
    }
}
