//! Planar geometry for node positions and kinematics.
//!
//! The engine operates on abstract 2D positions and logical headings -
//! there is no geodesy here. Headings are degrees in `[0, 360)` and all
//! heading comparisons are circular (359° and 1° differ by 2°, not 358°).

use std::ops::{Add, Sub};

/// A position on the abstract 2D plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Origin of the plane.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Component-wise mean of a non-empty set of positions.
    ///
    /// Returns `None` for an empty iterator - an empty cluster has no
    /// centroid, and callers must dissolve it rather than invent one.
    pub fn centroid<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut sum = Self::ORIGIN;
        let mut count = 0usize;
        for p in positions {
            sum.x += p.x;
            sum.y += p.y;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self::new(sum.x / count as f64, sum.y / count as f64))
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Speed and heading of a moving node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Velocity {
    /// Scalar speed in abstract units per tick.
    pub speed: f64,
    /// Heading in degrees, `[0, 360)`.
    pub heading: f64,
}

impl Velocity {
    /// Create a velocity, normalizing the heading into `[0, 360)`.
    pub fn new(speed: f64, heading: f64) -> Self {
        Self {
            speed,
            heading: heading.rem_euclid(360.0),
        }
    }

    /// Absolute speed difference to another velocity.
    pub fn speed_delta(&self, other: &Self) -> f64 {
        (self.speed - other.speed).abs()
    }

    /// Circular heading difference to another velocity, in `[0, 180]`.
    pub fn heading_delta(&self, other: &Self) -> f64 {
        heading_delta(self.heading, other.heading)
    }
}

/// Circular difference between two headings in degrees, always in `[0, 180]`.
pub fn heading_delta(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
    }

    #[test]
    fn centroid_of_square() {
        let corners = [
            Position::new(0.0, 0.0),
            Position::new(2.0, 0.0),
            Position::new(2.0, 2.0),
            Position::new(0.0, 2.0),
        ];
        let c = Position::centroid(corners).unwrap();
        assert_eq!(c, Position::new(1.0, 1.0));
    }

    #[test]
    fn centroid_of_nothing_is_none() {
        assert!(Position::centroid(std::iter::empty()).is_none());
    }

    #[test]
    fn heading_wraps_at_north() {
        // 359° vs 1° is a 2° difference, not 358°
        assert!((heading_delta(359.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((heading_delta(1.0, 359.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn heading_opposite_is_180() {
        assert!((heading_delta(0.0, 180.0) - 180.0).abs() < 1e-9);
        assert!((heading_delta(90.0, 270.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_normalizes_heading() {
        let v = Velocity::new(10.0, 725.0);
        assert!((v.heading - 5.0).abs() < 1e-9);

        let v = Velocity::new(10.0, -90.0);
        assert!((v.heading - 270.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn heading_delta_in_half_circle(a in 0.0f64..3600.0, b in -3600.0f64..3600.0) {
            let d = heading_delta(a, b);
            prop_assert!((0.0..=180.0).contains(&d));
        }

        #[test]
        fn heading_delta_symmetric(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            prop_assert!((heading_delta(a, b) - heading_delta(b, a)).abs() < 1e-9);
        }

        #[test]
        fn distance_symmetric(x1 in -1e4f64..1e4, y1 in -1e4f64..1e4,
                              x2 in -1e4f64..1e4, y2 in -1e4f64..1e4) {
            let a = Position::new(x1, y1);
            let b = Position::new(x2, y2);
            prop_assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-9);
        }
    }
}
