//! 2D coordinate handling — canonicalization and the proximity predicate.
//!
//! Coordinates arrive from descriptors as either `[x, y]` pairs or
//! `{ "x": .., "y": .. }` objects; both deserialize into the one canonical
//! [`Coord`] form. Coincidence checks use a fixed absolute tolerance so that
//! positions produced by interpolated travel still register as "on site".

use serde::{Deserialize, Serialize};

/// Absolute per-axis tolerance for coincidence checks. There is no
/// relative component, so the check stays equally tight at large
/// coordinate magnitudes; `step_toward` snaps exactly onto targets in
/// reach, so travel never depends on a magnitude-scaled tolerance.
pub const COORD_TOLERANCE: f64 = 1e-8;

/// A canonical 2D coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CoordRepr")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

/// Accepted descriptor spellings of a coordinate.
#[derive(Deserialize)]
#[serde(untagged)]
enum CoordRepr {
    Pair([f64; 2]),
    Named { x: f64, y: f64 },
}

impl From<CoordRepr> for Coord {
    fn from(repr: CoordRepr) -> Self {
        match repr {
            CoordRepr::Pair([x, y]) => Coord { x, y },
            CoordRepr::Named { x, y } => Coord { x, y },
        }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Coord { x, y }
    }
}

impl From<[f64; 2]> for Coord {
    fn from([x, y]: [f64; 2]) -> Self {
        Coord { x, y }
    }
}

impl Coord {
    pub const ORIGIN: Self = Coord { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Coord { x, y }
    }

    pub fn distance(&self, other: Coord) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// True if both axes coincide within [`COORD_TOLERANCE`].
    pub fn within_range(&self, other: Coord) -> bool {
        (self.x - other.x).abs() <= COORD_TOLERANCE && (self.y - other.y).abs() <= COORD_TOLERANCE
    }

    /// Move toward `target` by at most `max_step` along the straight line,
    /// snapping exactly onto the target once it is in reach.
    pub fn step_toward(&self, target: Coord, max_step: f64) -> Coord {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= max_step {
            target
        } else {
            Coord {
                x: self.x + max_step * dx / dist,
                y: self.y + max_step * dy / dist,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn test_within_range_tolerance() {
        let a = Coord::new(1.0, 1.0);
        assert!(a.within_range(Coord::new(1.0 + 1e-9, 1.0 - 1e-9)));
        assert!(!a.within_range(Coord::new(1.0 + 1e-6, 1.0)));
    }

    #[test]
    fn test_within_range_stays_absolute_at_large_magnitudes() {
        // 1e-4 off at 1e6 would pass a magnitude-scaled check
        let a = Coord::new(1.0e6, 0.0);
        assert!(!a.within_range(Coord::new(1.0e6 + 1e-4, 0.0)));
        assert!(a.within_range(Coord::new(1.0e6, 0.0)));
    }

    #[test]
    fn test_step_toward_partial() {
        let a = Coord::new(0.0, 0.0);
        let moved = a.step_toward(Coord::new(10.0, 0.0), 4.0);
        assert!(moved.within_range(Coord::new(4.0, 0.0)));
    }

    #[test]
    fn test_step_toward_snaps_to_target() {
        let a = Coord::new(9.0, 0.0);
        let target = Coord::new(10.0, 0.0);
        assert_eq!(a.step_toward(target, 4.0), target);
        // exactly in reach also snaps
        assert_eq!(Coord::new(6.0, 0.0).step_toward(target, 4.0), target);
    }

    #[test]
    fn test_deserialize_pair_and_named() {
        let pair: Coord = serde_json::from_str("[2.0, 3.0]").unwrap();
        let named: Coord = serde_json::from_str(r#"{"x": 2.0, "y": 3.0}"#).unwrap();
        assert_eq!(pair, named);
        assert_eq!(pair, Coord::new(2.0, 3.0));
    }
}
