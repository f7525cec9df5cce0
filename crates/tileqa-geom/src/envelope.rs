use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Envelope
///
/// Axis-aligned 2D bounding box. Coordinates are normalized on
/// construction so that `x_min <= x_max` and `y_min <= y_max`.
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Envelope {
    #[must_use]
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Degenerate envelope covering a single coordinate.
    #[must_use]
    pub const fn point(x: f64, y: f64) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        }
    }

    #[must_use]
    pub const fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[must_use]
    pub const fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Smallest envelope containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Envelope grown by `distance` on every side.
    #[must_use]
    pub fn expanded(&self, distance: f64) -> Self {
        Self::new(
            self.x_min - distance,
            self.y_min - distance,
            self.x_max + distance,
            self.y_max + distance,
        )
    }

    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.x_min <= other.x_max
            && self.x_max >= other.x_min
            && self.y_min <= other.y_max
            && self.y_max >= other.y_min
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    #[must_use]
    pub const fn contains_coord(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Whether everything covered by this envelope has been processed once
    /// the tiling frontier has advanced past `(frontier_x, frontier_y)`.
    ///
    /// An extent that sticks out beyond the frontier's upper-right corner,
    /// or beyond the overall run envelope, can still receive findings from
    /// later tiles and must not be considered fully processed.
    #[must_use]
    pub fn is_fully_processed(
        &self,
        frontier_x: f64,
        frontier_y: f64,
        run_envelope: Option<&Self>,
    ) -> bool {
        if self.x_max > frontier_x || self.y_max > frontier_y {
            return false;
        }

        if let Some(run) = run_envelope {
            if self.x_min < run.x_min || self.y_min < run.y_min {
                return false;
            }
            if self.x_max > run.x_max || self.y_max > run.y_max {
                return false;
            }
        }

        true
    }

    /// Tolerance-aware total order on envelopes: coordinates closer than
    /// `tolerance` compare equal; otherwise min corners order before max
    /// corners.
    #[must_use]
    pub fn compare(&self, other: &Self, tolerance: f64) -> Ordering {
        for (a, b) in [
            (self.x_min, other.x_min),
            (self.y_min, other.y_min),
            (self.x_max, other.x_max),
            (self.y_max, other.y_max),
        ] {
            if (a - b).abs() > tolerance {
                return if a < b { Ordering::Less } else { Ordering::Greater };
            }
        }

        Ordering::Equal
    }
}
