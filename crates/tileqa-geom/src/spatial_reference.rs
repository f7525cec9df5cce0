use serde::{Deserialize, Serialize};

///
/// CoordinateSystemKind
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum CoordinateSystemKind {
    /// Projected coordinate system with a known linear unit.
    Projected { meters_per_unit: f64 },
    Geographic,
    Unknown,
}

///
/// SpatialReference
///
/// The narrow slice of spatial-reference metadata the engine consumes:
/// the coordinate-system kind (for value formatting) and the XY/M
/// tolerances (for tolerance-aware result comparison).
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SpatialReference {
    pub kind: CoordinateSystemKind,
    pub xy_tolerance: Option<f64>,
    pub m_tolerance: Option<f64>,
}

/// Fallback tolerance for coordinates in the geographic value range.
const GEOGRAPHIC_FALLBACK_TOLERANCE: f64 = 1e-8;

/// Fallback tolerance for projected-like coordinates (millimeter scale).
const PROJECTED_FALLBACK_TOLERANCE: f64 = 1e-3;

impl SpatialReference {
    #[must_use]
    pub const fn projected(meters_per_unit: f64, xy_tolerance: f64) -> Self {
        Self {
            kind: CoordinateSystemKind::Projected { meters_per_unit },
            xy_tolerance: Some(xy_tolerance),
            m_tolerance: None,
        }
    }

    #[must_use]
    pub const fn geographic(xy_tolerance: f64) -> Self {
        Self {
            kind: CoordinateSystemKind::Geographic,
            xy_tolerance: Some(xy_tolerance),
            m_tolerance: None,
        }
    }

    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            kind: CoordinateSystemKind::Unknown,
            xy_tolerance: None,
            m_tolerance: None,
        }
    }

    /// Number of decimal places for formatting lengths/areas: projected
    /// systems round to centimeters in the system's linear unit, everything
    /// else gets 8 decimals.
    #[must_use]
    pub fn linear_unit_decimals(&self) -> usize {
        match self.kind {
            CoordinateSystemKind::Projected { meters_per_unit } if meters_per_unit > 0.0 => {
                let cm_per_unit = meters_per_unit * 100.0;
                let decimals = cm_per_unit.log10().round();
                if decimals < 0.0 { 0 } else { decimals as usize }
            }
            _ => 8,
        }
    }

    /// Tolerance used for envelope comparison when no spatial reference (or
    /// no tolerance) is available: coordinates that look geographic get a
    /// degree-scale tolerance, everything else a millimeter-scale one.
    #[must_use]
    pub fn fallback_xy_tolerance(x: f64, y: f64) -> f64 {
        if x.abs() <= 360.0 && y.abs() <= 90.0 {
            GEOGRAPHIC_FALLBACK_TOLERANCE
        } else {
            PROJECTED_FALLBACK_TOLERANCE
        }
    }
}
