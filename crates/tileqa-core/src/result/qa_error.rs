use crate::{error::ContainerError, involved::Involved, value::Value};
use std::cmp::Ordering;
use tileqa_geom::{Envelope, Geometry};

///
/// ErrorGeometry
///
/// Geometry attached to a finding. The envelope and XY tolerance are
/// captured once at construction; `reduce` releases the raw geometry to
/// bound memory while keeping the cached envelope, and any later access
/// to the raw geometry fails fast.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorGeometry {
    geometry: Option<Geometry>,
    envelope: Option<Envelope>,
    xy_tolerance: f64,
    reduced: bool,
}

impl ErrorGeometry {
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        let envelope = geometry.envelope();
        let xy_tolerance = geometry.xy_tolerance();

        Self {
            geometry: Some(geometry),
            envelope,
            xy_tolerance,
            reduced: false,
        }
    }

    #[must_use]
    pub const fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    #[must_use]
    pub const fn xy_tolerance(&self) -> f64 {
        self.xy_tolerance
    }

    #[must_use]
    pub const fn is_reduced(&self) -> bool {
        self.reduced
    }

    /// The raw geometry; fails once the geometry has been reduced.
    pub fn geometry(&self) -> Result<&Geometry, ContainerError> {
        self.geometry
            .as_ref()
            .ok_or(ContainerError::GeometryReduced)
    }

    /// Release the raw geometry, keeping the cached envelope and
    /// tolerance.
    pub fn reduce(&mut self) {
        self.geometry = None;
        self.reduced = true;
    }

    /// Tolerance-aware envelope ordering; absent envelopes order first.
    #[must_use]
    pub fn compare_envelope(&self, other: &Self) -> Ordering {
        match (&self.envelope, &other.envelope) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => {
                let tolerance = self.xy_tolerance.max(other.xy_tolerance);
                a.compare(b, tolerance)
            }
        }
    }
}

///
/// QaError
///
/// An immutable finding raised by a check. `duplicate` is set by the
/// administrator when an equal finding is already present.
///

#[derive(Clone, Debug)]
pub struct QaError {
    pub check_name: String,
    pub description: String,
    pub involved: Vec<Involved>,
    pub geometry: Option<ErrorGeometry>,
    /// Classification code from the check's issue catalog.
    pub code: Option<String>,
    /// Label of the affected attribute/component, when one is singled out.
    pub affected_component: Option<String>,
    pub values: Vec<Value>,
    pub duplicate: bool,
    /// Extent used for frontier eviction when the finding itself carries
    /// no geometry (derived from the involved rows at report time).
    pub eviction_extent: Option<Envelope>,
}

impl QaError {
    #[must_use]
    pub fn new(
        check_name: impl Into<String>,
        description: impl Into<String>,
        involved: Vec<Involved>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            description: description.into(),
            involved,
            geometry: None,
            code: None,
            affected_component: None,
            values: Vec::new(),
            duplicate: false,
            eviction_extent: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        let geometry = ErrorGeometry::new(geometry);
        self.eviction_extent = geometry.envelope().copied();
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_affected_component(mut self, component: impl Into<String>) -> Self {
        self.affected_component = Some(component.into());
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        self.geometry
            .as_ref()
            .and_then(ErrorGeometry::envelope)
            .or(self.eviction_extent.as_ref())
    }

    /// Release the finding's raw geometry, keeping its envelope.
    pub fn reduce_geometry(&mut self) {
        if let Some(geometry) = &mut self.geometry {
            geometry.reduce();
        }
    }

    /// Whether the finding can no longer change once the tiling frontier
    /// has advanced past `(frontier_x, frontier_y)`. Findings without
    /// any extent are never evicted.
    #[must_use]
    pub fn is_fully_processed(
        &self,
        frontier_x: f64,
        frontier_y: f64,
        run_envelope: Option<&Envelope>,
    ) -> bool {
        self.envelope()
            .is_some_and(|env| env.is_fully_processed(frontier_x, frontier_y, run_envelope))
    }
}
