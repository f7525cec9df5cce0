use crate::{
    envelope::Envelope,
    geometry::{Geometry, SegmentCounts},
};
use std::{cell::OnceCell, fmt::Write};

///
/// MetricValue
///
/// Scalar result of a derived geometry property. Kept independent of the
/// engine's row value model so the geometry crate stays self-contained.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl MetricValue {
    fn from_opt_f64(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Float)
    }
}

///
/// GeometryMetrics
///
/// Per-geometry scratchpad for derived properties. Expensive aggregates
/// (envelope, segment kind counts, point-id statistics, Z/M ranges) are
/// computed at most once per instance; one instance is created per
/// evaluated row.
///

pub struct GeometryMetrics<'a> {
    geometry: Option<&'a Geometry>,
    envelope: OnceCell<Option<Envelope>>,
    segments: OnceCell<SegmentCounts>,
    point_ids: OnceCell<(i64, i64, usize)>,
    z_range: OnceCell<Option<(f64, f64)>>,
    m_range: OnceCell<Option<(f64, f64)>>,
}

impl<'a> GeometryMetrics<'a> {
    #[must_use]
    pub const fn new(geometry: Option<&'a Geometry>) -> Self {
        Self {
            geometry,
            envelope: OnceCell::new(),
            segments: OnceCell::new(),
            point_ids: OnceCell::new(),
            z_range: OnceCell::new(),
            m_range: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn geometry(&self) -> Option<&'a Geometry> {
        self.geometry
    }

    fn envelope(&self) -> Option<&Envelope> {
        self.envelope
            .get_or_init(|| self.geometry.and_then(Geometry::envelope))
            .as_ref()
    }

    fn segments(&self) -> &SegmentCounts {
        self.segments.get_or_init(|| {
            self.geometry
                .map(Geometry::segment_counts)
                .unwrap_or_default()
        })
    }

    fn point_ids(&self) -> (i64, i64, usize) {
        *self
            .point_ids
            .get_or_init(|| self.geometry.map_or((0, 0, 0), Geometry::point_id_stats))
    }

    fn z_range(&self) -> Option<(f64, f64)> {
        *self
            .z_range
            .get_or_init(|| self.geometry.and_then(Geometry::z_range))
    }

    fn m_range(&self) -> Option<(f64, f64)> {
        *self
            .m_range
            .get_or_init(|| self.geometry.and_then(Geometry::m_range))
    }
}

///
/// FormatKind
///

#[derive(Clone, Copy, Debug)]
enum FormatKind {
    /// Integers without decimals, floats as-is.
    Default,
    /// Decimal places derived from the spatial reference's linear unit.
    LinearUnit,
    /// Fixed number of decimal places.
    Fixed(usize),
}

///
/// MetricProperty
///
/// A named derived scalar property: a value function plus a formatting
/// rule for diagnostics output.
///

pub struct MetricProperty {
    pub name: &'static str,
    value_fn: fn(&GeometryMetrics) -> MetricValue,
    format: FormatKind,
}

const NULL_MARKER: &str = "<NULL>";

impl MetricProperty {
    #[must_use]
    pub fn value(&self, metrics: &GeometryMetrics) -> MetricValue {
        (self.value_fn)(metrics)
    }

    #[must_use]
    pub fn format_value(&self, metrics: &GeometryMetrics) -> String {
        let value = self.value(metrics);

        match value {
            MetricValue::Null => NULL_MARKER.to_string(),
            MetricValue::Bool(b) => b.to_string(),
            MetricValue::Int(i) => i.to_string(),
            MetricValue::Float(f) => match self.format {
                FormatKind::Default => format!("{f}"),
                FormatKind::Fixed(decimals) => format!("{f:.decimals$}"),
                FormatKind::LinearUnit => {
                    match metrics.geometry().and_then(|g| g.spatial_reference.as_ref()) {
                        Some(sr) => {
                            let decimals = sr.linear_unit_decimals();
                            format!("{f:.decimals$}")
                        }
                        None => format!("{f}"),
                    }
                }
            },
        }
    }
}

const fn prop(name: &'static str, value_fn: fn(&GeometryMetrics) -> MetricValue) -> MetricProperty {
    MetricProperty {
        name,
        value_fn,
        format: FormatKind::Default,
    }
}

const fn prop_fmt(
    name: &'static str,
    format: FormatKind,
    value_fn: fn(&GeometryMetrics) -> MetricValue,
) -> MetricProperty {
    MetricProperty {
        name,
        value_fn,
        format,
    }
}

static PROPERTIES: [MetricProperty; 29] = [
    prop_fmt("$Area", FormatKind::LinearUnit, |m| {
        MetricValue::Float(m.geometry().map_or(0.0, Geometry::area))
    }),
    prop_fmt("$Length", FormatKind::LinearUnit, |m| {
        MetricValue::Float(m.geometry().map_or(0.0, Geometry::length))
    }),
    prop("$VertexCount", |m| {
        MetricValue::Int(m.geometry().map_or(0, Geometry::vertex_count) as i64)
    }),
    prop_fmt("$SliverRatio", FormatKind::Fixed(3), |m| {
        MetricValue::from_opt_f64(m.geometry().and_then(Geometry::sliver_ratio))
    }),
    prop("$Dimension", |m| {
        MetricValue::from_opt_f64(m.geometry().and_then(Geometry::dimension))
    }),
    prop("$EllipticArcCount", |m| {
        MetricValue::Int(m.segments().elliptic_arc as i64)
    }),
    prop("$CircularArcCount", |m| {
        MetricValue::Int(m.segments().circular_arc as i64)
    }),
    prop("$BezierCount", |m| {
        MetricValue::Int(m.segments().bezier as i64)
    }),
    prop("$LinearSegmentCount", |m| {
        MetricValue::Int(m.segments().linear as i64)
    }),
    prop("$NonLinearSegmentCount", |m| {
        MetricValue::Int(m.segments().non_linear() as i64)
    }),
    prop("$SegmentCount", |m| {
        MetricValue::Int(m.segments().total() as i64)
    }),
    prop("$IsClosed", |m| {
        m.geometry()
            .and_then(Geometry::is_closed)
            .map_or(MetricValue::Null, MetricValue::Bool)
    }),
    prop("$XMin", |m| {
        MetricValue::from_opt_f64(m.envelope().map(|e| e.x_min))
    }),
    prop("$YMin", |m| {
        MetricValue::from_opt_f64(m.envelope().map(|e| e.y_min))
    }),
    prop("$XMax", |m| {
        MetricValue::from_opt_f64(m.envelope().map(|e| e.x_max))
    }),
    prop("$YMax", |m| {
        MetricValue::from_opt_f64(m.envelope().map(|e| e.y_max))
    }),
    prop("$ZMin", |m| {
        MetricValue::from_opt_f64(m.z_range().map(|(min, _)| min))
    }),
    prop("$ZMax", |m| {
        MetricValue::from_opt_f64(m.z_range().map(|(_, max)| max))
    }),
    prop("$MMin", |m| {
        MetricValue::from_opt_f64(m.m_range().map(|(min, _)| min))
    }),
    prop("$MMax", |m| {
        MetricValue::from_opt_f64(m.m_range().map(|(_, max)| max))
    }),
    prop("$UndefinedMValueCount", |m| {
        MetricValue::Int(m.geometry().map_or(0, Geometry::undefined_m_count) as i64)
    }),
    prop("$ControlPointCount", |m| {
        MetricValue::Int(m.point_ids().2 as i64)
    }),
    prop("$PartCount", |m| {
        MetricValue::Int(m.geometry().map_or(0, Geometry::part_count) as i64)
    }),
    prop("$IsMultipart", |m| {
        MetricValue::Bool(m.geometry().is_some_and(Geometry::is_multipart))
    }),
    prop("$ExteriorRingCount", |m| {
        MetricValue::Int(m.geometry().map_or(0, Geometry::exterior_ring_count) as i64)
    }),
    prop("$InteriorRingCount", |m| {
        MetricValue::Int(m.geometry().map_or(0, Geometry::interior_ring_count) as i64)
    }),
    prop("$RingCount", |m| {
        let count = m.geometry().map_or(0, |g| {
            g.exterior_ring_count() + g.interior_ring_count()
        });
        MetricValue::Int(count as i64)
    }),
    prop("$IsPointIdAware", |m| {
        MetricValue::Bool(m.geometry().is_some_and(|g| g.point_id_aware))
    }),
    prop("$PointIdMin", |m| MetricValue::Int(m.point_ids().0)),
];

/// All derived properties understood in constraint expressions.
///
/// `$PointIdMax` and `$PointIdCount` are resolved through
/// [`MetricSelection::get`] as aliases of the point-id statistics; the
/// table above carries one entry per distinct computation.
#[must_use]
pub fn all_properties() -> &'static [MetricProperty] {
    &PROPERTIES
}

static POINT_ID_MAX: MetricProperty = prop("$PointIdMax", |m| MetricValue::Int(m.point_ids().1));

static POINT_ID_COUNT: MetricProperty =
    prop("$PointIdCount", |m| MetricValue::Int(m.point_ids().2 as i64));

///
/// MetricSelection
///
/// The subset of derived properties a given constraint expression actually
/// references. Only referenced properties are registered so compiled
/// predicates stay cheap for simple rules; the reference test is plain
/// case-insensitive containment in the expression text.
///

pub struct MetricSelection {
    properties: Vec<&'static MetricProperty>,
}

impl MetricSelection {
    #[must_use]
    pub fn for_expression(expression: &str) -> Self {
        let lowered = expression.to_lowercase();

        let properties = Self::candidates()
            .filter(|p| lowered.contains(&p.name.to_lowercase()))
            .collect();

        Self { properties }
    }

    #[must_use]
    pub fn all() -> Self {
        Self {
            properties: Self::candidates().collect(),
        }
    }

    fn candidates() -> impl Iterator<Item = &'static MetricProperty> {
        PROPERTIES
            .iter()
            .chain([&POINT_ID_MAX, &POINT_ID_COUNT])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.iter().map(|p| p.name)
    }

    /// Case-insensitive property lookup within the selection.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static MetricProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .copied()
    }

    /// Human-readable `name=value; name=value` summary, sorted by
    /// property name, for diagnostics.
    #[must_use]
    pub fn format_values(&self, geometry: Option<&Geometry>) -> String {
        let metrics = GeometryMetrics::new(geometry);

        let mut sorted: Vec<&MetricProperty> = self.properties.clone();
        sorted.sort_by_key(|p| p.name);

        let mut out = String::new();
        for property in sorted {
            if !out.is_empty() {
                let _ = write!(out, "; ");
            }
            let _ = write!(out, "{}={}", property.name, property.format_value(&metrics));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryMetrics, MetricSelection, MetricValue};
    use crate::{envelope::Envelope, geometry::Geometry, spatial_reference::SpatialReference};

    fn square() -> Geometry {
        Geometry::rectangle(&Envelope::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn selection_registers_only_referenced_properties() {
        let selection = MetricSelection::for_expression("$Area > 100 AND $VertexCount > 3");

        let names: Vec<&str> = selection.names().collect();
        assert_eq!(names, vec!["$Area", "$VertexCount"]);
    }

    #[test]
    fn selection_lookup_is_case_insensitive() {
        let selection = MetricSelection::for_expression("$area > 1");
        assert!(selection.get("$AREA").is_some());
        assert!(selection.get("$Length").is_none());
    }

    #[test]
    fn area_and_vertex_count_values() {
        let geometry = square();
        let metrics = GeometryMetrics::new(Some(&geometry));
        let selection = MetricSelection::all();

        let area = selection.get("$Area").unwrap().value(&metrics);
        assert_eq!(area, MetricValue::Float(100.0));

        let vertex_count = selection.get("$VertexCount").unwrap().value(&metrics);
        assert_eq!(vertex_count, MetricValue::Int(5));
    }

    #[test]
    fn absent_geometry_yields_nulls_and_zeros() {
        let metrics = GeometryMetrics::new(None);
        let selection = MetricSelection::all();

        assert_eq!(
            selection.get("$XMin").unwrap().value(&metrics),
            MetricValue::Null
        );
        assert_eq!(
            selection.get("$SegmentCount").unwrap().value(&metrics),
            MetricValue::Int(0)
        );
    }

    #[test]
    fn format_values_is_sorted_and_uses_linear_unit_precision() {
        let geometry = square().with_spatial_reference(SpatialReference::projected(1.0, 0.001));
        let selection = MetricSelection::for_expression("$Length = 1 OR $Area > 2");

        let formatted = selection.format_values(Some(&geometry));
        assert_eq!(formatted, "$Area=100.00; $Length=40.00");
    }

    #[test]
    fn format_values_renders_null_marker() {
        let selection = MetricSelection::for_expression("$ZMin");
        let geometry = square();

        assert_eq!(selection.format_values(Some(&geometry)), "$ZMin=<NULL>");
    }

    #[test]
    fn point_id_aliases_resolve() {
        let selection = MetricSelection::for_expression("$PointIdMax >= $PointIdCount");
        assert!(selection.get("$PointIdMax").is_some());
        assert!(selection.get("$PointIdCount").is_some());
    }
}
