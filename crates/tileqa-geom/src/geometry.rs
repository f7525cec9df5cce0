use crate::{envelope::Envelope, spatial_reference::SpatialReference};
use serde::{Deserialize, Serialize};

///
/// Vertex
///
/// A single coordinate with optional Z/M values and a point id
/// (0 denotes "no id", matching the convention of the consumed stores).
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
    pub id: i64,
}

impl Vertex {
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
            id: 0,
        }
    }

    #[must_use]
    pub const fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    #[must_use]
    pub const fn with_m(mut self, m: f64) -> Self {
        self.m = Some(m);
        self
    }

    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

///
/// SegmentKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SegmentKind {
    Linear,
    CircularArc,
    EllipticArc,
    Bezier,
}

///
/// SegmentCounts
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SegmentCounts {
    pub linear: usize,
    pub circular_arc: usize,
    pub elliptic_arc: usize,
    pub bezier: usize,
}

impl SegmentCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.linear + self.circular_arc + self.elliptic_arc + self.bezier
    }

    #[must_use]
    pub const fn non_linear(&self) -> usize {
        self.total() - self.linear
    }
}

///
/// Path
///
/// An ordered vertex sequence: one polyline part or one polygon ring.
/// `kinds` carries one entry per segment (`vertices.len() - 1`); an empty
/// `kinds` list means all segments are linear.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Path {
    pub vertices: Vec<Vertex>,
    pub kinds: Vec<SegmentKind>,
}

impl Path {
    /// Path with all-linear segments.
    #[must_use]
    pub const fn line(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            kinds: Vec::new(),
        }
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    #[must_use]
    pub fn segment_kind(&self, index: usize) -> SegmentKind {
        self.kinds.get(index).copied().unwrap_or(SegmentKind::Linear)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) if self.vertices.len() > 2 => {
                first.x == last.x && first.y == last.y
            }
            _ => false,
        }
    }

    /// Sum of straight-line segment lengths. Non-linear segments are
    /// measured by their chords.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| {
                let dx = pair[1].x - pair[0].x;
                let dy = pair[1].y - pair[0].y;
                dx.hypot(dy)
            })
            .sum()
    }

    /// Shoelace area; positive for counter-clockwise rings.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }

        let mut sum = 0.0;
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            sum += a.x.mul_add(b.y, -(b.x * a.y));
        }

        sum / 2.0
    }

    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        let first = self.vertices.first()?;
        let mut env = Envelope::point(first.x, first.y);

        for v in &self.vertices[1..] {
            env = env.union(&Envelope::point(v.x, v.y));
        }

        Some(env)
    }
}

///
/// Shape
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Shape {
    Point(Vertex),
    Multipoint(Vec<Vertex>),
    Polyline(Vec<Path>),
    Polygon(Vec<Path>),
}

///
/// Geometry
///
/// Owned geometry value. Z/M/point-id awareness is tracked separately from
/// vertex payloads: an awareness flag with an absent vertex value means
/// "aware but undefined" (relevant for `$UndefinedMValueCount`).
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Geometry {
    pub shape: Shape,
    pub spatial_reference: Option<SpatialReference>,
    pub z_aware: bool,
    pub m_aware: bool,
    pub point_id_aware: bool,
}

impl Geometry {
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        let mut geometry = Self {
            shape,
            spatial_reference: None,
            z_aware: false,
            m_aware: false,
            point_id_aware: false,
        };

        let z_aware = geometry.vertices().any(|v| v.z.is_some());
        let m_aware = geometry.vertices().any(|v| v.m.is_some());
        let point_id_aware = geometry.vertices().any(|v| v.id != 0);

        geometry.z_aware = z_aware;
        geometry.m_aware = m_aware;
        geometry.point_id_aware = point_id_aware;
        geometry
    }

    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Shape::Point(Vertex::xy(x, y)))
    }

    #[must_use]
    pub fn multipoint(vertices: Vec<Vertex>) -> Self {
        Self::new(Shape::Multipoint(vertices))
    }

    #[must_use]
    pub fn polyline(paths: Vec<Path>) -> Self {
        Self::new(Shape::Polyline(paths))
    }

    #[must_use]
    pub fn polygon(rings: Vec<Path>) -> Self {
        Self::new(Shape::Polygon(rings))
    }

    /// Convenience: a closed rectangle polygon.
    #[must_use]
    pub fn rectangle(env: &Envelope) -> Self {
        Self::polygon(vec![Path::line(vec![
            Vertex::xy(env.x_min, env.y_min),
            Vertex::xy(env.x_max, env.y_min),
            Vertex::xy(env.x_max, env.y_max),
            Vertex::xy(env.x_min, env.y_max),
            Vertex::xy(env.x_min, env.y_min),
        ])])
    }

    #[must_use]
    pub fn with_spatial_reference(mut self, sr: SpatialReference) -> Self {
        self.spatial_reference = Some(sr);
        self
    }

    #[must_use]
    pub const fn with_m_aware(mut self, aware: bool) -> Self {
        self.m_aware = aware;
        self
    }

    #[must_use]
    pub const fn with_z_aware(mut self, aware: bool) -> Self {
        self.z_aware = aware;
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.shape {
            Shape::Point(_) => false,
            Shape::Multipoint(vertices) => vertices.is_empty(),
            Shape::Polyline(paths) | Shape::Polygon(paths) => {
                paths.iter().all(|p| p.vertices.is_empty())
            }
        }
    }

    pub fn vertices(&self) -> Box<dyn Iterator<Item = &Vertex> + '_> {
        match &self.shape {
            Shape::Point(v) => Box::new(std::iter::once(v)),
            Shape::Multipoint(vertices) => Box::new(vertices.iter()),
            Shape::Polyline(paths) | Shape::Polygon(paths) => {
                Box::new(paths.iter().flat_map(|p| p.vertices.iter()))
            }
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    #[must_use]
    pub fn part_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }

        match &self.shape {
            Shape::Point(_) => 1,
            Shape::Multipoint(vertices) => vertices.len(),
            Shape::Polyline(paths) | Shape::Polygon(paths) => paths.len(),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &[Path] {
        match &self.shape {
            Shape::Polyline(paths) | Shape::Polygon(paths) => paths,
            _ => &[],
        }
    }

    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        let mut result: Option<Envelope> = None;

        for v in self.vertices() {
            let point = Envelope::point(v.x, v.y);
            result = Some(match result {
                Some(env) => env.union(&point),
                None => point,
            });
        }

        result
    }

    /// Topological dimension: 0 for points, 1 for lines, 2 for areas.
    /// `None` for empty geometries.
    #[must_use]
    pub fn dimension(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }

        Some(match &self.shape {
            Shape::Point(_) | Shape::Multipoint(_) => 0.0,
            Shape::Polyline(_) => 1.0,
            Shape::Polygon(_) => 2.0,
        })
    }

    #[must_use]
    pub fn segment_counts(&self) -> SegmentCounts {
        let mut counts = SegmentCounts::default();

        for path in self.paths() {
            for i in 0..path.segment_count() {
                match path.segment_kind(i) {
                    SegmentKind::Linear => counts.linear += 1,
                    SegmentKind::CircularArc => counts.circular_arc += 1,
                    SegmentKind::EllipticArc => counts.elliptic_arc += 1,
                    SegmentKind::Bezier => counts.bezier += 1,
                }
            }
        }

        counts
    }

    /// `None` for geometries where closedness is undefined (points).
    #[must_use]
    pub fn is_closed(&self) -> Option<bool> {
        match &self.shape {
            Shape::Point(_) | Shape::Multipoint(_) => None,
            Shape::Polyline(paths) => Some(!paths.is_empty() && paths.iter().all(Path::is_closed)),
            Shape::Polygon(_) => Some(true),
        }
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.part_count() > 1
    }

    /// Polygon area: exterior rings count positive, holes negative.
    /// 0 for non-areal geometries.
    #[must_use]
    pub fn area(&self) -> f64 {
        match &self.shape {
            Shape::Polygon(rings) => rings.iter().map(Path::signed_area).sum::<f64>().abs(),
            _ => 0.0,
        }
    }

    /// Polyline length or polygon perimeter. 0 for points.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.paths().iter().map(Path::length).sum()
    }

    #[must_use]
    pub fn exterior_ring_count(&self) -> usize {
        match &self.shape {
            Shape::Polygon(rings) => rings.iter().filter(|r| r.signed_area() >= 0.0).count(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn interior_ring_count(&self) -> usize {
        match &self.shape {
            Shape::Polygon(rings) => rings.iter().filter(|r| r.signed_area() < 0.0).count(),
            _ => 0,
        }
    }

    /// Perimeter-squared over area; a compactness measure where large
    /// values indicate sliver polygons. `None` for non-areal or degenerate
    /// geometries.
    #[must_use]
    pub fn sliver_ratio(&self) -> Option<f64> {
        if !matches!(self.shape, Shape::Polygon(_)) {
            return None;
        }

        let area = self.area();
        if area <= 0.0 {
            return None;
        }

        let perimeter = self.length();
        Some(perimeter * perimeter / area)
    }

    /// `(min, max, count_of_nonzero)` over vertex point ids; zeros for
    /// empty geometries.
    #[must_use]
    pub fn point_id_stats(&self) -> (i64, i64, usize) {
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        let mut count = 0;
        let mut any = false;

        for v in self.vertices() {
            any = true;
            min = min.min(v.id);
            max = max.max(v.id);
            if v.id != 0 {
                count += 1;
            }
        }

        if any { (min, max, count) } else { (0, 0, 0) }
    }

    #[must_use]
    pub fn z_range(&self) -> Option<(f64, f64)> {
        if !self.z_aware {
            return None;
        }

        value_range(self.vertices().filter_map(|v| v.z))
    }

    #[must_use]
    pub fn m_range(&self) -> Option<(f64, f64)> {
        if !self.m_aware {
            return None;
        }

        value_range(self.vertices().filter_map(|v| v.m))
    }

    /// Number of vertices without a defined M value. For M-unaware
    /// geometries every vertex counts as undefined.
    #[must_use]
    pub fn undefined_m_count(&self) -> usize {
        if !self.m_aware {
            return self.vertex_count();
        }

        self.vertices()
            .filter(|v| v.m.is_none_or(f64::is_nan))
            .count()
    }

    /// XY tolerance for comparisons: from the spatial reference when set,
    /// otherwise a coordinate-range heuristic.
    #[must_use]
    pub fn xy_tolerance(&self) -> f64 {
        if let Some(tolerance) = self
            .spatial_reference
            .as_ref()
            .and_then(|sr| sr.xy_tolerance)
        {
            return tolerance;
        }

        let Some(env) = self.envelope() else {
            return SpatialReference::fallback_xy_tolerance(0.0, 0.0);
        };

        SpatialReference::fallback_xy_tolerance(env.x_max, env.y_max)
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;

    for v in values {
        if v.is_nan() {
            continue;
        }
        range = Some(match range {
            Some((min, max)) => (min.min(v), max.max(v)),
            None => (v, v),
        });
    }

    range
}

#[cfg(test)]
mod tests {
    use super::{Geometry, Path, SegmentKind, Vertex};
    use crate::envelope::Envelope;

    fn unit_square() -> Geometry {
        Geometry::rectangle(&Envelope::new(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn rectangle_area_and_perimeter() {
        let square = unit_square();
        assert_eq!(square.area(), 1.0);
        assert_eq!(square.length(), 4.0);
        assert_eq!(square.exterior_ring_count(), 1);
        assert_eq!(square.interior_ring_count(), 0);
    }

    #[test]
    fn polygon_with_hole_subtracts_area() {
        let outer = Path::line(vec![
            Vertex::xy(0.0, 0.0),
            Vertex::xy(4.0, 0.0),
            Vertex::xy(4.0, 4.0),
            Vertex::xy(0.0, 4.0),
            Vertex::xy(0.0, 0.0),
        ]);
        // clockwise: hole
        let hole = Path::line(vec![
            Vertex::xy(1.0, 1.0),
            Vertex::xy(1.0, 2.0),
            Vertex::xy(2.0, 2.0),
            Vertex::xy(2.0, 1.0),
            Vertex::xy(1.0, 1.0),
        ]);

        let polygon = Geometry::polygon(vec![outer, hole]);
        assert_eq!(polygon.area(), 15.0);
        assert_eq!(polygon.exterior_ring_count(), 1);
        assert_eq!(polygon.interior_ring_count(), 1);
    }

    #[test]
    fn segment_kind_counts() {
        let mut path = Path::line(vec![
            Vertex::xy(0.0, 0.0),
            Vertex::xy(1.0, 0.0),
            Vertex::xy(2.0, 0.0),
            Vertex::xy(3.0, 0.0),
        ]);
        path.kinds = vec![
            SegmentKind::Linear,
            SegmentKind::CircularArc,
            SegmentKind::Bezier,
        ];

        let line = Geometry::polyline(vec![path]);
        let counts = line.segment_counts();
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.linear, 1);
        assert_eq!(counts.non_linear(), 2);
    }

    #[test]
    fn sliver_ratio_of_square_is_sixteen() {
        assert_eq!(unit_square().sliver_ratio(), Some(16.0));
        assert_eq!(Geometry::point(1.0, 2.0).sliver_ratio(), None);
    }

    #[test]
    fn awareness_flags_derive_from_vertex_payloads() {
        let plain = Geometry::point(0.0, 0.0);
        assert!(!plain.z_aware);
        assert!(!plain.m_aware);
        assert!(!plain.point_id_aware);

        let loaded = Geometry::multipoint(vec![
            Vertex::xy(0.0, 0.0).with_z(5.0),
            Vertex::xy(1.0, 0.0).with_m(2.0).with_id(4),
        ]);
        assert!(loaded.z_aware);
        assert!(loaded.m_aware);
        assert!(loaded.point_id_aware);
    }

    #[test]
    fn m_awareness_and_undefined_count() {
        let line = Geometry::polyline(vec![Path::line(vec![
            Vertex::xy(0.0, 0.0).with_m(1.0),
            Vertex::xy(1.0, 0.0),
        ])]);

        assert!(line.m_aware);
        assert_eq!(line.undefined_m_count(), 1);
        assert_eq!(line.m_range(), Some((1.0, 1.0)));

        let unaware = Geometry::polyline(vec![Path::line(vec![
            Vertex::xy(0.0, 0.0),
            Vertex::xy(1.0, 0.0),
        ])]);
        assert_eq!(unaware.undefined_m_count(), 2);
        assert_eq!(unaware.m_range(), None);
    }

    #[test]
    fn point_id_stats_ignore_zero_ids_in_count() {
        let multipoint = Geometry::multipoint(vec![
            Vertex::xy(0.0, 0.0).with_id(3),
            Vertex::xy(1.0, 0.0),
            Vertex::xy(2.0, 0.0).with_id(7),
        ]);

        assert!(multipoint.point_id_aware);
        assert_eq!(multipoint.point_id_stats(), (0, 7, 2));
    }
}
