//! Topological predicates over [`Geometry`] values.
//!
//! Envelope tests reject the cheap cases; the detailed tests work on
//! straight segments (non-linear segments are treated by their chords,
//! consistent with [`Path::length`]).

use crate::geometry::{Geometry, Path, Shape, Vertex};

/// Whether two geometries share no point.
#[must_use]
pub fn disjoint(a: &Geometry, b: &Geometry) -> bool {
    let (Some(env_a), Some(env_b)) = (a.envelope(), b.envelope()) else {
        // empty geometries are disjoint from everything
        return true;
    };

    if !env_a.intersects(&env_b) {
        return true;
    }

    !intersects_detailed(a, b)
}

/// Whether two geometries share at least one point.
#[must_use]
pub fn intersects(a: &Geometry, b: &Geometry) -> bool {
    !disjoint(a, b)
}

/// Point-in-polygon via even-odd ray casting. Points on the boundary
/// count as inside.
#[must_use]
pub fn polygon_contains_point(rings: &[Path], x: f64, y: f64) -> bool {
    let mut inside = false;

    for ring in rings {
        let n = ring.vertices.len();
        if n < 3 {
            continue;
        }

        for i in 0..n {
            let a = &ring.vertices[i];
            let b = &ring.vertices[(i + 1) % n];

            if on_segment(a, b, x, y) {
                return true;
            }

            if (a.y > y) != (b.y > y) {
                let x_cross = (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x;
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
    }

    inside
}

fn intersects_detailed(a: &Geometry, b: &Geometry) -> bool {
    // order so the "larger" dimension is first
    let (hi, lo) = if dimension_rank(a) >= dimension_rank(b) {
        (a, b)
    } else {
        (b, a)
    };

    match (&hi.shape, &lo.shape) {
        (Shape::Polygon(rings), Shape::Point(v)) => polygon_contains_point(rings, v.x, v.y),
        (Shape::Polygon(rings), Shape::Multipoint(vertices)) => vertices
            .iter()
            .any(|v| polygon_contains_point(rings, v.x, v.y)),
        (Shape::Polygon(rings), Shape::Polyline(paths)) => {
            paths_cross(hi.paths(), paths)
                || paths
                    .iter()
                    .filter_map(|p| p.vertices.first())
                    .any(|v| polygon_contains_point(rings, v.x, v.y))
        }
        (Shape::Polygon(rings_a), Shape::Polygon(rings_b)) => {
            paths_cross(rings_a, rings_b)
                || rings_b
                    .iter()
                    .filter_map(|r| r.vertices.first())
                    .any(|v| polygon_contains_point(rings_a, v.x, v.y))
                || rings_a
                    .iter()
                    .filter_map(|r| r.vertices.first())
                    .any(|v| polygon_contains_point(rings_b, v.x, v.y))
        }
        (Shape::Polyline(paths), Shape::Point(v)) => point_on_paths(paths, v),
        (Shape::Polyline(paths), Shape::Multipoint(vertices)) => {
            vertices.iter().any(|v| point_on_paths(paths, v))
        }
        (Shape::Polyline(paths_a), Shape::Polyline(paths_b)) => paths_cross(paths_a, paths_b),
        (Shape::Point(a), Shape::Point(b)) => a.x == b.x && a.y == b.y,
        (Shape::Multipoint(points), Shape::Point(v)) => {
            points.iter().any(|p| p.x == v.x && p.y == v.y)
        }
        (Shape::Multipoint(points_a), Shape::Multipoint(points_b)) => points_a
            .iter()
            .any(|a| points_b.iter().any(|b| a.x == b.x && a.y == b.y)),
        // remaining combinations are covered by the dimension ordering
        _ => false,
    }
}

const fn dimension_rank(geometry: &Geometry) -> u8 {
    match geometry.shape {
        Shape::Point(_) | Shape::Multipoint(_) => 0,
        Shape::Polyline(_) => 1,
        Shape::Polygon(_) => 2,
    }
}

fn point_on_paths(paths: &[Path], v: &Vertex) -> bool {
    paths.iter().any(|path| {
        path.vertices
            .windows(2)
            .any(|pair| on_segment(&pair[0], &pair[1], v.x, v.y))
    })
}

fn paths_cross(paths_a: &[Path], paths_b: &[Path]) -> bool {
    for path_a in paths_a {
        for seg_a in path_a.vertices.windows(2) {
            for path_b in paths_b {
                for seg_b in path_b.vertices.windows(2) {
                    if segments_intersect(&seg_a[0], &seg_a[1], &seg_b[0], &seg_b[1]) {
                        return true;
                    }
                }
            }
        }
    }

    false
}

fn on_segment(a: &Vertex, b: &Vertex, x: f64, y: f64) -> bool {
    let cross = (b.x - a.x).mul_add(y - a.y, -((b.y - a.y) * (x - a.x)));
    if cross.abs() > f64::EPSILON * (1.0 + b.x.abs() + b.y.abs() + a.x.abs() + a.y.abs()) {
        return false;
    }

    x >= a.x.min(b.x) && x <= a.x.max(b.x) && y >= a.y.min(b.y) && y <= a.y.max(b.y)
}

fn segments_intersect(p1: &Vertex, p2: &Vertex, q1: &Vertex, q2: &Vertex) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1.x, p1.y))
        || (d2 == 0.0 && on_segment(q1, q2, p2.x, p2.y))
        || (d3 == 0.0 && on_segment(p1, p2, q1.x, q1.y))
        || (d4 == 0.0 && on_segment(p1, p2, q2.x, q2.y))
}

fn orientation(a: &Vertex, b: &Vertex, c: &Vertex) -> f64 {
    (b.x - a.x).mul_add(c.y - a.y, -((b.y - a.y) * (c.x - a.x)))
}
