//! Geometry value model for the TileQA engine: envelopes, spatial
//! references, owned geometry shapes, and the lazily computed derived
//! metric properties exposed to attribute constraints.

pub mod envelope;
pub mod geometry;
pub mod metrics;
pub mod relate;
pub mod spatial_reference;

pub use envelope::Envelope;
pub use geometry::{Geometry, Path, SegmentKind, Shape, Vertex};
pub use metrics::{GeometryMetrics, MetricProperty, MetricSelection, MetricValue};
pub use spatial_reference::{CoordinateSystemKind, SpatialReference};
