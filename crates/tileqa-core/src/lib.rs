//! Tiled quality-verification engine: attribute/geometry predicates, row
//! sources, tile-scoped data caches, provenance, checks, deduplicated
//! findings, and the tile scheduler that drives a run.

pub mod check;
pub mod constraint;
pub mod container;
pub mod error;
pub mod expr;
pub mod filters;
pub mod involved;
pub mod result;
pub mod scheduler;
pub mod tables;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, caches, or scheduler internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        check::{Admission, Check, CheckBase, CheckContext},
        involved::Involved,
        result::QaError,
        tables::{RowSource, TableHandle, TableRow},
        value::Value,
    };
}
