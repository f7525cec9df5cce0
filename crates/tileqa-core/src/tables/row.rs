use crate::{involved::Involved, value::Value};
use std::rc::Rc;
use tileqa_geom::{Envelope, Geometry};

/// Native row identity within one table.
pub type ObjectId = i64;

///
/// TableRow
///
/// One row handed to checks: native id, attribute values parallel to the
/// table's field list, optional geometry, and — for synthetic rows built
/// from other rows — their embedded provenance.
///

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub object_id: ObjectId,
    pub values: Vec<Value>,
    pub shape: Option<Geometry>,
    /// Constituent rows for rows synthesized by a transform; empty for
    /// plain rows.
    pub base_rows: Vec<Involved>,
}

impl TableRow {
    #[must_use]
    pub fn new(object_id: ObjectId, values: Vec<Value>) -> Self {
        Self {
            object_id,
            values,
            shape: None,
            base_rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: Geometry) -> Self {
        self.shape = Some(shape);
        self
    }

    #[must_use]
    pub fn with_base_rows(mut self, base_rows: Vec<Involved>) -> Self {
        self.base_rows = base_rows;
        self
    }

    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        self.shape.as_ref().and_then(Geometry::envelope)
    }
}

/// Rows are shared between the tile cache and the checks; identity of a
/// cached row is the allocation, not the value.
pub type RowRef = Rc<TableRow>;
