use crate::{
    expr::{Bindings, Expr},
    involved::Involved,
    tables::row::{ObjectId, RowRef, TableRow},
    value::{TextMode, Value},
};
use std::rc::Rc;
use tileqa_geom::Envelope;

///
/// TableFilter
///
/// Bounded/filtered row enumeration request: an optional spatial extent
/// and an optional attribute predicate.
///

#[derive(Clone, Debug, Default)]
pub struct TableFilter {
    pub extent: Option<Envelope>,
    pub predicate: Option<Expr>,
    pub text_mode: TextMode,
}

impl TableFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn extent(extent: Envelope) -> Self {
        Self {
            extent: Some(extent),
            ..Self::default()
        }
    }

    /// Whether `row` (described by its `source`) passes both parts of
    /// the filter.
    #[must_use]
    pub fn accepts(&self, source: &dyn RowSource, row: &TableRow) -> bool {
        if let Some(extent) = &self.extent {
            // rows without geometry are never excluded spatially
            if let Some(env) = row.envelope() {
                if !extent.intersects(&env) {
                    return false;
                }
            }
        }

        self.predicate.as_ref().is_none_or(|predicate| {
            predicate.matches(&RowBindings {
                source,
                row,
                text_mode: self.text_mode,
            })
        })
    }
}

///
/// RowSource
///
/// The capability surface the engine consumes from a table: field
/// lookup, row lookup, filtered enumeration, and extent. Virtual tables
/// additionally expose the rows a given row was derived from and the
/// tables they themselves read.
///

pub trait RowSource {
    fn name(&self) -> &str;

    fn fields(&self) -> &[String];

    fn find_field(&self, name: &str) -> Option<usize> {
        self.fields()
            .iter()
            .position(|f| f.eq_ignore_ascii_case(name))
    }

    fn row_by_id(&self, object_id: ObjectId) -> Option<RowRef>;

    fn enum_rows(&self, filter: &TableFilter) -> Vec<RowRef>;

    fn row_count(&self, filter: &TableFilter) -> usize {
        self.enum_rows(filter).len()
    }

    /// Spatial extent of all rows; `None` for non-spatial tables.
    fn extent(&self) -> Option<Envelope>;

    /// For virtual tables: the provenance of one of their rows. `None`
    /// means the table is not virtual (rows stand for themselves).
    fn involved_rows(&self, _row: &TableRow) -> Option<Vec<Involved>> {
        None
    }

    /// Tables this table reads when materializing rows. Non-empty only
    /// for virtual/transform tables; the scheduler wires the tile cache
    /// to these recursively.
    fn dependent_tables(&self) -> Vec<TableHandle> {
        Vec::new()
    }
}

/// Shared handle to a row source. Table identity is the allocation.
pub type TableHandle = Rc<dyn RowSource>;

///
/// TableKey
///
/// Hashable identity of a [`TableHandle`] for per-table dictionaries.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TableKey(usize);

#[must_use]
pub fn table_key(table: &TableHandle) -> TableKey {
    TableKey(Rc::as_ptr(table).cast::<()>() as usize)
}

#[must_use]
pub fn same_table(a: &TableHandle, b: &TableHandle) -> bool {
    Rc::ptr_eq(a, b)
}

/// Build the provenance node for a row of `source`: virtual tables and
/// rows with embedded base rows become nested nodes, everything else a
/// leaf.
#[must_use]
pub fn involved_for_row(source: &dyn RowSource, row: &TableRow) -> Involved {
    if let Some(children) = source.involved_rows(row) {
        return Involved::nested(source.name(), children);
    }

    if !row.base_rows.is_empty() {
        return Involved::nested(source.name(), row.base_rows.clone());
    }

    Involved::row(source.name(), row.object_id)
}

///
/// RowBindings
///
/// Field-name resolution for predicate evaluation over one row.
///

pub struct RowBindings<'a> {
    pub source: &'a dyn RowSource,
    pub row: &'a TableRow,
    pub text_mode: TextMode,
}

impl Bindings for RowBindings<'_> {
    fn value(&self, name: &str) -> Option<Value> {
        self.source
            .find_field(name)
            .and_then(|index| self.row.values.get(index).cloned())
    }

    fn text_mode(&self) -> TextMode {
        self.text_mode
    }
}
