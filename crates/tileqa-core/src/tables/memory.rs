use crate::tables::{
    row::{ObjectId, RowRef, TableRow},
    source::{RowSource, TableFilter},
};
use std::rc::Rc;
use tileqa_geom::Envelope;

///
/// MemoryTable
///
/// In-memory row source: the concrete adapter used by tests and by hosts
/// that already hold their rows. Rows keep insertion order.
///

pub struct MemoryTable {
    name: String,
    fields: Vec<String>,
    rows: Vec<RowRef>,
}

impl MemoryTable {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: TableRow) -> RowRef {
        let row = Rc::new(row);
        self.rows.push(Rc::clone(&row));
        row
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn row_by_id(&self, object_id: ObjectId) -> Option<RowRef> {
        self.rows
            .iter()
            .find(|r| r.object_id == object_id)
            .map(Rc::clone)
    }

    fn enum_rows(&self, filter: &TableFilter) -> Vec<RowRef> {
        self.rows
            .iter()
            .filter(|row| filter.accepts(self, row))
            .map(Rc::clone)
            .collect()
    }

    fn extent(&self) -> Option<Envelope> {
        let mut extent: Option<Envelope> = None;
        for row in &self.rows {
            if let Some(env) = row.envelope() {
                extent = Some(match extent {
                    Some(acc) => acc.union(&env),
                    None => env,
                });
            }
        }
        extent
    }
}
