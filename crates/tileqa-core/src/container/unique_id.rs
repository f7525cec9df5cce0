use crate::tables::RowRef;
use std::{collections::HashMap, rc::Rc};

///
/// UniqueIdProvider
///
/// Stable surrogate ids for rows of tables without native identity
/// (synthetic/transform rows). The id is keyed by the shared row
/// allocation, and the provider holds a reference to each mapped row so
/// its address cannot be recycled while the mapping is alive. Asking
/// twice for the same cached row yields the same id and provenance
/// stays duplicate-safe across tiles.
///

#[derive(Default)]
pub struct UniqueIdProvider {
    assigned: HashMap<usize, (i64, RowRef)>,
    next: i64,
}

impl UniqueIdProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_id(&mut self, row: &RowRef) -> i64 {
        let key = Rc::as_ptr(row) as usize;
        if let Some((id, _)) = self.assigned.get(&key) {
            return *id;
        }

        self.next += 1;
        self.assigned.insert(key, (self.next, Rc::clone(row)));
        self.next
    }

    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}
