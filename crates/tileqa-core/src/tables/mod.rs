mod memory;
mod row;
mod source;

pub use memory::MemoryTable;
pub use row::{ObjectId, RowRef, TableRow};
pub use source::{
    RowBindings, RowSource, TableFilter, TableHandle, TableKey, involved_for_row, same_table,
    table_key,
};
