use crate::{
    constraint::TableConstraint,
    filters::{IssueFilterSet, RowFilterSet},
    tables::TableHandle,
};

///
/// TableProps
///
/// Per-occurrence configuration of one involved table. A table may be
/// involved more than once in the same check; each occurrence carries
/// its own constraint and filters. Set at configuration time, immutable
/// during a run.
///

pub struct TableProps {
    pub table: TableHandle,
    pub constraint: TableConstraint,
    /// Searched by the check but never itself executed row by row.
    pub queried_only: bool,
    pub row_filters: Option<RowFilterSet>,
    pub issue_filters: Option<IssueFilterSet>,
}

impl TableProps {
    #[must_use]
    pub fn new(table: TableHandle, constraint: TableConstraint) -> Self {
        Self {
            table,
            constraint,
            queried_only: false,
            row_filters: None,
            issue_filters: None,
        }
    }
}
