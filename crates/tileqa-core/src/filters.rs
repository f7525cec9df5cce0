use crate::{
    error::ExprError,
    expr::{Bindings, Expr, parse},
    result::QaError,
    tables::{TableHandle, TableRow},
    value::{TextMode, Value},
};
use std::{collections::HashMap, fmt};

///
/// RowFilter
///
/// Pre-execution admission control: "should this row even be tested".
/// Filters declare the tables they read so the scheduler can wire the
/// tile cache to them.
///

pub trait RowFilter {
    fn name(&self) -> &str;

    fn admits(&self, table: &TableHandle, row: &TableRow) -> bool;

    fn involved_tables(&self) -> Vec<TableHandle> {
        Vec::new()
    }
}

///
/// IssueFilter
///
/// Post-result admission control: "should this finding be kept".
///

pub trait IssueFilter {
    fn name(&self) -> &str;

    fn keeps(&self, issue: &QaError) -> bool;
}

///
/// FilterSet
///
/// A named, ordered set of filters with an optional combining
/// expression over the filter names.
///
/// Without an expression the members combine with OR: one admitting
/// filter admits. With an expression, only the expression decides.
///

pub struct FilterSet<F: ?Sized> {
    filters: Vec<Box<F>>,
    expression: Option<Expr>,
}

pub type RowFilterSet = FilterSet<dyn RowFilter>;
pub type IssueFilterSet = FilterSet<dyn IssueFilter>;

impl<F: ?Sized> FilterSet<F> {
    fn compile(
        filters: Vec<Box<F>>,
        expression: &str,
        names: &[String],
    ) -> Result<Self, ExprError> {
        let expression = parse(expression)?;

        if let Some(expr) = &expression {
            for name in expr.referenced_names() {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                    return Err(ExprError::UnknownFilter { name });
                }
            }
        }

        Ok(Self {
            filters,
            expression,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    fn combine(&self, results: &HashMap<String, bool>) -> bool {
        match &self.expression {
            Some(expr) => expr.matches(&FilterBindings { results }),
            None => results.values().any(|admitted| *admitted),
        }
    }
}

impl<F: ?Sized> fmt::Debug for FilterSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("filters", &self.filters.len())
            .field("expression", &self.expression)
            .finish()
    }
}

impl RowFilterSet {
    pub fn new(filters: Vec<Box<dyn RowFilter>>, expression: &str) -> Result<Self, ExprError> {
        let names: Vec<String> = filters.iter().map(|f| f.name().to_string()).collect();
        Self::compile(filters, expression, &names)
    }

    #[must_use]
    pub fn admits(&self, table: &TableHandle, row: &TableRow) -> bool {
        let results: HashMap<String, bool> = self
            .filters
            .iter()
            .map(|f| (f.name().to_lowercase(), f.admits(table, row)))
            .collect();

        self.combine(&results)
    }

    /// Tables any member filter reads, for tile-cache routing.
    #[must_use]
    pub fn involved_tables(&self) -> Vec<TableHandle> {
        self.filters
            .iter()
            .flat_map(|f| f.involved_tables())
            .collect()
    }
}

impl IssueFilterSet {
    pub fn new(filters: Vec<Box<dyn IssueFilter>>, expression: &str) -> Result<Self, ExprError> {
        let names: Vec<String> = filters.iter().map(|f| f.name().to_string()).collect();
        Self::compile(filters, expression, &names)
    }

    #[must_use]
    pub fn keeps(&self, issue: &QaError) -> bool {
        let results: HashMap<String, bool> = self
            .filters
            .iter()
            .map(|f| (f.name().to_lowercase(), f.keeps(issue)))
            .collect();

        self.combine(&results)
    }
}

struct FilterBindings<'a> {
    results: &'a HashMap<String, bool>,
}

impl Bindings for FilterBindings<'_> {
    fn value(&self, name: &str) -> Option<Value> {
        self.results
            .get(&name.to_lowercase())
            .map(|b| Value::Bool(*b))
    }

    fn text_mode(&self) -> TextMode {
        TextMode::Ci
    }
}

#[cfg(test)]
mod tests {
    use super::{IssueFilter, IssueFilterSet, RowFilter, RowFilterSet};
    use crate::{
        error::ExprError,
        result::QaError,
        tables::{MemoryTable, TableHandle, TableRow},
        value::Value,
    };
    use std::rc::Rc;

    struct ValueAbove {
        name: String,
        field: usize,
        threshold: f64,
    }

    impl RowFilter for ValueAbove {
        fn name(&self) -> &str {
            &self.name
        }

        fn admits(&self, _table: &TableHandle, row: &TableRow) -> bool {
            row.values
                .get(self.field)
                .and_then(Value::as_f64)
                .is_some_and(|v| v > self.threshold)
        }
    }

    struct DescriptionContains {
        name: String,
        needle: String,
    }

    impl IssueFilter for DescriptionContains {
        fn name(&self) -> &str {
            &self.name
        }

        fn keeps(&self, issue: &QaError) -> bool {
            issue.description.contains(&self.needle)
        }
    }

    fn handle() -> TableHandle {
        Rc::new(MemoryTable::new("t", vec!["v".to_string()]))
    }

    fn above(name: &str, threshold: f64) -> Box<dyn RowFilter> {
        Box::new(ValueAbove {
            name: name.to_string(),
            field: 0,
            threshold,
        })
    }

    fn row(v: f64) -> TableRow {
        TableRow::new(1, vec![Value::Float(v)])
    }

    #[test]
    fn default_combination_is_or() {
        let set = RowFilterSet::new(vec![above("f1", 10.0), above("f2", 100.0)], "").unwrap();
        let table = handle();

        assert!(set.admits(&table, &row(50.0))); // f1 admits
        assert!(set.admits(&table, &row(200.0))); // both admit
        assert!(!set.admits(&table, &row(5.0))); // neither admits
    }

    #[test]
    fn expression_overrides_default_or() {
        let set =
            RowFilterSet::new(vec![above("f1", 10.0), above("f2", 100.0)], "f1 AND f2").unwrap();
        let table = handle();

        assert!(!set.admits(&table, &row(50.0)));
        assert!(set.admits(&table, &row(200.0)));
    }

    #[test]
    fn expression_must_reference_known_filters() {
        let err = RowFilterSet::new(vec![above("f1", 1.0)], "f1 AND ghost").unwrap_err();
        assert_eq!(
            err,
            ExprError::UnknownFilter {
                name: "ghost".to_string()
            }
        );

        // names match case-insensitively
        assert!(RowFilterSet::new(vec![above("f1", 1.0)], "F1").is_ok());
    }

    #[test]
    fn issue_filters_gate_findings() {
        let set = IssueFilterSet::new(
            vec![Box::new(DescriptionContains {
                name: "gap".to_string(),
                needle: "gap".to_string(),
            })],
            "",
        )
        .unwrap();

        let keep = QaError::new("check", "gap found", vec![]);
        let drop = QaError::new("check", "overlap found", vec![]);

        assert!(set.keeps(&keep));
        assert!(!set.keeps(&drop));
    }
}
