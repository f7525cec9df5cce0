use crate::{
    error::ExprError,
    expr::{Bindings, Expr, parse},
    tables::{RowSource, TableRow},
    value::{TextMode, Value},
};
use std::fmt;
use tileqa_geom::{Geometry, GeometryMetrics, MetricSelection};

///
/// TableConstraint
///
/// Compiled attribute constraint for one table occurrence. Variable
/// names resolve to row fields or, for `$`-prefixed names, to derived
/// geometry properties; only the properties the expression text actually
/// references are registered.
///

pub struct TableConstraint {
    expression: String,
    expr: Option<Expr>,
    metrics: MetricSelection,
    text_mode: TextMode,
}

impl TableConstraint {
    /// Compile `expression` against `source`. Names that resolve neither
    /// to a field nor to a derived property are configuration errors.
    pub fn new(
        expression: &str,
        text_mode: TextMode,
        source: &dyn RowSource,
    ) -> Result<Self, ExprError> {
        let expr = parse(expression)?;
        let metrics = MetricSelection::for_expression(expression);

        if let Some(expr) = &expr {
            for name in expr.referenced_names() {
                let known = if name.starts_with('$') {
                    metrics.get(&name).is_some()
                } else {
                    source.find_field(&name).is_some()
                };
                if !known {
                    return Err(ExprError::UnknownName { name });
                }
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            expr,
            metrics,
            text_mode,
        })
    }

    /// Unconstrained: every row matches.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self {
            expression: String::new(),
            expr: None,
            metrics: MetricSelection::for_expression(""),
            text_mode: TextMode::Ci,
        }
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub const fn text_mode(&self) -> TextMode {
        self.text_mode
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Whether `row` fulfills the constraint. An absent expression is
    /// vacuously true.
    #[must_use]
    pub fn matches(&self, source: &dyn RowSource, row: &TableRow) -> bool {
        let Some(expr) = &self.expr else {
            return true;
        };

        let bindings = ConstraintBindings {
            source,
            row,
            metrics: GeometryMetrics::new(row.shape.as_ref()),
            selection: &self.metrics,
            text_mode: self.text_mode,
        };

        expr.matches(&bindings)
    }

    /// `name=value; …` summary of the referenced derived properties, for
    /// diagnostics on a reported finding.
    #[must_use]
    pub fn format_values(&self, geometry: Option<&Geometry>) -> String {
        self.metrics.format_values(geometry)
    }
}

impl fmt::Debug for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConstraint")
            .field("expression", &self.expression)
            .field("text_mode", &self.text_mode)
            .finish_non_exhaustive()
    }
}

struct ConstraintBindings<'a> {
    source: &'a dyn RowSource,
    row: &'a TableRow,
    metrics: GeometryMetrics<'a>,
    selection: &'a MetricSelection,
    text_mode: TextMode,
}

impl Bindings for ConstraintBindings<'_> {
    fn value(&self, name: &str) -> Option<Value> {
        if name.starts_with('$') {
            return self
                .selection
                .get(name)
                .map(|property| property.value(&self.metrics).into());
        }

        self.source
            .find_field(name)
            .and_then(|index| self.row.values.get(index).cloned())
    }

    fn text_mode(&self) -> TextMode {
        self.text_mode
    }
}
