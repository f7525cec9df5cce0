//! Expression evaluation against named bindings.
//!
//! Invalid comparisons (null involved, incompatible kinds, unresolved
//! names) evaluate to `false` rather than failing: unresolvable names are
//! rejected earlier, at configuration time, and data-driven nulls must
//! not abort a run.

use crate::{
    expr::ast::{CompareOp, Expr, Operand},
    value::{TextMode, Value},
};
use std::cmp::Ordering;

///
/// Bindings
///
/// Resolver for variable names during evaluation: row fields, derived
/// geometry properties, or named filter results.
///

pub trait Bindings {
    /// `None` when the name does not resolve.
    fn value(&self, name: &str) -> Option<Value>;

    fn text_mode(&self) -> TextMode {
        TextMode::Ci
    }
}

impl Expr {
    /// Evaluate the expression against `bindings`.
    #[must_use]
    pub fn matches(&self, bindings: &dyn Bindings) -> bool {
        match self {
            Self::And(a, b) => a.matches(bindings) && b.matches(bindings),
            Self::Or(a, b) => a.matches(bindings) || b.matches(bindings),
            Self::Not(inner) => !inner.matches(bindings),
            Self::Compare { left, op, right } => {
                compare(left, *op, right, bindings).unwrap_or(false)
            }
            Self::IsNull { operand, negated } => {
                let is_null = resolve(operand, bindings).is_none_or(|v| v.is_null());
                is_null != *negated
            }
            Self::In {
                operand,
                list,
                negated,
            } => {
                let contained = resolve(operand, bindings).is_some_and(|value| {
                    list.iter()
                        .any(|item| value.equals(item, bindings.text_mode()) == Some(true))
                });
                contained != *negated
            }
            Self::Var(name) => bindings
                .value(name)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }
}

fn resolve(operand: &Operand, bindings: &dyn Bindings) -> Option<Value> {
    match operand {
        Operand::Var(name) => bindings.value(name),
        Operand::Value(value) => Some(value.clone()),
    }
}

fn compare(
    left: &Operand,
    op: CompareOp,
    right: &Operand,
    bindings: &dyn Bindings,
) -> Option<bool> {
    let left = resolve(left, bindings)?;
    let right = resolve(right, bindings)?;
    let ordering = left.compare(&right, bindings.text_mode())?;

    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}

#[cfg(test)]
mod tests {
    use super::Bindings;
    use crate::{
        expr::parse::parse,
        value::{TextMode, Value},
    };
    use std::collections::HashMap;

    struct MapBindings {
        values: HashMap<String, Value>,
        mode: TextMode,
    }

    impl MapBindings {
        fn new(entries: &[(&str, Value)]) -> Self {
            Self {
                values: entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
                mode: TextMode::Ci,
            }
        }
    }

    impl Bindings for MapBindings {
        fn value(&self, name: &str) -> Option<Value> {
            self.values.get(name).cloned()
        }

        fn text_mode(&self) -> TextMode {
            self.mode
        }
    }

    fn eval(expression: &str, bindings: &MapBindings) -> bool {
        parse(expression)
            .unwrap()
            .is_none_or(|expr| expr.matches(bindings))
    }

    #[test]
    fn area_and_vertex_threshold() {
        let passing = MapBindings::new(&[
            ("$Area", Value::Float(150.0)),
            ("$VertexCount", Value::Int(4)),
        ]);
        let failing = MapBindings::new(&[
            ("$Area", Value::Float(50.0)),
            ("$VertexCount", Value::Int(4)),
        ]);

        let expression = "$Area > 100 AND $VertexCount > 3";
        assert!(eval(expression, &passing));
        assert!(!eval(expression, &failing));
    }

    #[test]
    fn null_comparison_evaluates_false() {
        let bindings = MapBindings::new(&[("width", Value::Null)]);

        assert!(!eval("width > 0", &bindings));
        assert!(!eval("width = 0", &bindings));
        assert!(eval("width IS NULL", &bindings));
        assert!(!eval("width IS NOT NULL", &bindings));
    }

    #[test]
    fn in_list_membership() {
        let bindings = MapBindings::new(&[("level", Value::Int(2))]);

        assert!(eval("level IN (1, 2, 3)", &bindings));
        assert!(!eval("level NOT IN (1, 2, 3)", &bindings));
        assert!(!eval("level IN (4, 5)", &bindings));
    }

    #[test]
    fn bare_variable_reads_boolean_binding() {
        let bindings = MapBindings::new(&[("f1", Value::Bool(true)), ("f2", Value::Bool(false))]);

        assert!(eval("f1", &bindings));
        assert!(eval("f1 OR f2", &bindings));
        assert!(!eval("f1 AND f2", &bindings));
        assert!(eval("f1 AND NOT f2", &bindings));
    }

    #[test]
    fn blank_expression_is_vacuously_true() {
        let bindings = MapBindings::new(&[]);
        assert!(eval("", &bindings));
    }

    #[test]
    fn unresolved_name_compares_false() {
        let bindings = MapBindings::new(&[]);
        assert!(!eval("ghost = 1", &bindings));
        assert!(eval("ghost IS NULL", &bindings));
    }
}
