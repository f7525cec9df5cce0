use crate::value::Value;
use derive_more::Display;
use std::{
    collections::BTreeSet,
    ops::{BitAnd, BitOr, Not},
};

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum CompareOp {
    #[display("=")]
    Eq,
    #[display("<>")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
}

///
/// Operand
///
/// One side of a comparison: a named variable (field, derived property,
/// or filter result) or a literal.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Var(String),
    Value(Value),
}

impl Operand {
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }
}

///
/// Expr
///
/// Boolean expression over named variables. The empty expression has no
/// representation here; callers model it as `Option<Expr>` and treat
/// `None` as vacuously true.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
    In {
        operand: Operand,
        list: Vec<Value>,
        negated: bool,
    },
    /// Bare reference to a boolean-valued variable (a named filter).
    Var(String),
}

impl Expr {
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    #[must_use]
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self::Compare { left, op, right }
    }

    /// All variable names the expression references, sorted and deduplicated.
    #[must_use]
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_names(names);
                b.collect_names(names);
            }
            Self::Not(inner) => inner.collect_names(names),
            Self::Compare { left, right, .. } => {
                collect_operand(left, names);
                collect_operand(right, names);
            }
            Self::IsNull { operand, .. } | Self::In { operand, .. } => {
                collect_operand(operand, names);
            }
            Self::Var(name) => {
                names.insert(name.clone());
            }
        }
    }
}

fn collect_operand(operand: &Operand, names: &mut BTreeSet<String>) {
    if let Operand::Var(name) = operand {
        names.insert(name.clone());
    }
}

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}
