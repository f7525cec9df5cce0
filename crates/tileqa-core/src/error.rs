use crate::involved::ENTIRE_TABLE;
use thiserror::Error as ThisError;

///
/// ExprError
///
/// Configuration-time failures: a constraint or filter expression that
/// cannot be tokenized, parsed, or resolved against its table. Not
/// recoverable at run time; surfaced when the check is configured.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unterminated text literal starting at position {position}")]
    UnterminatedText { position: usize },

    #[error("unterminated quoted name starting at position {position}")]
    UnterminatedName { position: usize },

    #[error("invalid number literal '{literal}'")]
    InvalidNumber { literal: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{found}'{}", expected_suffix(expected.as_deref()))]
    UnexpectedToken {
        found: String,
        expected: Option<String>,
    },

    #[error("unknown name '{name}': not a field or derived property")]
    UnknownName { name: String },

    #[error("unknown filter '{name}' referenced by combining expression")]
    UnknownFilter { name: String },
}

fn expected_suffix(expected: Option<&str>) -> String {
    expected.map_or_else(String::new, |e| format!(", expected {e}"))
}

///
/// DataError
///
/// A run-time data access failure carrying the reference to the offending
/// table and row. Callers may quarantine the failing check and continue,
/// or propagate.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{}", self.describe())]
pub struct DataError {
    pub table: String,
    pub object_id: i64,
    pub message: String,
}

impl DataError {
    #[must_use]
    pub fn new(table: impl Into<String>, object_id: i64, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            object_id,
            message: message.into(),
        }
    }

    /// Failure not attributable to a specific row.
    #[must_use]
    pub fn table(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(table, ENTIRE_TABLE, message)
    }

    fn describe(&self) -> String {
        if self.object_id == ENTIRE_TABLE {
            format!("data error in table '{}': {}", self.table, self.message)
        } else {
            format!(
                "data error in table '{}', row {}: {}",
                self.table, self.object_id, self.message
            )
        }
    }
}

///
/// ContainerError
///
/// Engine-level error union surfaced by the scheduler and the execution
/// entry points.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ContainerError {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("issue geometry was reduced to its envelope and is no longer available")]
    GeometryReduced,

    #[error("check '{check}' depends on a surface and must run through the tiled scheduler")]
    SurfaceRequiresTiling { check: String },

    #[error("no extent available: no explicit extent was given and no involved table has one")]
    NoExtent,
}
