use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use tileqa_geom::MetricValue;

///
/// TextMode
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum TextMode {
    Cs, // case-sensitive
    #[default]
    Ci, // case-insensitive
}

///
/// Value
///
/// Scalar attribute value as seen by constraint and filter expressions.
///
/// Null → the field has no value (SQL NULL); any comparison against it
/// is invalid and evaluates false.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view; `Int` widens to `f64`.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Ordering comparison under widening coercion. `None` marks an
    /// invalid comparison (null involved, or incompatible kinds); the
    /// evaluator turns `None` into `false`.
    #[must_use]
    pub fn compare(&self, other: &Self, mode: TextMode) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(match mode {
                TextMode::Cs => a.cmp(b),
                TextMode::Ci => a.to_lowercase().cmp(&b.to_lowercase()),
            }),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Equality under the same coercion rules as [`Self::compare`].
    #[must_use]
    pub fn equals(&self, other: &Self, mode: TextMode) -> Option<bool> {
        self.compare(other, mode).map(|ord| ord == Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "<NULL>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<MetricValue> for Value {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Null => Self::Null,
            MetricValue::Bool(b) => Self::Bool(b),
            MetricValue::Int(i) => Self::Int(i),
            MetricValue::Float(f) => Self::Float(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TextMode, Value};
    use std::cmp::Ordering;

    #[test]
    fn numeric_comparison_widens_int_to_float() {
        assert_eq!(
            Value::Int(3).compare(&Value::Float(3.5), TextMode::Ci),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float(2.0).equals(&Value::Int(2), TextMode::Ci),
            Some(true)
        );
    }

    #[test]
    fn null_comparison_is_invalid() {
        assert_eq!(Value::Null.compare(&Value::Int(1), TextMode::Ci), None);
        assert_eq!(Value::Null.equals(&Value::Null, TextMode::Ci), None);
    }

    #[test]
    fn text_comparison_honors_case_mode() {
        let a = Value::from("Road");
        let b = Value::from("road");

        assert_eq!(a.equals(&b, TextMode::Ci), Some(true));
        assert_eq!(a.equals(&b, TextMode::Cs), Some(false));
    }

    #[test]
    fn text_and_number_are_incomparable() {
        assert_eq!(Value::from("10").compare(&Value::Int(10), TextMode::Ci), None);
    }
}
