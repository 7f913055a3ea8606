use std::fmt;

/// A single cell of a [`Table`](crate::Table).
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl Value {
    /// NaN and infinities count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_finite(),
            Value::Text(_) => false,
            Value::Missing => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Builds a number, mapping NaN and infinities to `Missing`.
    pub fn finite(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Missing
        }
    }

    pub(crate) fn key(&self) -> KeyValue {
        match self {
            Value::Number(n) if !n.is_finite() => KeyValue::Missing,
            // -0.0 and 0.0 are one key
            Value::Number(n) => KeyValue::Number((n + 0.0).to_bits()),
            Value::Text(s) => KeyValue::Text(s.clone()),
            Value::Missing => KeyValue::Missing,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("null"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::finite(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Hashable image of a [`Value`] with exact equality, used for grouping
/// and distinct counting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum KeyValue {
    Number(u64),
    Text(String),
    Missing,
}

/// Classification of a column by the non-missing values it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Mixed,
    /// No rows, or every value is missing.
    Empty,
}

impl ColumnKind {
    pub fn of<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        values
            .into_iter()
            .fold(ColumnKind::Empty, |kind, value| kind.merge(value))
    }

    fn merge(self, value: &Value) -> Self {
        let seen = match value {
            v if v.is_missing() => return self,
            Value::Number(_) => ColumnKind::Numeric,
            _ => ColumnKind::Text,
        };
        match self {
            ColumnKind::Empty => seen,
            kind if kind == seen => kind,
            _ => ColumnKind::Mixed,
        }
    }

    pub fn is_numeric_compatible(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Empty)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Mixed => "mixed",
            ColumnKind::Empty => "empty",
        };
        f.write_str(name)
    }
}
