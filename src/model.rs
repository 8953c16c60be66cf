use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::{IngestError, Result};

/// A single spreadsheet cell as decoded by a sheet reader.
#[derive(Clone)]
pub enum RawValue {
    /// Text cell, including every CSV cell.
    String(String),
    /// Whole-number cell.
    Integer(i64),
    /// Numeric cell with a fractional part.
    Float(f64),
    /// Boolean cell.
    Boolean(bool),
    /// Date/time cell. Carries wall-clock time with no attached offset.
    Timestamp(NaiveDateTime),
    /// Blank cell.
    Empty,
    /// Value of a caller-defined type, rendered through its `Display`
    /// implementation wherever text is needed.
    Custom(Arc<dyn fmt::Display + Send + Sync>),
}

impl RawValue {
    /// Wraps a caller-defined value whose textual form comes from `Display`.
    pub fn custom(value: impl fmt::Display + Send + Sync + 'static) -> Self {
        RawValue::Custom(Arc::new(value))
    }

    /// True for blank cells and empty strings.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::String(value) => value.is_empty(),
            _ => false,
        }
    }
}

/// Renders the canonical textual form of the cell.
impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(value) => f.write_str(value),
            RawValue::Integer(value) => write!(f, "{value}"),
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Boolean(value) => write!(f, "{value}"),
            RawValue::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S")),
            RawValue::Empty => Ok(()),
            RawValue::Custom(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(value) => f.debug_tuple("String").field(value).finish(),
            RawValue::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            RawValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
            RawValue::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            RawValue::Timestamp(value) => f.debug_tuple("Timestamp").field(value).finish(),
            RawValue::Empty => f.write_str("Empty"),
            RawValue::Custom(value) => f.debug_tuple("Custom").field(&value.to_string()).finish(),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::String(lhs), RawValue::String(rhs)) => lhs == rhs,
            (RawValue::Integer(lhs), RawValue::Integer(rhs)) => lhs == rhs,
            (RawValue::Float(lhs), RawValue::Float(rhs)) => lhs == rhs,
            (RawValue::Boolean(lhs), RawValue::Boolean(rhs)) => lhs == rhs,
            (RawValue::Timestamp(lhs), RawValue::Timestamp(rhs)) => lhs == rhs,
            (RawValue::Empty, RawValue::Empty) => true,
            (RawValue::Custom(lhs), RawValue::Custom(rhs)) => lhs.to_string() == rhs.to_string(),
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        RawValue::Timestamp(value)
    }
}

/// Column type hint supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeclaredType {
    /// No hint (the empty string).
    #[default]
    Unspecified,
    String,
    Number,
    Integer,
    Boolean,
    Array,
}

impl DeclaredType {
    /// Returns the hint as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Unspecified => "",
            DeclaredType::String => "string",
            DeclaredType::Number => "number",
            DeclaredType::Integer => "integer",
            DeclaredType::Boolean => "boolean",
            DeclaredType::Array => "array",
        }
    }
}

impl FromStr for DeclaredType {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "" => Ok(DeclaredType::Unspecified),
            "string" => Ok(DeclaredType::String),
            "number" => Ok(DeclaredType::Number),
            "integer" => Ok(DeclaredType::Integer),
            "boolean" => Ok(DeclaredType::Boolean),
            "array" => Ok(DeclaredType::Array),
            other => Err(IngestError::UnrecognisedType(other.to_string())),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of an array cell: either a plain string or a comma-split list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayItem {
    Text(String),
    List(Vec<String>),
}

impl ArrayItem {
    fn to_json(&self) -> Value {
        match self {
            ArrayItem::Text(value) => Value::String(value.clone()),
            ArrayItem::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<&str> for ArrayItem {
    fn from(value: &str) -> Self {
        ArrayItem::Text(value.to_string())
    }
}

impl From<Vec<&str>> for ArrayItem {
    fn from(items: Vec<&str>) -> Self {
        ArrayItem::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Typed value produced by the converter.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertedValue {
    String(String),
    /// Integer that fits in an `i64`. Wider integers become [`Decimal`](Self::Decimal).
    Integer(i64),
    /// Unbounded decimal; never routed through floating point.
    Decimal(BigDecimal),
    Boolean(bool),
    Array(Vec<ArrayItem>),
    Null,
}

impl ConvertedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConvertedValue::Null)
    }

    /// Converts the value into JSON. Decimals keep every digit.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            ConvertedValue::String(value) => Value::String(value.clone()),
            ConvertedValue::Integer(value) => Value::from(*value),
            ConvertedValue::Decimal(value) => serde_json::from_str(&value.to_string())?,
            ConvertedValue::Boolean(value) => Value::Bool(*value),
            ConvertedValue::Array(items) => Value::Array(items.iter().map(ArrayItem::to_json).collect()),
            ConvertedValue::Null => Value::Null,
        })
    }
}
