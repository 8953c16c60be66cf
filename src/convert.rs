use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::model::{ArrayItem, ConvertedValue, DeclaredType, RawValue};

/// Data-quality problem found while converting a single cell.
///
/// Warnings never stop a conversion pass; the converter substitutes a
/// fallback value and reports the offending input here.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConversionWarning {
    #[error("Non-numeric value \"{0}\" found in number column, returning null")]
    NonNumeric(String),
    #[error("Non-integer value \"{0}\" found in integer column, returning null")]
    NonInteger(String),
    #[error("Unrecognised value for boolean: \"{0}\", returning false")]
    UnrecognisedBoolean(String),
}

/// Result of converting one cell: the value plus at most one warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub value: ConvertedValue,
    pub warning: Option<ConversionWarning>,
}

impl Conversion {
    fn clean(value: ConvertedValue) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    fn fallback(value: ConvertedValue, warning: ConversionWarning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    /// Discards the warning and returns the converted value.
    pub fn into_value(self) -> ConvertedValue {
        self.value
    }
}

/// Coerces raw cells into typed values according to a declared column type.
///
/// The only configuration is the timezone used to render timestamps; it is
/// fixed at construction so repeated calls with the same arguments always
/// produce the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeConverter {
    timezone: Tz,
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TypeConverter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Builds a converter from an IANA timezone name such as `Europe/London`.
    pub fn with_timezone_name(name: &str) -> Result<Self> {
        let timezone =
            Tz::from_str(name).map_err(|_| IngestError::UnknownTimezone(name.to_string()))?;
        Ok(Self::new(timezone))
    }

    /// Converts a cell using a type hint given as configuration text.
    ///
    /// Fails with [`IngestError::UnrecognisedType`] when the hint is not one
    /// of the known types; that is a configuration mistake, not bad data.
    pub fn convert_str(&self, declared_type: &str, raw: &RawValue) -> Result<Conversion> {
        let declared = DeclaredType::from_str(declared_type)?;
        Ok(self.convert(declared, raw))
    }

    /// Converts a cell. Blank cells are null whatever the declared type.
    pub fn convert(&self, declared: DeclaredType, raw: &RawValue) -> Conversion {
        if raw.is_blank() {
            return Conversion::clean(ConvertedValue::Null);
        }

        let conversion = match declared {
            DeclaredType::Unspecified => match raw {
                RawValue::Integer(value) => Conversion::clean(ConvertedValue::Integer(*value)),
                other => Conversion::clean(ConvertedValue::String(self.text(other))),
            },
            DeclaredType::String => Conversion::clean(ConvertedValue::String(self.text(raw))),
            DeclaredType::Number => to_number(raw),
            DeclaredType::Integer => to_integer(raw),
            DeclaredType::Boolean => to_boolean(raw),
            DeclaredType::Array => {
                Conversion::clean(ConvertedValue::Array(split_array(&self.text(raw))))
            }
        };

        if let Some(warning) = &conversion.warning {
            warn!(declared_type = %declared, "{warning}");
        }
        conversion
    }

    /// Renders a wall-clock timestamp with the offset the configured
    /// timezone observes at that moment, e.g. `2015-06-01T00:00:00+01:00`.
    ///
    /// Timestamps whose UTC instant falls outside chrono's range are
    /// rendered without an offset.
    pub fn format_timestamp(&self, timestamp: &NaiveDateTime) -> String {
        let offset = self.resolve_offset(timestamp);
        match offset.from_local_datetime(timestamp).single() {
            Some(localized) => localized.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            None => timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    fn resolve_offset(&self, timestamp: &NaiveDateTime) -> FixedOffset {
        match self.timezone.offset_from_local_datetime(timestamp) {
            LocalResult::Single(offset) => offset.fix(),
            // Repeated hour when clocks go back: prefer standard time.
            LocalResult::Ambiguous(first, second) => {
                let (first, second) = (first.fix(), second.fix());
                if first.local_minus_utc() <= second.local_minus_utc() {
                    first
                } else {
                    second
                }
            }
            // Skipped hour when clocks go forward: keep the pre-transition offset.
            LocalResult::None => {
                let earlier = timestamp
                    .checked_sub_signed(TimeDelta::days(1))
                    .unwrap_or(*timestamp);
                self.timezone.offset_from_utc_datetime(&earlier).fix()
            }
        }
    }

    fn text(&self, raw: &RawValue) -> String {
        match raw {
            RawValue::Timestamp(timestamp) => self.format_timestamp(timestamp),
            other => other.to_string(),
        }
    }
}

fn to_number(raw: &RawValue) -> Conversion {
    let parsed = match raw {
        RawValue::Integer(value) => Some(BigDecimal::from(*value)),
        RawValue::Boolean(value) => Some(BigDecimal::from(i64::from(*value))),
        RawValue::Timestamp(_) => None,
        other => parse_decimal(other.to_string().trim()),
    };

    match parsed {
        Some(value) => Conversion::clean(ConvertedValue::Decimal(value)),
        None => Conversion::fallback(
            ConvertedValue::Null,
            ConversionWarning::NonNumeric(raw.to_string()),
        ),
    }
}

/// Parses plain or exponent notation with no bound on digits or scale.
fn parse_decimal(text: &str) -> Option<BigDecimal> {
    // Words such as `inf` never reach the parser.
    if text.is_empty() || !text.bytes().any(|byte| byte.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(text).ok()
}

fn to_integer(raw: &RawValue) -> Conversion {
    let parsed = match raw {
        RawValue::Integer(value) => Some(ConvertedValue::Integer(*value)),
        RawValue::Boolean(value) => Some(ConvertedValue::Integer(i64::from(*value))),
        RawValue::Float(value) => whole_float(*value).map(ConvertedValue::Integer),
        RawValue::Timestamp(_) => None,
        other => parse_integer(other.to_string().trim()),
    };

    match parsed {
        Some(value) => Conversion::clean(value),
        None => Conversion::fallback(
            ConvertedValue::Null,
            ConversionWarning::NonInteger(raw.to_string()),
        ),
    }
}

/// Parses an optionally signed run of digits. Values wider than `i64` keep
/// every digit as a scale-0 decimal.
fn parse_integer(text: &str) -> Option<ConvertedValue> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(ConvertedValue::Integer(value));
    }
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(text).ok().map(ConvertedValue::Decimal)
}

/// Returns the float as an integer when it has no fractional part and fits.
pub(crate) fn whole_float(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn to_boolean(raw: &RawValue) -> Conversion {
    if let RawValue::Boolean(value) = raw {
        return Conversion::clean(ConvertedValue::Boolean(*value));
    }

    let text = raw.to_string();
    match text.trim().to_lowercase().as_str() {
        "true" | "1" => Conversion::clean(ConvertedValue::Boolean(true)),
        "false" | "0" => Conversion::clean(ConvertedValue::Boolean(false)),
        _ => Conversion::fallback(
            ConvertedValue::Boolean(false),
            ConversionWarning::UnrecognisedBoolean(text),
        ),
    }
}

/// Splits on `;`, then splits each element that contains a `,` on `,`.
fn split_array(text: &str) -> Vec<ArrayItem> {
    text.split(';')
        .map(|element| {
            if element.contains(',') {
                ArrayItem::List(element.split(',').map(str::to_string).collect())
            } else {
                ArrayItem::Text(element.to_string())
            }
        })
        .collect()
}
