use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use sheet_ingest::{
    ArrayItem, ConversionWarning, ConvertedValue, DeclaredType, IngestError, RawValue,
    TypeConverter,
};

fn convert(declared_type: &str, raw: impl Into<RawValue>) -> ConvertedValue {
    TypeConverter::default()
        .convert_str(declared_type, &raw.into())
        .expect("declared type recognised")
        .into_value()
}

fn warning_for(declared_type: &str, raw: impl Into<RawValue>) -> ConversionWarning {
    TypeConverter::default()
        .convert_str(declared_type, &raw.into())
        .expect("declared type recognised")
        .warning
        .expect("warning emitted")
}

fn timestamp(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .expect("valid timestamp")
}

fn decimal(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).expect("decimal")
}

fn text(value: &str) -> ConvertedValue {
    ConvertedValue::String(value.to_string())
}

struct NotAString;

impl fmt::Display for NotAString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("string representation")
    }
}

#[test]
fn unspecified_type_keeps_integers_and_stringifies_everything_else() {
    assert_eq!(convert("", "somestring"), text("somestring"));
    assert_eq!(convert("", 3i64), ConvertedValue::Integer(3));
    assert_eq!(convert("", 1.5f64), text("1.5"));
    assert_eq!(convert("", RawValue::custom(NotAString)), text("string representation"));
}

#[test]
fn string_type_stringifies() {
    assert_eq!(convert("string", 3i64), text("3"));
    assert_eq!(convert("string", RawValue::custom(NotAString)), text("string representation"));
    assert_eq!(convert("string", "plain"), text("plain"));
}

#[test]
fn number_type_parses_exact_decimals() {
    let expected = |value: &str| ConvertedValue::Decimal(decimal(value));

    assert_eq!(convert("number", "3"), expected("3"));
    assert_eq!(convert("number", "1.2"), expected("1.2"));
    assert_eq!(convert("number", " 0.1 "), expected("0.1"));
    assert_eq!(convert("number", 7i64), expected("7"));
    assert_eq!(convert("number", 2.5f64), expected("2.5"));
}

#[test]
fn number_type_has_no_precision_limit() {
    let wide = "123456789012345678901234567890";
    let conversion = TypeConverter::default()
        .convert_str("number", &RawValue::from(wide))
        .expect("declared type recognised");
    assert_eq!(conversion.warning, None);
    assert_eq!(conversion.value, ConvertedValue::Decimal(decimal(wide)));

    let conversion = TypeConverter::default()
        .convert_str("number", &RawValue::from("1e30"))
        .expect("declared type recognised");
    assert_eq!(conversion.warning, None);
    assert_eq!(
        conversion.value,
        ConvertedValue::Decimal(decimal("1000000000000000000000000000000"))
    );

    let fine = "0.1234567890123456789012345678901";
    let value = convert("number", fine);
    assert_eq!(value, ConvertedValue::Decimal(decimal(fine)));
    assert_ne!(value, ConvertedValue::Decimal(decimal("0.1234567890123456789012345679")));
}

#[test]
fn number_and_integer_agree_on_booleans() {
    assert_eq!(convert("number", true), ConvertedValue::Decimal(decimal("1")));
    assert_eq!(convert("number", false), ConvertedValue::Decimal(decimal("0")));
    assert_eq!(convert("integer", true), ConvertedValue::Integer(1));
    assert_eq!(convert("integer", false), ConvertedValue::Integer(0));
}

#[test]
fn integers_wider_than_i64_keep_every_digit() {
    let conversion = TypeConverter::default()
        .convert_str("integer", &RawValue::from("99999999999999999999"))
        .expect("declared type recognised");
    assert_eq!(conversion.warning, None);
    assert_eq!(
        conversion.value,
        ConvertedValue::Decimal(decimal("99999999999999999999"))
    );
    assert_eq!(
        conversion.value.to_json().expect("json rendered").to_string(),
        "99999999999999999999"
    );

    assert_eq!(convert("integer", "-12"), ConvertedValue::Integer(-12));
    assert_eq!(convert("integer", "1.5"), ConvertedValue::Null);
    assert_eq!(convert("integer", "-"), ConvertedValue::Null);
}

#[test]
fn integer_type_parses_and_passes_through() {
    assert_eq!(convert("integer", "3"), ConvertedValue::Integer(3));
    assert_eq!(convert("integer", 3i64), ConvertedValue::Integer(3));
    assert_eq!(convert("integer", 4.0f64), ConvertedValue::Integer(4));
}

#[test]
fn boolean_type_recognises_common_spellings() {
    for raw in [RawValue::from("TRUE"), "True".into(), 1i64.into(), "1".into(), true.into()] {
        assert_eq!(
            convert("boolean", raw.clone()),
            ConvertedValue::Boolean(true),
            "{raw:?}"
        );
    }
    for raw in [RawValue::from("FALSE"), "False".into(), 0i64.into(), "0".into(), false.into()] {
        assert_eq!(
            convert("boolean", raw.clone()),
            ConvertedValue::Boolean(false),
            "{raw:?}"
        );
    }
}

#[test]
fn unrecognised_boolean_falls_back_to_false_with_warning() {
    let conversion = TypeConverter::default()
        .convert(DeclaredType::Boolean, &RawValue::Integer(2));
    assert_eq!(conversion.value, ConvertedValue::Boolean(false));
    let warning = conversion.warning.expect("warning emitted");
    assert!(warning.to_string().contains("Unrecognised value for boolean: \"2\""));

    let warning = warning_for("boolean", "test");
    assert!(warning.to_string().contains("Unrecognised value for boolean: \"test\""));
}

#[test]
fn non_integer_value_is_null_with_warning() {
    assert_eq!(convert("integer", "test"), ConvertedValue::Null);
    let warning = warning_for("integer", "test");
    assert_eq!(warning, ConversionWarning::NonInteger("test".into()));
    assert!(warning.to_string().contains("Non-integer value \"test\""));

    assert!(warning_for("integer", 2.5f64).to_string().contains("Non-integer value \"2.5\""));
}

#[test]
fn non_numeric_value_is_null_with_warning() {
    assert_eq!(convert("number", "test"), ConvertedValue::Null);
    let warning = warning_for("number", "test");
    assert!(warning.to_string().contains("Non-numeric value \"test\""));
}

#[test]
fn blank_cells_are_null_for_every_type() {
    for declared_type in ["", "string", "number", "integer", "array", "boolean"] {
        assert_eq!(convert(declared_type, ""), ConvertedValue::Null, "{declared_type}");
        assert_eq!(convert(declared_type, RawValue::Empty), ConvertedValue::Null, "{declared_type}");
    }
}

#[test]
fn valid_values_produce_no_warning() {
    let converter = TypeConverter::default();
    for (declared_type, raw) in [
        ("number", RawValue::from("1.2")),
        ("integer", RawValue::from("3")),
        ("boolean", RawValue::from("true")),
        ("array", RawValue::from("a;b")),
        ("string", RawValue::from("x")),
    ] {
        let conversion = converter.convert_str(declared_type, &raw).expect("recognised");
        assert_eq!(conversion.warning, None, "{declared_type}");
    }
}

#[test]
fn array_type_splits_on_semicolons_then_commas() {
    assert_eq!(
        convert("array", "one"),
        ConvertedValue::Array(vec!["one".into()])
    );
    assert_eq!(
        convert("array", "one;two"),
        ConvertedValue::Array(vec!["one".into(), "two".into()])
    );
    assert_eq!(
        convert("array", "one,two;three,four"),
        ConvertedValue::Array(vec![vec!["one", "two"].into(), vec!["three", "four"].into()])
    );
}

#[test]
fn array_elements_are_comma_split_independently() {
    assert_eq!(
        convert("array", "one;two,three"),
        ConvertedValue::Array(vec![
            ArrayItem::Text("one".into()),
            ArrayItem::List(vec!["two".into(), "three".into()]),
        ])
    );
}

#[test]
fn unknown_type_is_a_configuration_error() {
    let error = TypeConverter::default()
        .convert_str("notatype", &RawValue::from("test"))
        .expect_err("unknown type rejected");
    assert!(matches!(error, IngestError::UnrecognisedType(ref name) if name == "notatype"));
    assert!(error.to_string().contains("Unrecognised type: \"notatype\""));
}

#[test]
fn timestamps_render_in_utc_by_default() {
    let converter = TypeConverter::default();
    for declared in [DeclaredType::String, DeclaredType::Unspecified] {
        let render = |ts| converter.convert(declared, &RawValue::Timestamp(ts)).into_value();
        assert_eq!(render(timestamp(2015, 1, 1, 0, 0, 0)), text("2015-01-01T00:00:00+00:00"));
        assert_eq!(render(timestamp(2015, 1, 1, 13, 37, 59)), text("2015-01-01T13:37:59+00:00"));
    }
}

#[test]
fn timestamps_use_the_offset_in_effect_on_their_date() {
    let converter = TypeConverter::with_timezone_name("Europe/London").expect("known timezone");
    for declared in [DeclaredType::String, DeclaredType::Unspecified] {
        let render = |ts| converter.convert(declared, &RawValue::Timestamp(ts)).into_value();
        assert_eq!(render(timestamp(2015, 1, 1, 0, 0, 0)), text("2015-01-01T00:00:00+00:00"));
        assert_eq!(render(timestamp(2015, 1, 1, 13, 37, 59)), text("2015-01-01T13:37:59+00:00"));
        assert_eq!(render(timestamp(2015, 6, 1, 0, 0, 0)), text("2015-06-01T00:00:00+01:00"));
        assert_eq!(render(timestamp(2015, 6, 1, 13, 37, 59)), text("2015-06-01T13:37:59+01:00"));
    }
}

#[test]
fn timestamps_at_clock_changes_prefer_standard_time() {
    let converter = TypeConverter::with_timezone_name("Europe/London").expect("known timezone");
    // 01:30 happens twice when clocks go back.
    assert_eq!(
        converter.format_timestamp(&timestamp(2015, 10, 25, 1, 30, 0)),
        "2015-10-25T01:30:00+00:00"
    );
    // 01:30 never happens when clocks go forward.
    assert_eq!(
        converter.format_timestamp(&timestamp(2015, 3, 29, 1, 30, 0)),
        "2015-03-29T01:30:00+00:00"
    );
}

#[test]
fn timestamps_at_the_edges_of_the_calendar_do_not_panic() {
    let utc = TypeConverter::default();
    let rendered = utc.format_timestamp(&NaiveDateTime::MAX);
    assert!(rendered.ends_with("+00:00"), "{rendered}");

    // Tokyo is ahead of UTC, so the earliest wall-clock time has no UTC instant.
    let tokyo = TypeConverter::with_timezone_name("Asia/Tokyo").expect("known timezone");
    let rendered = tokyo.format_timestamp(&NaiveDateTime::MIN);
    assert!(!rendered.is_empty());

    let new_york = TypeConverter::with_timezone_name("America/New_York").expect("known timezone");
    let rendered = new_york.format_timestamp(&NaiveDateTime::MAX);
    assert!(!rendered.is_empty());
}

#[test]
fn unknown_timezone_is_rejected() {
    let error = TypeConverter::with_timezone_name("Mars/Olympus").expect_err("unknown timezone");
    assert!(matches!(error, IngestError::UnknownTimezone(_)));
}

#[test]
fn repeated_conversions_are_identical() {
    let converter = TypeConverter::with_timezone_name("Europe/London").expect("known timezone");
    let raw = RawValue::from("maybe");
    let first = converter.convert(DeclaredType::Boolean, &raw);
    let second = converter.convert(DeclaredType::Boolean, &raw);
    assert_eq!(first, second);
    assert!(first.warning.is_some());
}

#[test]
fn decimals_keep_every_digit_in_json() {
    let value = convert("number", "0.10000000000000000001");
    let json = value.to_json().expect("json rendered");
    assert_eq!(json.to_string(), "0.10000000000000000001");

    let array = convert("array", "a;b,c").to_json().expect("json rendered");
    assert_eq!(array, serde_json::json!(["a", ["b", "c"]]));
}
