//! Runtime coercion of untyped values (query strings, XML attributes) into typed values.
//!
//! Two modes share one rule set: [`coerce_strict`] reports failures as [`CoerceError`],
//! [`coerce_lenient`] swallows them and hands back the caller's fallback. Nullable
//! targets are spelled `Option<T>`.

use crate::error::CoerceError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An untyped input value. Most values arrive as `Text`; the other variants let callers
/// hand over already-typed data, which is returned unchanged when it matches the target.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(NaiveTime),
    Uuid(Uuid),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Runtime type name used in conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Text(_) => "text",
            RawValue::Bool(_) => "bool",
            RawValue::Int(_) => "i64",
            RawValue::Float(_) => "f64",
            RawValue::Decimal(_) => "decimal",
            RawValue::DateTime(_) => "datetime",
            RawValue::DateTimeOffset(_) => "datetimeoffset",
            RawValue::Time(_) => "time",
            RawValue::Uuid(_) => "uuid",
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Int(n) => write!(f, "{}", n),
            RawValue::Float(n) => write!(f, "{}", n),
            RawValue::Decimal(d) => write!(f, "{}", d),
            RawValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            RawValue::DateTimeOffset(dt) => f.write_str(&dt.to_rfc3339()),
            RawValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            RawValue::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Int(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Int(n.into())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Float(n)
    }
}

impl From<BigDecimal> for RawValue {
    fn from(d: BigDecimal) -> Self {
        RawValue::Decimal(d)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(dt: NaiveDateTime) -> Self {
        RawValue::DateTime(dt)
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        RawValue::DateTimeOffset(dt)
    }
}

impl From<NaiveTime> for RawValue {
    fn from(t: NaiveTime) -> Self {
        RawValue::Time(t)
    }
}

impl From<Uuid> for RawValue {
    fn from(u: Uuid) -> Self {
        RawValue::Uuid(u)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// A coercion target. One implementation per target type; `Option<T>` is the nullable form.
pub trait Coercible: Sized {
    const TYPE_NAME: &'static str;
    const NULLABLE: bool = false;

    /// Value produced for absent input, if the target admits one.
    fn empty() -> Option<Self> {
        None
    }

    /// Returns the input unchanged when its runtime type already is the target type.
    fn direct(value: &RawValue) -> Option<Self>;

    /// Registry conversion from the input's runtime type, falling back to its string form.
    fn convert(value: &RawValue) -> Result<Self, CoerceError>;
}

/// Converts `input` to `T`, failing on null for non-nullable targets and on any
/// conversion failure.
pub fn coerce_strict<T: Coercible>(input: impl Into<RawValue>) -> Result<T, CoerceError> {
    match evaluate::<T>(&input.into()) {
        Outcome::Value(v) => Ok(v),
        Outcome::Empty => T::empty().ok_or(CoerceError::NullInput { target: T::TYPE_NAME }),
        Outcome::Failed(e) => Err(e),
    }
}

/// Converts `input` to `T`, returning `fallback` on null input or any failure.
pub fn coerce_lenient<T: Coercible>(input: impl Into<RawValue>, fallback: T) -> T {
    coerce_lenient_ref(&input.into(), fallback)
}

/// Borrowing form of [`coerce_lenient`].
pub fn coerce_lenient_ref<T: Coercible>(input: &RawValue, fallback: T) -> T {
    match evaluate::<T>(input) {
        Outcome::Value(v) => v,
        Outcome::Empty | Outcome::Failed(_) => fallback,
    }
}

enum Outcome<T> {
    Value(T),
    /// Absent input, or empty text for a nullable target.
    Empty,
    Failed(CoerceError),
}

fn evaluate<T: Coercible>(input: &RawValue) -> Outcome<T> {
    if input.is_null() {
        return Outcome::Empty;
    }
    if let Some(v) = T::direct(input) {
        return Outcome::Value(v);
    }
    if T::NULLABLE && input.to_string().is_empty() {
        return Outcome::Empty;
    }
    match T::convert(input) {
        Ok(v) => Outcome::Value(v),
        Err(e) => Outcome::Failed(e),
    }
}

impl<U: Coercible> Coercible for Option<U> {
    const TYPE_NAME: &'static str = U::TYPE_NAME;
    const NULLABLE: bool = true;

    fn empty() -> Option<Self> {
        Some(None)
    }

    fn direct(value: &RawValue) -> Option<Self> {
        U::direct(value).map(Some)
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        U::convert(value).map(Some)
    }
}

/// Float and decimal sources never convert into integer targets, whatever the value.
fn narrowing_guard(value: &RawValue, target: &'static str) -> Result<(), CoerceError> {
    match value {
        RawValue::Float(_) | RawValue::Decimal(_) => {
            Err(CoerceError::conversion(value.type_name(), value, target))
        }
        _ => Ok(()),
    }
}

fn parse_text<T: FromStr>(value: &RawValue, target: &'static str) -> Result<T, CoerceError> {
    value
        .to_string()
        .trim()
        .parse::<T>()
        .map_err(|_| CoerceError::conversion(value.type_name(), value, target))
}

macro_rules! impl_integer {
    ($ty:ty, $name:literal) => {
        impl Coercible for $ty {
            const TYPE_NAME: &'static str = $name;

            fn direct(value: &RawValue) -> Option<Self> {
                match value {
                    RawValue::Int(n) => <$ty>::try_from(*n).ok(),
                    _ => None,
                }
            }

            fn convert(value: &RawValue) -> Result<Self, CoerceError> {
                narrowing_guard(value, $name)?;
                match value {
                    RawValue::Int(n) => <$ty>::try_from(*n)
                        .map_err(|_| CoerceError::conversion(value.type_name(), value, $name)),
                    _ => parse_text(value, $name),
                }
            }
        }
    };
}

impl_integer!(i64, "i64");
impl_integer!(i32, "i32");
impl_integer!(i16, "i16");
impl_integer!(u8, "u8");

impl Coercible for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::Int(n) => Ok(*n as f64),
            RawValue::Text(_) | RawValue::Decimal(_) => parse_text(value, Self::TYPE_NAME),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn direct(_value: &RawValue) -> Option<Self> {
        None
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::Int(n) => Ok(*n as f32),
            RawValue::Float(n) => Ok(*n as f32),
            RawValue::Text(_) | RawValue::Decimal(_) => parse_text(value, Self::TYPE_NAME),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for bool {
    const TYPE_NAME: &'static str = "bool";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        let text = value.to_string();
        let text = text.trim();
        if text == "1" {
            return Ok(true);
        }
        if text == "0" {
            return Ok(false);
        }
        if text.eq_ignore_ascii_case("true") {
            return Ok(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Ok(false);
        }
        Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME))
    }
}

impl Coercible for String {
    const TYPE_NAME: &'static str = "text";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        Ok(value.to_string())
    }
}

impl Coercible for BigDecimal {
    const TYPE_NAME: &'static str = "decimal";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Decimal(d) => Some(d.clone()),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::Int(n) => Ok(BigDecimal::from(*n)),
            RawValue::Float(_) | RawValue::Text(_) => parse_text(value, Self::TYPE_NAME),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for NaiveDateTime {
    const TYPE_NAME: &'static str = "datetime";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::DateTimeOffset(dt) => Ok(dt.naive_utc()),
            RawValue::Text(s) => parse_naive_datetime(s)
                .ok_or_else(|| CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for DateTime<FixedOffset> {
    const TYPE_NAME: &'static str = "datetimeoffset";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::DateTimeOffset(dt) => Some(*dt),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::DateTime(dt) => Ok(dt.and_utc().fixed_offset()),
            RawValue::Text(s) => parse_datetime_offset(s)
                .ok_or_else(|| CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for NaiveTime {
    const TYPE_NAME: &'static str = "time";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::Text(s) => parse_time(s)
                .ok_or_else(|| CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

impl Coercible for Uuid {
    const TYPE_NAME: &'static str = "uuid";

    fn direct(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    fn convert(value: &RawValue) -> Result<Self, CoerceError> {
        match value {
            RawValue::Text(s) => Uuid::parse_str(s.trim())
                .map_err(|_| CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
            _ => Err(CoerceError::conversion(value.type_name(), value, Self::TYPE_NAME)),
        }
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying text is normalized to UTC.
fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Text without an offset is taken as UTC.
fn parse_datetime_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z").ok())
        .or_else(|| parse_naive_datetime(s).map(|dt| dt.and_utc().fixed_offset()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
}
