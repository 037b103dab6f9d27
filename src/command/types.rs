//! Compiled command descriptor types and the declared-type → coercion-target table.

use crate::coerce::{coerce_lenient_ref, RawValue};
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use uuid::Uuid;

/// Effective timeout when a descriptor omits one or declares a non-positive value.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;

/// Leading character conventionally prefixed to parameter names (`@id`).
pub const PARAMETER_MARKER: char = '@';

/// Comparison key for parameter names: leading markers stripped, case folded.
pub fn parameter_key(name: &str) -> String {
    name.trim_start_matches(PARAMETER_MARKER).to_lowercase()
}

/// Descriptor-level SQL type tokens. Tokens outside this set are rejected at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    BigInt,
    Int,
    SmallInt,
    TinyInt,
    Bit,
    Char,
    NChar,
    VarChar,
    NVarChar,
    Text,
    NText,
    Xml,
    Date,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Time,
    Decimal,
    Money,
    SmallMoney,
    Float,
    Real,
    UniqueIdentifier,
}

impl DeclaredType {
    const TOKENS: &'static [(&'static str, DeclaredType)] = &[
        ("bigint", DeclaredType::BigInt),
        ("int", DeclaredType::Int),
        ("smallint", DeclaredType::SmallInt),
        ("tinyint", DeclaredType::TinyInt),
        ("bit", DeclaredType::Bit),
        ("char", DeclaredType::Char),
        ("nchar", DeclaredType::NChar),
        ("varchar", DeclaredType::VarChar),
        ("nvarchar", DeclaredType::NVarChar),
        ("text", DeclaredType::Text),
        ("ntext", DeclaredType::NText),
        ("xml", DeclaredType::Xml),
        ("date", DeclaredType::Date),
        ("datetime", DeclaredType::DateTime),
        ("datetime2", DeclaredType::DateTime2),
        ("smalldatetime", DeclaredType::SmallDateTime),
        ("datetimeoffset", DeclaredType::DateTimeOffset),
        ("time", DeclaredType::Time),
        ("decimal", DeclaredType::Decimal),
        ("money", DeclaredType::Money),
        ("smallmoney", DeclaredType::SmallMoney),
        ("float", DeclaredType::Float),
        ("real", DeclaredType::Real),
        ("uniqueidentifier", DeclaredType::UniqueIdentifier),
    ];

    /// Case-insensitive token lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::TOKENS
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(token))
            .map(|(_, ty)| *ty)
    }

    pub fn target(&self) -> CoercionTarget {
        match self {
            DeclaredType::BigInt => CoercionTarget::BigInt,
            DeclaredType::Int => CoercionTarget::Int,
            DeclaredType::SmallInt => CoercionTarget::SmallInt,
            DeclaredType::TinyInt => CoercionTarget::TinyInt,
            DeclaredType::Bit => CoercionTarget::Bool,
            DeclaredType::Char
            | DeclaredType::NChar
            | DeclaredType::VarChar
            | DeclaredType::NVarChar
            | DeclaredType::Text
            | DeclaredType::NText
            | DeclaredType::Xml => CoercionTarget::Text,
            DeclaredType::Date
            | DeclaredType::DateTime
            | DeclaredType::DateTime2
            | DeclaredType::SmallDateTime => CoercionTarget::DateTime,
            DeclaredType::DateTimeOffset => CoercionTarget::DateTimeOffset,
            DeclaredType::Time => CoercionTarget::Time,
            DeclaredType::Decimal | DeclaredType::Money | DeclaredType::SmallMoney => {
                CoercionTarget::Decimal
            }
            DeclaredType::Float => CoercionTarget::Float,
            DeclaredType::Real => CoercionTarget::Real,
            DeclaredType::UniqueIdentifier => CoercionTarget::Uuid,
        }
    }
}

/// The closed set of typed values a parameter can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoercionTarget {
    BigInt,
    Int,
    SmallInt,
    TinyInt,
    Bool,
    Text,
    DateTime,
    DateTimeOffset,
    Time,
    Decimal,
    Float,
    Real,
    Uuid,
}

macro_rules! lenient {
    ($raw:expr, $prior:expr, $variant:ident, $ty:ty) => {{
        let fallback = match $prior {
            Some(SqlValue::$variant(v)) => Some(v.clone()),
            _ => None,
        };
        coerce_lenient_ref::<Option<$ty>>($raw, fallback).map(SqlValue::$variant)
    }};
}

impl CoercionTarget {
    /// Lenient coercion into this target. `prior` is kept when `raw` cannot be converted.
    pub fn coerce(&self, raw: &RawValue, prior: Option<&SqlValue>) -> Option<SqlValue> {
        match self {
            CoercionTarget::BigInt => lenient!(raw, prior, BigInt, i64),
            CoercionTarget::Int => lenient!(raw, prior, Int, i32),
            CoercionTarget::SmallInt => lenient!(raw, prior, SmallInt, i16),
            CoercionTarget::TinyInt => lenient!(raw, prior, TinyInt, u8),
            CoercionTarget::Bool => lenient!(raw, prior, Bit, bool),
            CoercionTarget::Text => lenient!(raw, prior, Text, String),
            CoercionTarget::DateTime => lenient!(raw, prior, DateTime, NaiveDateTime),
            CoercionTarget::DateTimeOffset => {
                lenient!(raw, prior, DateTimeOffset, DateTime<FixedOffset>)
            }
            CoercionTarget::Time => lenient!(raw, prior, Time, NaiveTime),
            CoercionTarget::Decimal => lenient!(raw, prior, Decimal, BigDecimal),
            CoercionTarget::Float => lenient!(raw, prior, Float, f64),
            CoercionTarget::Real => lenient!(raw, prior, Real, f32),
            CoercionTarget::Uuid => lenient!(raw, prior, Uuid, Uuid),
        }
    }
}

/// A typed parameter value, one variant per [`CoercionTarget`].
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    BigInt(i64),
    Int(i32),
    SmallInt(i16),
    TinyInt(u8),
    Bit(bool),
    Text(String),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(NaiveTime),
    Decimal(BigDecimal),
    Float(f64),
    Real(f32),
    Uuid(Uuid),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Direction::Input),
            "output" => Some(Direction::Output),
            "inputoutput" => Some(Direction::InputOutput),
            "returnvalue" => Some(Direction::ReturnValue),
            _ => None,
        }
    }

    /// Whether a value travels to the database for this parameter.
    pub fn is_bound(&self) -> bool {
        matches!(self, Direction::Input | Direction::InputOutput)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommandKind {
    #[default]
    Text,
    StoredProcedure,
    TableDirect,
}

impl CommandKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "text" => Some(CommandKind::Text),
            "storedprocedure" => Some(CommandKind::StoredProcedure),
            "tabledirect" => Some(CommandKind::TableDirect),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub declared_type: DeclaredType,
    pub direction: Direction,
    pub is_nullable: bool,
    pub size: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// From the descriptor's `value` attribute, already coerced.
    pub default_value: Option<SqlValue>,
}

impl ParameterDescriptor {
    pub fn key(&self) -> String {
        parameter_key(&self.name)
    }

    pub fn target(&self) -> CoercionTarget {
        self.declared_type.target()
    }

    /// Value a fresh binding starts from.
    pub fn initial_value(&self) -> BoundValue {
        match (&self.default_value, self.is_nullable) {
            (Some(v), _) => BoundValue::Value(v.clone()),
            (None, true) => BoundValue::Null,
            (None, false) => BoundValue::Unset,
        }
    }
}

/// A compiled command. Immutable; shared across requests behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandDescriptor {
    pub timeout_seconds: u32,
    pub kind: CommandKind,
    pub text: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl CommandDescriptor {
    /// Index of the parameter whose name matches `name` (markers and case ignored).
    pub fn position(&self, name: &str) -> Option<usize> {
        let key = parameter_key(name);
        self.parameters.iter().position(|p| p.key() == key)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundValue {
    /// Non-nullable parameter nobody supplied a value for.
    Unset,
    Null,
    Value(SqlValue),
}

impl BoundValue {
    pub fn as_value(&self) -> Option<&SqlValue> {
        match self {
            BoundValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Per-request binding of a shared descriptor: one value per declared parameter, in order.
#[derive(Clone, Debug)]
pub struct BoundCommand {
    pub descriptor: Arc<CommandDescriptor>,
    pub values: Vec<BoundValue>,
}

impl BoundCommand {
    pub fn value(&self, name: &str) -> Option<&BoundValue> {
        self.descriptor
            .position(name)
            .and_then(|i| self.values.get(i))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&ParameterDescriptor, &BoundValue)> {
        self.descriptor.parameters.iter().zip(self.values.iter())
    }
}
