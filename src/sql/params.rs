//! Typed PostgreSQL bind values for bound command parameters.

use crate::command::{BoundValue, CoercionTarget, SqlValue};
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};
use uuid::Uuid;

/// A value that can be bound to a PostgreSQL query. NULLs keep the declared type so the
/// server can infer placeholder types the same way it would for a non-null value.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null(CoercionTarget),
    Value(SqlValue),
}

impl PgBindValue {
    /// `None` for an unset value; callers decide how to report it.
    pub fn from_bound(target: CoercionTarget, value: &BoundValue) -> Option<Self> {
        match value {
            BoundValue::Unset => None,
            BoundValue::Null => Some(PgBindValue::Null(target)),
            BoundValue::Value(v) => Some(PgBindValue::Value(v.clone())),
        }
    }

    fn target(&self) -> CoercionTarget {
        match self {
            PgBindValue::Null(t) => *t,
            PgBindValue::Value(v) => target_of(v),
        }
    }
}

fn target_of(value: &SqlValue) -> CoercionTarget {
    match value {
        SqlValue::BigInt(_) => CoercionTarget::BigInt,
        SqlValue::Int(_) => CoercionTarget::Int,
        SqlValue::SmallInt(_) => CoercionTarget::SmallInt,
        SqlValue::TinyInt(_) => CoercionTarget::TinyInt,
        SqlValue::Bit(_) => CoercionTarget::Bool,
        SqlValue::Text(_) => CoercionTarget::Text,
        SqlValue::DateTime(_) => CoercionTarget::DateTime,
        SqlValue::DateTimeOffset(_) => CoercionTarget::DateTimeOffset,
        SqlValue::Time(_) => CoercionTarget::Time,
        SqlValue::Decimal(_) => CoercionTarget::Decimal,
        SqlValue::Float(_) => CoercionTarget::Float,
        SqlValue::Real(_) => CoercionTarget::Real,
        SqlValue::Uuid(_) => CoercionTarget::Uuid,
    }
}

/// PostgreSQL type a target binds as. `TinyInt` has no native counterpart and goes as SMALLINT.
pub fn pg_type_info(target: CoercionTarget) -> PgTypeInfo {
    match target {
        CoercionTarget::BigInt => <i64 as Type<Postgres>>::type_info(),
        CoercionTarget::Int => <i32 as Type<Postgres>>::type_info(),
        CoercionTarget::SmallInt | CoercionTarget::TinyInt => <i16 as Type<Postgres>>::type_info(),
        CoercionTarget::Bool => <bool as Type<Postgres>>::type_info(),
        CoercionTarget::Text => <String as Type<Postgres>>::type_info(),
        CoercionTarget::DateTime => <NaiveDateTime as Type<Postgres>>::type_info(),
        CoercionTarget::DateTimeOffset => <DateTime<FixedOffset> as Type<Postgres>>::type_info(),
        CoercionTarget::Time => <NaiveTime as Type<Postgres>>::type_info(),
        CoercionTarget::Decimal => <BigDecimal as Type<Postgres>>::type_info(),
        CoercionTarget::Float => <f64 as Type<Postgres>>::type_info(),
        CoercionTarget::Real => <f32 as Type<Postgres>>::type_info(),
        CoercionTarget::Uuid => <Uuid as Type<Postgres>>::type_info(),
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let value = match self {
            PgBindValue::Null(_) => return Ok(IsNull::Yes),
            PgBindValue::Value(v) => v,
        };
        Ok(match value {
            SqlValue::BigInt(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::Int(n) => <i32 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::SmallInt(n) => <i16 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::TinyInt(n) => <i16 as Encode<Postgres>>::encode_by_ref(&i16::from(*n), buf)?,
            SqlValue::Bit(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            SqlValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            SqlValue::DateTime(d) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(d, buf)?,
            SqlValue::DateTimeOffset(d) => {
                <DateTime<FixedOffset> as Encode<Postgres>>::encode_by_ref(d, buf)?
            }
            SqlValue::Time(t) => <NaiveTime as Encode<Postgres>>::encode_by_ref(t, buf)?,
            SqlValue::Decimal(d) => <BigDecimal as Encode<Postgres>>::encode_by_ref(d, buf)?,
            SqlValue::Float(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::Real(n) => <f32 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlValue::Uuid(u) => <Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(pg_type_info(self.target()))
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_has_no_bind_value() {
        assert_eq!(PgBindValue::from_bound(CoercionTarget::Int, &BoundValue::Unset), None);
    }

    #[test]
    fn nulls_keep_declared_type() {
        let v = PgBindValue::from_bound(CoercionTarget::Uuid, &BoundValue::Null).unwrap();
        assert_eq!(v.produces(), Some(<Uuid as Type<Postgres>>::type_info()));
    }

    #[test]
    fn tiny_int_binds_as_smallint() {
        let v = PgBindValue::Value(SqlValue::TinyInt(200));
        assert_eq!(v.produces(), Some(<i16 as Type<Postgres>>::type_info()));
        let v = PgBindValue::Value(SqlValue::Decimal(BigDecimal::from(5)));
        assert_eq!(v.produces(), Some(<BigDecimal as Type<Postgres>>::type_info()));
    }
}
