//! `rust_decimal::Decimal` <-> SQLite `REAL` columns

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Type};

/// Money and carton values as stored in the database.
///
/// Written as a double; read back through SQLite's text rendering of the
/// stored value, so integers, reals and numeric text all decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SqlDecimal(pub Decimal);

impl From<Decimal> for SqlDecimal {
    fn from(value: Decimal) -> Self {
        SqlDecimal(value)
    }
}

impl From<SqlDecimal> for Decimal {
    fn from(value: SqlDecimal) -> Self {
        value.0
    }
}

impl Type<Sqlite> for SqlDecimal {
    fn type_info() -> SqliteTypeInfo {
        <f64 as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <f64 as Type<Sqlite>>::compatible(ty)
            || <i64 as Type<Sqlite>>::compatible(ty)
            || <&str as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for SqlDecimal {
    fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
        buf.push(SqliteArgumentValue::Double(self.0.to_f64().unwrap_or_default()));
        IsNull::No
    }
}

impl<'r> Decode<'r, Sqlite> for SqlDecimal {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<Sqlite>>::decode(value)?;
        parse_decimal(text).map(SqlDecimal)
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, BoxDynError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    match Decimal::from_str(text) {
        Ok(value) => Ok(value.normalize()),
        Err(_) => Ok(Decimal::from_scientific(text)?.normalize()),
    }
}
