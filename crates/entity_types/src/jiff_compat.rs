use sea_orm::{
    ColumnType, DbErr, TryFromU64, TryGetable, Value,
    sea_query::{ArrayType, Nullable, ValueType, ValueTypeErr},
};

/// Storage type for a [`jiff::Timestamp`] which will store the timestamp as a
/// BIGINTEGER representing milliseconds since the UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JiffTimestampMilliseconds(pub jiff::Timestamp);

impl From<JiffTimestampMilliseconds> for Value {
    fn from(JiffTimestampMilliseconds(timestamp): JiffTimestampMilliseconds) -> Self {
        Value::BigInt(Some(timestamp.as_millisecond()))
    }
}

impl Nullable for JiffTimestampMilliseconds {
    fn null() -> Value {
        Value::BigInt(None)
    }
}

impl ValueType for JiffTimestampMilliseconds {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::BigInt(Some(x)) => jiff::Timestamp::from_millisecond(x)
                .map_err(|_e| ValueTypeErr)
                .map(JiffTimestampMilliseconds),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "JiffTimestampMilliseconds".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::BigInt
    }

    fn column_type() -> ColumnType {
        ColumnType::BigInteger
    }
}

impl TryGetable for JiffTimestampMilliseconds {
    fn try_get_by<I: sea_orm::ColIdx>(
        res: &sea_orm::QueryResult,
        index: I,
    ) -> Result<Self, sea_orm::TryGetError> {
        i64::try_get_by(res, index).and_then(|int| {
            jiff::Timestamp::from_millisecond(int)
                .map_err(|e| {
                    sea_orm::TryGetError::DbErr(sea_orm::DbErr::TryIntoErr {
                        from: "i64",
                        into: "jiff::Timestamp",
                        source: Box::new(e),
                    })
                })
                .map(JiffTimestampMilliseconds)
        })
    }
}

// Serialized as the inner jiff value (RFC 3339), not as epoch milliseconds.
impl serde::Serialize for JiffTimestampMilliseconds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for JiffTimestampMilliseconds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        jiff::Timestamp::deserialize(deserializer).map(JiffTimestampMilliseconds)
    }
}

/// Storage type for a [`jiff::civil::Date`] which will store the date as TEXT
/// in ISO-8601 form (`2026-08-01`), keeping lexicographic and calendar order
/// in agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JiffCivilDate(pub jiff::civil::Date);

impl From<JiffCivilDate> for Value {
    fn from(JiffCivilDate(date): JiffCivilDate) -> Self {
        Value::String(Some(Box::new(date.to_string())))
    }
}

impl Nullable for JiffCivilDate {
    fn null() -> Value {
        Value::String(None)
    }
}

impl ValueType for JiffCivilDate {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(text)) => text
                .parse::<jiff::civil::Date>()
                .map_err(|_e| ValueTypeErr)
                .map(JiffCivilDate),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "JiffCivilDate".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl TryGetable for JiffCivilDate {
    fn try_get_by<I: sea_orm::ColIdx>(
        res: &sea_orm::QueryResult,
        index: I,
    ) -> Result<Self, sea_orm::TryGetError> {
        String::try_get_by(res, index).and_then(|text| {
            text.parse::<jiff::civil::Date>()
                .map_err(|e| {
                    sea_orm::TryGetError::DbErr(sea_orm::DbErr::TryIntoErr {
                        from: "String",
                        into: "jiff::civil::Date",
                        source: Box::new(e),
                    })
                })
                .map(JiffCivilDate)
        })
    }
}

impl serde::Serialize for JiffCivilDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for JiffCivilDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        jiff::civil::Date::deserialize(deserializer).map(JiffCivilDate)
    }
}

impl TryFromU64 for JiffCivilDate {
    fn try_from_u64(_: u64) -> Result<Self, DbErr> {
        Err(DbErr::ConvertFromU64("JiffCivilDate"))
    }
}
