use crate::{Error, Result, TIMESTAMP_FORMAT, Value};
use std::fmt::{self, Display, Formatter};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// Stored representation of a field: a string, or `None` for SQL `NULL`.
pub type Primitive = Option<String>;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const ALTERNATIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 5] = [
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

/// Largest magnitude below which every integral `f64` is an exact integer.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Kind of a declared model field, deciding how values are coerced in and out of storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    String,
    DateTime,
    Json,
}

/// A `(name, kind)` pair declared by a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

impl FieldKind {
    /// Whether `value` collapses to `NULL` when made primitive.
    ///
    /// `Int` treats `""` as empty but not `0`, `String` keeps `""`. `DateTime` and `Json` never
    /// consider their refined values (timestamps, lists and maps) empty, everything else follows
    /// plain falsiness (`""`, `"0"`, zero).
    pub fn is_empty(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null | Value::Boolean(false)) => true,
            (FieldKind::Int, Value::Varchar(v)) => v.is_empty(),
            (FieldKind::Int | FieldKind::String, v) => v.is_empty_collection(),
            (FieldKind::DateTime, Value::Timestamp(..)) => false,
            (FieldKind::Json, Value::List(..) | Value::Map(..)) => false,
            (FieldKind::DateTime | FieldKind::Json, v) => match v {
                Value::Varchar(v) => v.is_empty() || v == "0",
                Value::Int64(v) => *v == 0,
                Value::Float64(v) => *v == 0.0,
                v => v.is_empty_collection(),
            },
        }
    }

    /// Convert an application value into its storage-ready form.
    pub fn to_primitive(self, value: &Value) -> Result<Primitive> {
        if self.is_empty(value) {
            return Ok(None);
        }
        let result = match self {
            FieldKind::Int => {
                let mut buffer = itoa::Buffer::new();
                buffer.format(integer_of(value)?).to_owned()
            }
            FieldKind::String => match value {
                Value::Boolean(true) => "1".into(),
                // Integral floats are written without a fraction, like integers
                Value::Float64(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_FLOAT => {
                    itoa::Buffer::new().format(*v as i64).to_owned()
                }
                Value::List(..) | Value::Map(..) => {
                    return Err(Error::msg(format!(
                        "Cannot store the collection {value} in a STRING field"
                    )));
                }
                _ => value.to_string(),
            },
            FieldKind::DateTime => Value::Timestamp(timestamp_of(value)?).to_string(),
            FieldKind::Json => serde_json::to_string(value)?,
        };
        Ok(Some(result))
    }

    /// Convert a stored value back into its application-facing form.
    pub fn to_refined(self, primitive: Option<&str>) -> Result<Value> {
        let Some(primitive) = primitive else {
            return Ok(Value::Null);
        };
        Ok(match self {
            FieldKind::Int if primitive.is_empty() => Value::Null,
            FieldKind::Int => Value::Int64(primitive.trim().parse()?),
            FieldKind::String => Value::Varchar(primitive.to_owned()),
            FieldKind::DateTime | FieldKind::Json if primitive.is_empty() || primitive == "0" => {
                Value::Null
            }
            FieldKind::DateTime => Value::Timestamp(parse_timestamp(primitive)?),
            FieldKind::Json => serde_json::from_str::<serde_json::Value>(primitive)?.into(),
        })
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Int => "INT",
            FieldKind::String => "STRING",
            FieldKind::DateTime => "DATETIME",
            FieldKind::Json => "JSON",
        })
    }
}

fn integer_of(value: &Value) -> Result<i64> {
    match value {
        Value::Boolean(v) => Ok(*v as _),
        Value::Int64(v) => Ok(*v),
        Value::Float64(v) if v.is_finite() => Ok(v.trunc() as _),
        Value::Varchar(v) => {
            let v = v.trim();
            match v.parse::<i64>() {
                Ok(v) => Ok(v),
                Err(e) => match v.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v.trunc() as _),
                    _ => Err(e.into()),
                },
            }
        }
        Value::Timestamp(v) => Ok(v.assume_utc().unix_timestamp()),
        _ => Err(Error::msg(format!("Cannot store {value} in an INT field"))),
    }
}

fn timestamp_of(value: &Value) -> Result<PrimitiveDateTime> {
    match value {
        Value::Timestamp(v) => Ok(*v),
        Value::Varchar(v) => parse_timestamp(v),
        Value::Int64(v) => {
            let v = OffsetDateTime::from_unix_timestamp(*v)?;
            Ok(PrimitiveDateTime::new(v.date(), v.time()))
        }
        _ => Err(Error::msg(format!("Cannot store {value} in a DATETIME field"))),
    }
}

/// Parse a date-time written as `YYYY-MM-DD HH:MM:SS`, one of its `T`-separated or shortened
/// variants, or a bare date (midnight).
pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime> {
    let value = value.trim();
    let canonical = PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT);
    if let Ok(result) = canonical {
        return Ok(result);
    }
    for format in ALTERNATIVE_FORMATS {
        if let Ok(result) = PrimitiveDateTime::parse(value, format) {
            return Ok(result);
        }
    }
    if let Ok(result) = Date::parse(value, DATE_FORMAT) {
        return Ok(result.midnight());
    }
    Ok(canonical?)
}
