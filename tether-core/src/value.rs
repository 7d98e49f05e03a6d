use serde::{Serialize, Serializer, ser::Error as _};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

/// Storage format of every date-time primitive: `YYYY-MM-DD HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Dynamically typed value crossing the API: row cells, query parameters, model attributes.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Varchar(String),
    Timestamp(PrimitiveDateTime),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Structured record with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for lists and maps without elements.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::List(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(v) => (*v).into(),
            Value::Int64(v) => (*v).into(),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or_default(),
            Value::Varchar(v) => v.as_str().into(),
            Value::Timestamp(..) => self.to_string().into(),
            Value::List(v) => v.iter().map(Value::to_json).collect(),
            Value::Map(v) => v
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<serde_json::Map<_, _>>()
                .into(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Boolean(v),
            serde_json::Value::Number(v) => match v.as_i64() {
                Some(v) => Value::Int64(v),
                None => v.as_f64().map(Value::Float64).unwrap_or_default(),
            },
            serde_json::Value::String(v) => Value::Varchar(v),
            serde_json::Value::Array(v) => Value::List(v.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(v) => {
                Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.into())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(value: BTreeMap<String, V>) -> Self {
        Value::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int64(v) => f.write_str(itoa::Buffer::new().format(*v)),
            Value::Float64(v) => f.write_str(ryu::Buffer::new().format(*v)),
            Value::Varchar(v) => f.write_str(v),
            Value::Timestamp(v) => f.write_str(&v.format(TIMESTAMP_FORMAT).map_err(|_| fmt::Error)?),
            Value::List(..) | Value::Map(..) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Varchar(v) => serializer.serialize_str(v),
            Value::Timestamp(v) => {
                serializer.serialize_str(&v.format(TIMESTAMP_FORMAT).map_err(S::Error::custom)?)
            }
            Value::List(v) => serializer.collect_seq(v),
            Value::Map(v) => serializer.collect_map(v),
        }
    }
}
