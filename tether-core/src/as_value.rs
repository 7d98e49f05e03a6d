use crate::{Error, Result, TIMESTAMP_FORMAT, Value};
use std::any;
use time::PrimitiveDateTime;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// `as_value` wraps the native value into its canonical variant. `try_from_value` accepts the
/// canonical variant and, where lossless, the neighbouring ones (integers of another width,
/// strings holding a number or a date-time).
///
/// ```rust
/// use tether_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int64(42));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($($source:ty),+ $(,)?) => {
        $(
            impl AsValue for $source {
                fn as_value(self) -> Value {
                    Value::Int64(self as _)
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Int64(v) => <$source>::try_from(v).map_err(|_| {
                            Error::msg(format!(
                                "Value {v}: i64 is out of range for {}",
                                any::type_name::<Self>(),
                            ))
                        }),
                        Value::Varchar(ref v) => Ok(v.trim().parse::<$source>()?),
                        _ => Err(mismatch::<Self>(&value)),
                    }
                }
            }
        )+
    };
}

impl_as_value_integer!(i8, i16, i32, i64, u8, u16, u32);

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Int64(v) => Ok(v != 0),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for f64 {
    fn as_value(self) -> Value {
        Value::Float64(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float64(v) => Ok(v),
            Value::Int64(v) => Ok(v as _),
            Value::Varchar(ref v) => Ok(v.trim().parse()?),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for f32 {
    fn as_value(self) -> Value {
        Value::Float64(self as _)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        f64::try_from_value(value).map(|v| v as _)
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(v) => Ok(v),
            Value::Null | Value::List(..) | Value::Map(..) => Err(mismatch::<Self>(&value)),
            _ => Ok(value.to_string()),
        }
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_value(self) -> Value {
        Value::Timestamp(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Varchar(ref v) => Ok(PrimitiveDateTime::parse(v, TIMESTAMP_FORMAT)?),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_value(self) -> Value {
        Value::List(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(v) => v.into_iter().map(T::try_from_value).collect(),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}
