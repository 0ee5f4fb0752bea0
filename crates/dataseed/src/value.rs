//! Literal values of a dataset row.
//!
//! A dataset only ever holds text, integers, floats, or NULL.  Anything fancier (dates, blobs) is written as text and
//! left to the database's type affinity to sort out.
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    F64(f64),
}

impl Value {
    /// Convert a JSON scalar.  Returns the reason on failure, for the caller to attach a location to.
    pub(crate) fn from_json(value: &serde_json::Value) -> Result<Value, String> {
        use serde_json::Value as J;

        match value {
            J::Null => Ok(Value::Null),
            J::String(s) => Ok(Value::String(s.clone())),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_f64() {
                    n.as_f64()
                        .map(Value::F64)
                        .ok_or_else(|| format!("{} isn't representable as an f64", n))
                } else {
                    Err(format!("{} isn't representable as an i64", n))
                }
            }
            J::Bool(_) => Err("booleans aren't supported; use 0 or 1".to_string()),
            J::Array(_) | J::Object(_) => Err("values must be scalars".to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::F64(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::F64(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Value {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn converts_json_scalars() {
        assert_eq!(Value::from_json(&json!(null)), Ok(Value::Null));
        assert_eq!(Value::from_json(&json!("x")), Ok(Value::String("x".into())));
        assert_eq!(Value::from_json(&json!(-5)), Ok(Value::Integer(-5)));
        assert_eq!(Value::from_json(&json!(1.5)), Ok(Value::F64(1.5)));
    }

    #[test]
    fn rejects_non_scalars() {
        assert!(Value::from_json(&json!(true)).is_err());
        assert!(Value::from_json(&json!([1])).is_err());
        assert!(Value::from_json(&json!({"a": 1})).is_err());
        assert!(Value::from_json(&json!(u64::MAX)).is_err());
    }
}
