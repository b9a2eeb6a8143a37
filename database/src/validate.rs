use crate::errors::{Error, Result};
use serde_json::{Map, Value};

/// Named attribute values for `create` and `update`.
pub type Fields = Map<String, Value>;

/// A record identifier as handed in by a caller. Integers, floats and
/// strings or bytes made only of ASCII digits resolve to an id; any other
/// shape resolves to nothing, which lookups report as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(Option<i64>);

impl RecordId {
    pub fn get(&self) -> Option<i64> {
        self.0
    }

    fn from_digits(bytes: &[u8]) -> Self {
        if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
            return RecordId(None);
        }
        // all ASCII digits, so this is valid UTF-8
        let parsed = std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok());
        RecordId(parsed)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(Some(id))
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId(Some(i64::from(id)))
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        RecordId(Some(i64::from(id)))
    }
}

impl From<usize> for RecordId {
    fn from(id: usize) -> Self {
        RecordId(i64::try_from(id).ok())
    }
}

impl From<f64> for RecordId {
    fn from(id: f64) -> Self {
        if !id.is_finite() || id.abs() >= i64::MAX as f64 {
            return RecordId(None);
        }
        // truncates toward zero
        RecordId(Some(id as i64))
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::from_digits(id.as_bytes())
    }
}

impl From<&String> for RecordId {
    fn from(id: &String) -> Self {
        RecordId::from_digits(id.as_bytes())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::from_digits(id.as_bytes())
    }
}

impl From<&[u8]> for RecordId {
    fn from(id: &[u8]) -> Self {
        RecordId::from_digits(id)
    }
}

impl<T: Into<RecordId>> From<Option<T>> for RecordId {
    fn from(id: Option<T>) -> Self {
        id.map(Into::into).unwrap_or(RecordId(None))
    }
}

impl From<&Value> for RecordId {
    fn from(id: &Value) -> Self {
        match id {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => RecordId::from(i),
                (None, Some(f)) => RecordId::from(f),
                _ => RecordId(None),
            },
            Value::String(s) => RecordId::from(s.as_str()),
            _ => RecordId(None),
        }
    }
}

/// Validates a field set against the declared columns of a model.
/// Unknown names fail; the identifier is never accepted from callers.
pub fn check_fields(model: &'static str, columns: &[&str], fields: &Fields) -> Result<()> {
    for name in fields.keys() {
        if name == "id" {
            return Err(Error::Validation(format!(
                "{} id is assigned by the database",
                model
            )));
        }
        if !columns.contains(&name.as_str()) {
            return Err(Error::UnknownField {
                model,
                field: name.clone(),
            });
        }
    }
    Ok(())
}

/// Turns a JSON object into a field set.
pub fn fields(value: Value) -> Result<Fields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Validation(format!(
            "Fields must be an object, got {}",
            other
        ))),
    }
}
