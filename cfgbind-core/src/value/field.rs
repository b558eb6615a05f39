use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::value::codec::TextDecode;
use crate::value::coerce::{to_text, CastError, Coerce};

/// What a record field can do when a config key reaches it.
///
/// An exact key match goes through [`text_decoder`](Field::text_decoder) and
/// then [`coerce_from`](Field::coerce_from), falling back to
/// [`zero`](Field::zero). A key that continues past the field is handed to
/// [`descend`](Field::descend) with the remaining path.
pub trait Field: Send + Sync {
    fn text_decoder(&mut self) -> Option<&mut dyn TextDecode> {
        None
    }

    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError>;

    fn zero(&mut self);

    /// Returns whether anything below this field was touched.
    fn descend(&mut self, _rest: &str, _raw: &Value) -> Result<bool> {
        Ok(false)
    }

    /// Leaf key paths under `prefix`, for record-shaped fields only.
    fn nested_keys(&self, _prefix: &str) -> Option<Vec<String>> {
        None
    }
}

macro_rules! coerced_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
                *self = <$ty as Coerce>::coerce(raw)?;
                Ok(())
            }

            fn zero(&mut self) {
                *self = <$ty>::default();
            }
        }
    )*};
}

coerced_field!(
    String,
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Duration,
    DateTime<Utc>,
    Vec<String>,
    Vec<i64>,
    Value,
);

impl Field for HashMap<String, String> {
    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        *self = <Self as Coerce>::coerce(raw)?;
        Ok(())
    }

    fn zero(&mut self) {
        self.clear();
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        let text = to_text(raw).unwrap_or_else(|| raw.to_string());
        self.insert(rest.to_owned(), text);
        Ok(true)
    }
}

impl Field for HashMap<String, Value> {
    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        match raw {
            Value::Null => self.clear(),
            Value::Object(object) => {
                *self = object
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
            }
            _ => return Err(CastError::new("value map", raw)),
        }
        Ok(())
    }

    fn zero(&mut self) {
        self.clear();
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        self.insert(rest.to_owned(), raw.clone());
        Ok(true)
    }
}

// Optional fields behave like pointers: empty until a key allocates them.
impl<T> Field for Option<T>
where
    T: Field + Default + Clone,
{
    fn text_decoder(&mut self) -> Option<&mut dyn TextDecode> {
        if self.is_none() {
            let mut fresh = T::default();
            if fresh.text_decoder().is_none() {
                return None;
            }
            *self = Some(fresh);
        }
        self.as_mut().and_then(|inner| inner.text_decoder())
    }

    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        let mut inner = T::default();
        inner.coerce_from(raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn zero(&mut self) {
        *self = None;
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        let mut inner = self.clone().unwrap_or_default();
        if !inner.descend(rest, raw)? {
            return Ok(false);
        }
        *self = Some(inner);
        Ok(true)
    }
}
