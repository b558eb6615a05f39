use serde_json::Value;

use crate::error::{Error, Result};
use crate::value::coerce::to_text;
use crate::value::field::Field;

pub type DecodeError = Box<dyn std::error::Error + Send + Sync>;

/// A type that validates and decodes itself from text.
///
/// Fields whose type implements this take the raw value as text instead of
/// going through coercion, and a rejected text fails the whole update.
/// Use [`text_field!`](crate::text_field) to expose such a type as a field.
pub trait TextDecode {
    fn decode_text(&mut self, text: &str) -> std::result::Result<(), DecodeError>;
}

/// Runs the field's text decoder, if it has one.
///
/// Returns `Ok(false)` when the field declines so the caller can coerce.
pub(crate) fn decode_with_hook(field: &mut dyn Field, key: &str, raw: &Value) -> Result<bool> {
    let Some(decoder) = field.text_decoder() else {
        return Ok(false);
    };

    let text = to_text(raw).unwrap_or_default();
    decoder
        .decode_text(&text)
        .map_err(|err| Error::CodecDecode {
            key: key.to_owned(),
            message: err.to_string(),
        })?;
    Ok(true)
}

#[macro_export]
macro_rules! text_field {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Field for $ty {
            fn text_decoder(&mut self) -> ::std::option::Option<&mut dyn $crate::TextDecode> {
                ::std::option::Option::Some(self)
            }

            fn coerce_from(
                &mut self,
                raw: &$crate::Value,
            ) -> ::std::result::Result<(), $crate::CastError> {
                ::std::result::Result::Err($crate::CastError::new(stringify!($ty), raw))
            }

            fn zero(&mut self) {
                *self = <$ty as ::std::default::Default>::default();
            }
        }
    )+};
}
