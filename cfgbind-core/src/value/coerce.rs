//! Permissive conversion of raw config values into declared field types.
//!
//! Every supported target implements [`Coerce`]; the impls below form the
//! conversion table. A conversion never panics: inputs that have no
//! representation in the target type produce a [`CastError`], which the
//! resolver turns into a zeroed field.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot cast {found} to {target}")]
pub struct CastError {
    target: &'static str,
    found: String,
}

impl CastError {
    pub fn new(target: &'static str, raw: &Value) -> Self {
        Self {
            target,
            found: describe(raw),
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }
}

pub trait Coerce: Sized {
    const TARGET: &'static str;

    fn coerce(raw: &Value) -> Result<Self, CastError>;
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::Null => "null".to_owned(),
        Value::Bool(flag) => format!("bool {flag}"),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("string {text:?}"),
        Value::Array(_) => "array".to_owned(),
        Value::Object(_) => "object".to_owned(),
    }
}

/// Renders a scalar as text. Arrays and objects have no text form.
pub fn to_text(raw: &Value) -> Option<String> {
    match raw {
        Value::Null => Some(String::new()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(match (number.as_i64(), number.as_u64()) {
            (Some(signed), _) => signed.to_string(),
            (None, Some(unsigned)) => unsigned.to_string(),
            _ => number.as_f64().map(|float| float.to_string())?,
        }),
        Value::String(text) => Some(text.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_bool_word(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// "10.00" -> "10"; "10." and "1.50" are left alone.
fn trim_zero_decimal(text: &str) -> &str {
    let mut found_zero = false;
    for (index, byte) in text.bytes().enumerate().rev() {
        match byte {
            b'.' if found_zero => return &text[..index],
            b'.' => return text,
            b'0' => found_zero = true,
            _ => return text,
        }
    }
    text
}

fn parse_int_text(text: &str) -> Option<i128> {
    let text = trim_zero_decimal(text);
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };

    if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn integer(raw: &Value, target: &'static str) -> Result<i128, CastError> {
    let cast_error = || CastError::new(target, raw);
    match raw {
        Value::Null => Ok(0),
        Value::Bool(flag) => Ok(i128::from(*flag)),
        Value::Number(number) => {
            if let Some(signed) = number.as_i64() {
                Ok(i128::from(signed))
            } else if let Some(unsigned) = number.as_u64() {
                Ok(i128::from(unsigned))
            } else {
                number
                    .as_f64()
                    .filter(|float| float.is_finite())
                    .map(|float| float.trunc() as i128)
                    .ok_or_else(cast_error)
            }
        }
        Value::String(text) => parse_int_text(text).ok_or_else(cast_error),
        Value::Array(_) | Value::Object(_) => Err(cast_error()),
    }
}

fn float(raw: &Value, target: &'static str) -> Result<f64, CastError> {
    let cast_error = || CastError::new(target, raw);
    match raw {
        Value::Null => Ok(0.0),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64().ok_or_else(cast_error),
        Value::String(text) => text.parse::<f64>().map_err(|_| cast_error()),
        Value::Array(_) | Value::Object(_) => Err(cast_error()),
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Parses duration text such as `1h30m`, `250ms` or `1.5s`.
///
/// Negative durations have no `std::time::Duration` form and are rejected.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let whole_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (whole_text, tail) = rest.split_at(whole_len);
        let (fraction_text, tail) = match tail.strip_prefix('.') {
            Some(after) => {
                let len = after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len());
                after.split_at(len)
            }
            None => ("", tail),
        };
        if whole_text.is_empty() && fraction_text.is_empty() {
            return None;
        }

        let unit_len = tail
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let scale = unit_nanos(unit)?;

        let whole: u128 = if whole_text.is_empty() {
            0
        } else {
            whole_text.parse().ok()?
        };
        let mut fraction: u128 = 0;
        let mut divisor: u128 = 1;
        for digit in fraction_text.bytes().take(18) {
            fraction = fraction * 10 + u128::from(digit - b'0');
            divisor *= 10;
        }

        total = total
            .checked_add(whole.checked_mul(scale)?)?
            .checked_add(fraction * scale / divisor)?;
        rest = next;
    }

    if negative && total != 0 {
        return None;
    }
    let seconds = u64::try_from(total / 1_000_000_000).ok()?;
    Some(Duration::new(seconds, (total % 1_000_000_000) as u32))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

impl Coerce for String {
    const TARGET: &'static str = "string";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        to_text(raw).ok_or_else(|| CastError::new(Self::TARGET, raw))
    }
}

impl Coerce for bool {
    const TARGET: &'static str = "bool";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        let cast_error = || CastError::new(Self::TARGET, raw);
        match raw {
            Value::Null => Ok(false),
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(signed) => Ok(signed != 0),
                None => number
                    .as_f64()
                    .map(|float| float != 0.0)
                    .ok_or_else(cast_error),
            },
            Value::String(text) => parse_bool_word(text).ok_or_else(cast_error),
            Value::Array(_) | Value::Object(_) => Err(cast_error()),
        }
    }
}

macro_rules! integer_coerce {
    ($($ty:ty),* $(,)?) => {$(
        impl Coerce for $ty {
            const TARGET: &'static str = stringify!($ty);

            fn coerce(raw: &Value) -> Result<Self, CastError> {
                let wide = integer(raw, Self::TARGET)?;
                <$ty>::try_from(wide).map_err(|_| CastError::new(Self::TARGET, raw))
            }
        }
    )*};
}

integer_coerce!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Coerce for f64 {
    const TARGET: &'static str = "f64";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        float(raw, Self::TARGET)
    }
}

impl Coerce for f32 {
    const TARGET: &'static str = "f32";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        float(raw, Self::TARGET).map(|wide| wide as f32)
    }
}

impl Coerce for Duration {
    const TARGET: &'static str = "duration";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        let cast_error = || CastError::new(Self::TARGET, raw);
        match raw {
            Value::Null => Ok(Duration::ZERO),
            Value::Number(number) => {
                if let Some(nanos) = number.as_u64() {
                    Ok(Duration::from_nanos(nanos))
                } else {
                    number
                        .as_f64()
                        .filter(|float| float.is_finite() && *float >= 0.0)
                        .map(|float| Duration::from_nanos(float as u64))
                        .ok_or_else(cast_error)
                }
            }
            Value::String(text) => {
                let parsed = if text.contains(['n', 's', 'u', 'µ', 'μ', 'm', 'h']) {
                    parse_duration(text)
                } else {
                    parse_duration(&format!("{text}ns"))
                };
                parsed.ok_or_else(cast_error)
            }
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(cast_error()),
        }
    }
}

impl Coerce for DateTime<Utc> {
    const TARGET: &'static str = "timestamp";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        let cast_error = || CastError::new(Self::TARGET, raw);
        match raw {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|float| float.trunc() as i64))
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .ok_or_else(cast_error),
            Value::String(text) => parse_timestamp(text).ok_or_else(cast_error),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                Err(cast_error())
            }
        }
    }
}

impl Coerce for Vec<String> {
    const TARGET: &'static str = "string list";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| to_text(item).ok_or_else(|| CastError::new(Self::TARGET, raw)))
                .collect(),
            Value::String(text) => Ok(text.split_whitespace().map(str::to_owned).collect()),
            _ => Err(CastError::new(Self::TARGET, raw)),
        }
    }
}

impl Coerce for Vec<i64> {
    const TARGET: &'static str = "int list";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(i64::coerce).collect(),
            _ => Err(CastError::new(Self::TARGET, raw)),
        }
    }
}

impl Coerce for HashMap<String, String> {
    const TARGET: &'static str = "string map";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        let parsed;
        let object = match raw {
            Value::Null => return Ok(HashMap::new()),
            Value::Object(object) => object,
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text)
                    .map_err(|_| CastError::new(Self::TARGET, raw))?;
                parsed
                    .as_object()
                    .ok_or_else(|| CastError::new(Self::TARGET, raw))?
            }
            _ => return Err(CastError::new(Self::TARGET, raw)),
        };

        Ok(object
            .iter()
            .map(|(key, value)| {
                let text = to_text(value).unwrap_or_else(|| value.to_string());
                (key.clone(), text)
            })
            .collect())
    }
}

impl Coerce for Value {
    const TARGET: &'static str = "value";

    fn coerce(raw: &Value) -> Result<Self, CastError> {
        Ok(raw.clone())
    }
}
