use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::keys::collect_key_paths;
use crate::record::{Record, KEY_SEPARATOR};
use crate::value::codec::decode_with_hook;
use crate::value::coerce::CastError;
use crate::value::field::Field;

/// Sets the field addressed by `key` inside `record`.
///
/// Returns `Ok(false)` when no field took the key; the record is left as it
/// was. A coercion failure zeroes the field instead of failing. A rejected
/// text codec fails the call, and `record` may then hold partial changes, so
/// callers apply keys to a scratch copy.
///
/// A key naming a nested record or a map of records itself, rather than one
/// of its leaves, has nothing to coerce into and resets the whole field to
/// its default. Loaders that emit empty tables as leaves (`db = {}`) wipe
/// values set earlier under that prefix.
pub fn apply_key<R: Record>(record: &mut R, key: &str, raw: &Value) -> Result<bool> {
    resolve(record, key, raw).map_err(|err| match err {
        Error::CodecDecode { message, .. } => Error::CodecDecode {
            key: key.to_owned(),
            message,
        },
        other => other,
    })
}

pub(crate) fn resolve<R: Record>(record: &mut R, key: &str, raw: &Value) -> Result<bool> {
    let mut touched = false;
    let mut assigned = false;

    for field in R::descriptor().fields() {
        if !assigned && field.matches_exactly(key) {
            assign(field.slot(record), key, raw)?;
            assigned = true;
            touched = true;
            continue;
        }

        if let Some(rest) = field.strip_prefix(key) {
            touched |= field.slot(record).descend(rest, raw)?;
        }
    }

    Ok(touched)
}

fn assign(slot: &mut dyn Field, key: &str, raw: &Value) -> Result<()> {
    if decode_with_hook(&mut *slot, key, raw)? {
        return Ok(());
    }

    if let Err(err) = slot.coerce_from(raw) {
        tracing::debug!(key, error = %err, "Zeroing field after failed coercion");
        slot.zero();
    }
    Ok(())
}

impl<R: Record> Field for R {
    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        Err(CastError::new(std::any::type_name::<R>(), raw))
    }

    fn zero(&mut self) {
        *self = R::default();
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        let mut scratch = self.clone();
        if !resolve(&mut scratch, rest, raw)? {
            return Ok(false);
        }
        *self = scratch;
        Ok(true)
    }

    fn nested_keys(&self, prefix: &str) -> Option<Vec<String>> {
        Some(collect_key_paths::<R>(prefix))
    }
}

impl<R: Record> Field for HashMap<String, R> {
    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        Err(CastError::new("record map", raw))
    }

    fn zero(&mut self) {
        self.clear();
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        // A bare entry key names no field inside the entry.
        let Some((entry_key, path)) = rest.split_once(KEY_SEPARATOR) else {
            return Ok(false);
        };

        let mut entry = self.get(entry_key).cloned().unwrap_or_default();
        if !resolve(&mut entry, path, raw)? {
            return Ok(false);
        }
        self.insert(entry_key.to_owned(), entry);
        Ok(true)
    }
}

impl<R: Record> Field for HashMap<String, Arc<R>> {
    fn coerce_from(&mut self, raw: &Value) -> std::result::Result<(), CastError> {
        Err(CastError::new("record pointer map", raw))
    }

    fn zero(&mut self) {
        self.clear();
    }

    fn descend(&mut self, rest: &str, raw: &Value) -> Result<bool> {
        let Some((entry_key, path)) = rest.split_once(KEY_SEPARATOR) else {
            return Ok(false);
        };

        let mut entry = self
            .get(entry_key)
            .map(|existing| R::clone(existing))
            .unwrap_or_default();
        if !resolve(&mut entry, path, raw)? {
            return Ok(false);
        }
        self.insert(entry_key.to_owned(), Arc::new(entry));
        Ok(true)
    }
}
