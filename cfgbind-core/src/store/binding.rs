use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::record::{apply_key, key_paths, Record};
use crate::store::cell::ValueCell;

/// A string-keyed map of untyped values, bound when no record shape exists.
pub type OpenMap = HashMap<String, Value>;

/// A shape a [`Binding`] can hold.
pub trait BoundValue: Clone + Default + Send + Sync + 'static {
    /// Applies one key to `self`; returns whether anything was set.
    fn apply(&mut self, key: &str, raw: &Value) -> Result<bool>;

    /// The leaf key paths of a record shape; `None` for shapes without one.
    fn strict_key_paths() -> Option<Vec<String>> {
        None
    }
}

impl<R: Record> BoundValue for R {
    fn apply(&mut self, key: &str, raw: &Value) -> Result<bool> {
        apply_key(self, key, raw)
    }

    fn strict_key_paths() -> Option<Vec<String>> {
        Some(key_paths::<R>())
    }
}

impl BoundValue for OpenMap {
    fn apply(&mut self, key: &str, raw: &Value) -> Result<bool> {
        self.insert(key.to_owned(), raw.clone());
        Ok(true)
    }
}

/// The live value of a store and its update entry points.
pub struct Binding<V> {
    cell: ValueCell<V>,
}

impl<V: BoundValue> Binding<V> {
    pub(crate) fn new() -> Self {
        Self {
            cell: ValueCell::new(V::default()),
        }
    }

    /// The current snapshot. Holding it never blocks writers.
    pub fn value(&self) -> Arc<V> {
        self.cell.read()
    }

    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    pub fn set(&self, key: &str, raw: Value) -> Result<bool> {
        let touched = self.cell.update(|value| value.apply(key, &raw))?;
        if !touched {
            tracing::debug!("Config key {key} not found in bound value");
        }
        self.trace_publication();
        Ok(touched)
    }

    /// Applies a batch in sorted key order and publishes it as one snapshot.
    ///
    /// Returns the keys nothing took. If any key fails, no part of the batch
    /// is published.
    pub fn set_values<I, K>(&self, values: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let batch: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(key, raw)| (key.into(), raw))
            .collect();

        let missed = self.cell.update(|value| {
            let mut missed = Vec::new();
            for (key, raw) in &batch {
                if !value.apply(key, raw)? {
                    missed.push(key.clone());
                }
            }
            Ok(missed)
        })?;

        for key in &missed {
            tracing::debug!("Config key {key} not found in bound value");
        }
        self.trace_publication();
        Ok(missed)
    }

    fn trace_publication(&self) {
        tracing::trace!(
            shape = std::any::type_name::<V>(),
            version = self.version(),
            "Published snapshot"
        );
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for Binding<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").field("cell", &self.cell).finish()
    }
}

/// Type-erased view of a binding, used by the store to route updates.
pub(crate) trait ErasedBinding: Send + Sync {
    fn set(&self, key: &str, raw: Value) -> Result<bool>;

    fn set_values(&self, values: BTreeMap<String, Value>) -> Result<Vec<String>>;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<V: BoundValue> ErasedBinding for Binding<V> {
    fn set(&self, key: &str, raw: Value) -> Result<bool> {
        Binding::set(self, key, raw)
    }

    fn set_values(&self, values: BTreeMap<String, Value>) -> Result<Vec<String>> {
        Binding::set_values(self, values)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
