pub mod binding;
pub mod cell;
pub mod strict;

pub use binding::{Binding, BoundValue, OpenMap};
pub use cell::ValueCell;
pub use strict::{KeyValidator, StrictKeys};

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;

use crate::error::{Error, Result};
use binding::ErasedBinding;

struct Bound {
    binding: Arc<dyn ErasedBinding>,
    shape: &'static str,
}

/// A configuration store with at most one bound value.
///
/// Binding replaces whatever was bound before. Updates go to the current
/// binding; with nothing bound they are dropped.
pub struct ConfigStore {
    bound: ArcSwapOption<Bound>,
    validator: Arc<dyn KeyValidator>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::with_key_validator(Arc::new(StrictKeys::new()))
    }

    pub fn with_key_validator(validator: Arc<dyn KeyValidator>) -> Self {
        Self {
            bound: ArcSwapOption::empty(),
            validator,
        }
    }

    /// Binds a zero-valued `V`.
    pub fn bind<V: BoundValue>(&self) -> Arc<Binding<V>> {
        let binding = Arc::new(Binding::<V>::new());
        let shape = std::any::type_name::<V>();
        self.bound.store(Some(Arc::new(Bound {
            binding: Arc::clone(&binding) as Arc<dyn ErasedBinding>,
            shape,
        })));
        tracing::debug!(shape, "Bound config value");
        binding
    }

    /// Registers `V`'s strict key set with the key validator, then binds.
    pub fn bind_strict<V: BoundValue>(&self) -> Result<Arc<Binding<V>>> {
        let shape = std::any::type_name::<V>();
        let keys = V::strict_key_paths()
            .ok_or_else(|| Error::InvalidStrictTarget(shape.to_owned()))?;
        self.validator.register_strict_keys(&keys);
        Ok(self.bind::<V>())
    }

    /// Binds an open map when `prototype` is a JSON object.
    pub fn bind_prototype(&self, prototype: &Value) -> Result<Arc<Binding<OpenMap>>> {
        match prototype {
            Value::Object(_) => Ok(self.bind::<OpenMap>()),
            other => Err(Error::InvalidBindTarget(json_kind(other).to_owned())),
        }
    }

    /// JSON prototypes carry no record shape, so this always fails.
    pub fn bind_strict_prototype(&self, prototype: &Value) -> Result<Arc<Binding<OpenMap>>> {
        Err(Error::InvalidStrictTarget(json_kind(prototype).to_owned()))
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load().is_some()
    }

    pub fn set(&self, key: &str, raw: Value) -> Result<bool> {
        let Some(bound) = self.bound.load_full() else {
            tracing::debug!(key, "No value bound, ignoring config key");
            return Ok(false);
        };
        bound.binding.set(key, raw)
    }

    /// Applies a batch to the bound value. Returns the keys nothing took.
    pub fn set_values<I, K>(&self, values: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let batch: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(key, raw)| (key.into(), raw))
            .collect();

        let Some(bound) = self.bound.load_full() else {
            tracing::debug!(count = batch.len(), "No value bound, ignoring config batch");
            return Ok(batch.into_keys().collect());
        };
        bound.binding.set_values(batch)
    }

    /// The current snapshot, if a `V` is bound.
    pub fn value<V: BoundValue>(&self) -> Option<Arc<V>> {
        let bound = self.bound.load_full()?;
        match Arc::clone(&bound.binding).into_any().downcast::<Binding<V>>() {
            Ok(binding) => Some(binding.value()),
            Err(_) => {
                tracing::debug!(
                    bound = bound.shape,
                    requested = std::any::type_name::<V>(),
                    "Bound value has a different shape"
                );
                None
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = self.bound.load_full().map(|bound| bound.shape);
        f.debug_struct("ConfigStore").field("bound", &shape).finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::{ConfigStore, OpenMap, StrictKeys};
    use crate::error::Error;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Base {
        c: String,
    }
    crate::record!(Base { c });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Minimal {
        a: i64,
        b: Base,
        d: String,
    }
    crate::record!(Minimal {
        a = "a",
        #[embed] b,
        d = "-",
    });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        name: String,
    }
    crate::record!(Item { name });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Inventory {
        count: i64,
        first: i64,
        second: i64,
        items: HashMap<String, Item>,
        labels: HashMap<String, String>,
    }
    crate::record!(Inventory {
        count,
        first,
        second,
        items,
        labels,
    });

    #[test]
    fn strict_binding_registers_leaf_keys() {
        let strict = Arc::new(StrictKeys::new());
        let store = ConfigStore::with_key_validator(strict.clone());

        store.bind_strict::<Minimal>().expect("records bind strictly");
        assert_eq!(strict.keys(), vec!["a".to_owned(), "c".to_owned()]);
        assert!(store.is_bound());
    }

    #[test]
    fn strict_binding_needs_a_record() {
        let store = ConfigStore::new();
        let error = store
            .bind_strict::<OpenMap>()
            .expect_err("open maps have no strict keys");
        assert!(matches!(error, Error::InvalidStrictTarget(_)));
        assert!(!store.is_bound());

        let error = store
            .bind_strict_prototype(&json!({}))
            .expect_err("prototypes are never records");
        assert!(matches!(error, Error::InvalidStrictTarget(_)));
    }

    #[test]
    fn prototypes_must_be_objects() {
        let store = ConfigStore::new();
        let error = store
            .bind_prototype(&json!([1, 2]))
            .expect_err("arrays cannot be bound");
        match error {
            Error::InvalidBindTarget(kind) => assert_eq!(kind, "array"),
            other => panic!("unexpected error: {other}"),
        }

        store.bind_prototype(&json!({"seed": 1})).expect("objects bind");
        assert!(store.value::<OpenMap>().expect("open map bound").is_empty());
    }

    #[test]
    fn open_map_sets_leave_other_keys_alone() {
        let store = ConfigStore::new();
        store.bind::<OpenMap>();
        store.set("a", json!(1)).expect("inserts");
        store.set("b", json!("x")).expect("inserts");
        store.set("a", json!(2)).expect("overwrites");

        let value = store.value::<OpenMap>().expect("open map bound");
        assert_eq!(value.get("a"), Some(&json!(2)));
        assert_eq!(value.get("b"), Some(&json!("x")));
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn repeated_sets_are_idempotent() {
        let store = ConfigStore::new();
        store.bind::<Inventory>();
        store.set("items.x.name", json!("hello")).expect("applies");
        let once = store.value::<Inventory>().expect("bound");
        store.set("items.x.name", json!("hello")).expect("applies");
        let twice = store.value::<Inventory>().expect("bound");

        assert_eq!(once, twice);
        assert_eq!(
            twice.items.get("x"),
            Some(&Item {
                name: "hello".to_owned()
            })
        );
    }

    #[test]
    fn malformed_values_zero_instead_of_failing() {
        let store = ConfigStore::new();
        store.bind::<Inventory>();
        store.set("count", json!(5)).expect("applies");
        assert!(store.set("count", json!("not-a-number")).expect("degrades"));
        assert_eq!(store.value::<Inventory>().expect("bound").count, 0);
    }

    #[test]
    fn later_batch_keys_overwrite_earlier_ones() {
        let store = ConfigStore::new();
        store.bind::<Inventory>();
        let missed = store
            .set_values([("count", json!(2)), ("COUNT", json!(1))])
            .expect("batch applies");

        assert!(missed.is_empty());
        assert_eq!(store.value::<Inventory>().expect("bound").count, 2);
    }

    #[test]
    fn unbound_stores_drop_updates() {
        let store = ConfigStore::new();
        assert!(!store.set("a", json!(1)).expect("no-op"));
        let missed = store
            .set_values([("a", json!(1)), ("b", json!(2))])
            .expect("no-op");
        assert_eq!(missed, vec!["a".to_owned(), "b".to_owned()]);
        assert!(store.value::<OpenMap>().is_none());
    }

    #[test]
    fn rebinding_replaces_the_value() {
        let store = ConfigStore::new();
        store.bind::<OpenMap>();
        store.set("a", json!(1)).expect("inserts");

        store.bind::<Inventory>();
        assert!(store.value::<OpenMap>().is_none());
        assert_eq!(
            *store.value::<Inventory>().expect("bound"),
            Inventory::default()
        );
    }

    #[test]
    fn readers_never_see_half_a_batch() {
        let store = ConfigStore::new();
        store.bind::<Inventory>();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let value = store.value::<Inventory>().expect("bound");
                    assert_eq!(value.first, value.second);
                }
            });

            for round in 1..=200_i64 {
                let batch = BTreeMap::from([
                    ("first".to_owned(), json!(round)),
                    ("second".to_owned(), json!(round)),
                ]);
                store.set_values(batch).expect("batch applies");
            }
            done.store(true, Ordering::Release);
        });

        let value = store.value::<Inventory>().expect("bound");
        assert_eq!((value.first, value.second), (200, 200));
    }

    #[test]
    fn concurrent_writers_on_disjoint_keys_all_land() {
        let store = ConfigStore::new();
        store.bind::<Inventory>();

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    store
                        .set(&format!("labels.k{writer}"), json!(writer))
                        .expect("applies");
                });
            }
        });

        let value = store.value::<Inventory>().expect("bound");
        let labels = &value.labels;
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.get("k3").map(String::as_str), Some("3"));
    }
}
