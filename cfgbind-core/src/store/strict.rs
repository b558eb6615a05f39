use parking_lot::RwLock;

use crate::record::KEY_SEPARATOR;

/// Receives the strict key set of a record when it is bound strictly.
pub trait KeyValidator: Send + Sync {
    fn register_strict_keys(&self, keys: &[String]);
}

/// Keeps the most recently registered strict key set.
#[derive(Debug, Default)]
pub struct StrictKeys {
    keys: RwLock<Vec<String>>,
}

impl StrictKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.read().iter().any(|known| known == key)
    }

    /// Whether `key` is a strict key or lies below one, such as an entry of
    /// a map-valued leaf.
    pub fn allows(&self, key: &str) -> bool {
        self.keys.read().iter().any(|known| {
            key == known
                || key
                    .strip_prefix(known.as_str())
                    .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
        })
    }
}

impl KeyValidator for StrictKeys {
    fn register_strict_keys(&self, keys: &[String]) {
        tracing::debug!(count = keys.len(), "Registered strict config keys");
        *self.keys.write() = keys.to_vec();
    }
}
