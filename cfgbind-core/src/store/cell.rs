use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::error::Result;

/// Holds the current snapshot of a bound value.
///
/// Readers load the snapshot without locking. Writers take the write lock,
/// change a private clone and publish it in one swap, so a reader sees
/// either the old snapshot or the new one.
pub struct ValueCell<V> {
    current: ArcSwap<V>,
    writer: Mutex<()>,
    version: AtomicU64,
}

impl<V: Clone> ValueCell<V> {
    pub fn new(value: V) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
            writer: Mutex::new(()),
            version: AtomicU64::new(0),
        }
    }

    pub fn read(&self) -> Arc<V> {
        self.current.load_full()
    }

    /// Number of snapshots published since the cell was created.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Applies `mutate` to a clone of the current snapshot and publishes the
    /// clone if `mutate` succeeds. On error nothing is published.
    pub fn update<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut V) -> Result<T>,
    {
        let _guard = self.writer.lock();
        let mut next = V::clone(&self.current.load());
        let outcome = mutate(&mut next)?;
        self.current.store(Arc::new(next));
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(outcome)
    }
}

impl<V: Clone + Default> Default for ValueCell<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for ValueCell<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCell")
            .field("current", &self.current.load_full())
            .field("version", &self.version.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ValueCell;
    use crate::error::Error;

    #[test]
    fn held_snapshots_never_change() {
        let cell = ValueCell::new(vec![1]);
        let before = cell.read();
        cell.update(|items| {
            items.push(2);
            Ok(())
        })
        .expect("update succeeds");

        assert_eq!(*before, vec![1]);
        assert_eq!(*cell.read(), vec![1, 2]);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn failed_updates_publish_nothing() {
        let cell = ValueCell::new(String::from("stable"));
        let error = cell
            .update(|text| {
                text.push_str(" and broken");
                Err::<(), _>(Error::Config("rejected".to_owned()))
            })
            .expect_err("update must fail");

        assert!(matches!(error, Error::Config(_)));
        assert_eq!(cell.read().as_str(), "stable");
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let cell = ValueCell::new(0_u64);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        cell.update(|count| {
                            *count += 1;
                            Ok(())
                        })
                        .expect("update succeeds");
                    }
                });
            }
        });

        assert_eq!(*cell.read(), 800);
        assert_eq!(cell.version(), 800);
    }
}
