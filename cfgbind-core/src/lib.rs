//! Binds a record or an open map to a configuration store and keeps it in
//! sync with dotted-key updates.
//!
//! Readers take immutable snapshots without locking; writers clone the
//! current snapshot, apply their keys and publish the result in one swap.

pub mod error;
pub mod logging;
pub mod record;
pub mod store;
pub mod value;

pub use error::{Error, Result};
pub use record::{
    apply_key, key_paths, FieldAccess, FieldDescriptor, Record, RecordDescriptor,
    RecordDescriptorBuilder, EMBED_ALIAS, KEY_SEPARATOR, SKIP_TAG,
};
pub use serde_json::Value;
pub use store::{
    Binding, BoundValue, ConfigStore, KeyValidator, OpenMap, StrictKeys, ValueCell,
};
pub use value::{parse_duration, to_text, CastError, Coerce, DecodeError, Field, TextDecode};
