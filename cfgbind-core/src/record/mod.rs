pub mod keys;
pub mod resolver;

pub use keys::key_paths;
pub use resolver::apply_key;

use crate::value::field::Field;

pub const KEY_SEPARATOR: &str = ".";
/// Tag value that keeps a field out of the strict key set.
pub const SKIP_TAG: &str = "-";
pub const EMBED_ALIAS: &str = ",embed";

/// A statically shaped config value whose fields are addressed by dotted keys.
///
/// Implementations return a descriptor that is built once and cached; the
/// [`record!`](crate::record) macro generates one from a field list.
pub trait Record: Clone + Default + Send + Sync + 'static {
    fn descriptor() -> &'static RecordDescriptor<Self>;
}

pub type FieldAccess<R> = for<'a> fn(&'a mut R) -> &'a mut dyn Field;

pub struct FieldDescriptor<R> {
    name: &'static str,
    tag: Option<&'static str>,
    embed: bool,
    alias: String,
    access: FieldAccess<R>,
}

impl<R> FieldDescriptor<R> {
    fn new(
        name: &'static str,
        tag: Option<&'static str>,
        embed: bool,
        access: FieldAccess<R>,
    ) -> Self {
        let alias = match tag {
            Some(tag) if !tag.is_empty() => tag.to_owned(),
            _ if embed => EMBED_ALIAS.to_owned(),
            _ => name.to_lowercase(),
        };
        Self {
            name,
            tag,
            embed,
            alias,
            access,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn is_embedded(&self) -> bool {
        self.embed
    }

    pub fn is_skipped(&self) -> bool {
        self.alias == SKIP_TAG
    }

    pub fn slot<'a>(&self, record: &'a mut R) -> &'a mut dyn Field {
        (self.access)(record)
    }

    /// Tags compare case-sensitively, field names case-insensitively.
    pub fn matches_exactly(&self, key: &str) -> bool {
        self.alias == key || self.name.eq_ignore_ascii_case(key)
    }

    /// The part of `key` left for this field's children, if the key runs
    /// through it. Embedded fields see the whole key.
    pub fn strip_prefix<'k>(&self, key: &'k str) -> Option<&'k str> {
        if self.embed {
            return Some(key);
        }
        if let Some(rest) = key
            .strip_prefix(self.alias.as_str())
            .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        {
            return Some(rest);
        }

        let head = key.get(..self.name.len())?;
        if !head.eq_ignore_ascii_case(self.name) {
            return None;
        }
        key.get(self.name.len()..)?.strip_prefix(KEY_SEPARATOR)
    }
}

impl<R> std::fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("embed", &self.embed)
            .field("alias", &self.alias)
            .finish()
    }
}

#[derive(Debug)]
pub struct RecordDescriptor<R> {
    fields: Vec<FieldDescriptor<R>>,
}

impl<R> RecordDescriptor<R> {
    pub fn builder() -> RecordDescriptorBuilder<R> {
        RecordDescriptorBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub struct RecordDescriptorBuilder<R> {
    fields: Vec<FieldDescriptor<R>>,
}

impl<R> RecordDescriptorBuilder<R> {
    pub fn field(mut self, name: &'static str, access: FieldAccess<R>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, None, false, access));
        self
    }

    pub fn tagged(mut self, name: &'static str, tag: &'static str, access: FieldAccess<R>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, Some(tag), false, access));
        self
    }

    pub fn embedded(mut self, name: &'static str, access: FieldAccess<R>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, None, true, access));
        self
    }

    pub fn build(self) -> RecordDescriptor<R> {
        RecordDescriptor {
            fields: self.fields,
        }
    }
}

/// Implements [`Record`] for a struct from its field list.
///
/// ```
/// use cfgbind_core::record;
///
/// #[derive(Clone, Default)]
/// struct Common {
///     region: String,
/// }
/// record!(Common { region });
///
/// #[derive(Clone, Default)]
/// struct Server {
///     host: String,
///     port: u16,
///     common: Common,
///     token: String,
/// }
/// record!(Server {
///     host,
///     port = "listen_port",
///     #[embed] common,
///     token = "-",
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($fields:tt)* }) => {
        impl $crate::Record for $ty {
            fn descriptor() -> &'static $crate::RecordDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::RecordDescriptor<$ty>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::record!(@build $crate::RecordDescriptor::<$ty>::builder(); $($fields)*)
                })
            }
        }
    };
    (@build $builder:expr; ) => {
        $builder.build()
    };
    (@build $builder:expr; #[embed] $field:ident $(, $($rest:tt)*)?) => {
        $crate::record!(
            @build $builder.embedded(stringify!($field), |record| &mut record.$field);
            $($($rest)*)?
        )
    };
    (@build $builder:expr; $field:ident = $tag:literal $(, $($rest:tt)*)?) => {
        $crate::record!(
            @build $builder.tagged(stringify!($field), $tag, |record| &mut record.$field);
            $($($rest)*)?
        )
    };
    (@build $builder:expr; $field:ident $(, $($rest:tt)*)?) => {
        $crate::record!(
            @build $builder.field(stringify!($field), |record| &mut record.$field);
            $($($rest)*)?
        )
    };
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordDescriptor, EMBED_ALIAS};

    #[derive(Debug, Clone, Default)]
    struct Inner {
        zone: String,
    }
    crate::record!(Inner { zone });

    #[derive(Debug, Clone, Default)]
    struct Outer {
        max_conns: u32,
        host: String,
        inner: Inner,
        hidden: String,
    }
    crate::record!(Outer {
        max_conns,
        host = "Address",
        #[embed] inner,
        hidden = "-",
    });

    #[test]
    fn aliases_come_from_tags_names_or_embedding() {
        let fields = Outer::descriptor().fields();
        let aliases: Vec<&str> = fields.iter().map(|field| field.alias()).collect();
        assert_eq!(aliases, vec!["max_conns", "Address", EMBED_ALIAS, "-"]);
        assert!(fields[3].is_skipped());
        assert!(fields[2].is_embedded());
    }

    #[test]
    fn descriptor_is_built_once() {
        let first: *const RecordDescriptor<Outer> = Outer::descriptor();
        let second: *const RecordDescriptor<Outer> = Outer::descriptor();
        assert_eq!(first, second);
    }

    #[test]
    fn exact_match_uses_tag_or_name() {
        let descriptor = Outer::descriptor();
        let host = descriptor.field("host").expect("host field");
        assert!(host.matches_exactly("Address"));
        assert!(!host.matches_exactly("address"));
        assert!(host.matches_exactly("HOST"));

        let conns = descriptor.field("max_conns").expect("max_conns field");
        assert!(conns.matches_exactly("Max_Conns"));
    }

    #[test]
    fn prefix_match_strips_the_matched_segment() {
        let descriptor = Outer::descriptor();
        let host = descriptor.field("host").expect("host field");
        assert_eq!(host.strip_prefix("Address.port"), Some("port"));
        assert_eq!(host.strip_prefix("HOST.port"), Some("port"));
        assert_eq!(host.strip_prefix("hostname"), None);
        assert_eq!(host.strip_prefix("Address"), None);

        let inner = descriptor.field("inner").expect("inner field");
        assert_eq!(inner.strip_prefix("zone"), Some("zone"));
    }

    #[test]
    fn slot_reaches_the_declared_field() {
        let mut outer = Outer::default();
        let descriptor = Outer::descriptor();
        let field = descriptor.field("max_conns").expect("max_conns field");
        field
            .slot(&mut outer)
            .coerce_from(&serde_json::json!("12"))
            .expect("coerces");
        assert_eq!(outer.max_conns, 12);
    }
}
