use crate::record::{Record, KEY_SEPARATOR};

/// Every leaf key path reachable from `R`'s shape, in declaration order.
///
/// Nested records contribute their own leaves under `alias.`; embedded
/// records contribute theirs without a prefix. Maps, optional records and
/// scalars are leaves. Fields tagged `-` are left out along with everything
/// beneath them.
pub fn key_paths<R: Record>() -> Vec<String> {
    collect_key_paths::<R>("")
}

pub(crate) fn collect_key_paths<R: Record>(prefix: &str) -> Vec<String> {
    let mut probe = R::default();
    let mut keys = Vec::new();

    for field in R::descriptor().fields() {
        if field.is_skipped() {
            continue;
        }

        let child_prefix = if field.is_embedded() {
            prefix.to_owned()
        } else {
            format!("{prefix}{}{KEY_SEPARATOR}", field.alias())
        };

        match field.slot(&mut probe).nested_keys(&child_prefix) {
            Some(nested) => keys.extend(nested),
            None if field.is_embedded() => {
                keys.push(format!("{prefix}{}", field.name().to_lowercase()));
            }
            None => keys.push(format!("{prefix}{}", field.alias())),
        }
    }

    keys
}
