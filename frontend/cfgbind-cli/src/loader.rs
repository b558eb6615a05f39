use std::collections::BTreeMap;
use std::path::Path;

use cfgbind_core::{Error, Result, Value, KEY_SEPARATOR};

/// Reads a TOML, YAML or JSON settings file into dotted keys.
pub fn load_file(path: &Path) -> Result<BTreeMap<String, Value>> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    let document = match extension.as_deref() {
        Some("toml") => {
            let table: toml::Table = toml::from_str(&content).map_err(|err| {
                Error::Config(format!("failed to parse '{}': {err}", path.display()))
            })?;
            toml_to_json(toml::Value::Table(table))
        }
        Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|err| {
            Error::Config(format!("failed to parse '{}': {err}", path.display()))
        })?,
        Some("json") => serde_json::from_str(&content)?,
        _ => {
            return Err(Error::Config(format!(
                "unsupported settings file '{}', expected .toml, .yaml or .json",
                path.display()
            )))
        }
    };

    if !document.is_object() {
        return Err(Error::Config(format!(
            "settings file '{}' must hold a table at the top level",
            path.display()
        )));
    }

    let mut keys = BTreeMap::new();
    flatten("", document, &mut keys);
    tracing::debug!(path = %path.display(), count = keys.len(), "Loaded settings file");
    Ok(keys)
}

/// Flattens nested objects into dotted keys. Arrays and empty objects stay
/// whole.
pub fn flatten(prefix: &str, value: Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(object) if !object.is_empty() => {
            for (key, child) in object {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}{KEY_SEPARATOR}{key}")
                };
                flatten(&path, child, out);
            }
        }
        leaf => {
            out.insert(prefix.to_owned(), leaf);
        }
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(number) => Value::from(number),
        toml::Value::Float(number) => Value::from(number),
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use serde_json::json;

    use super::{flatten, load_file};

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cfgbind-{}-{name}", std::process::id()));
        std::fs::write(&path, content).expect("temp file is writable");
        path
    }

    #[test]
    fn nested_objects_become_dotted_keys() {
        let mut keys = BTreeMap::new();
        flatten(
            "",
            json!({"db": {"pool": 4, "replicas": {"r1": {"host": "a"}}}, "origins": ["x"], "extra": {}}),
            &mut keys,
        );

        assert_eq!(keys.get("db.pool"), Some(&json!(4)));
        assert_eq!(keys.get("db.replicas.r1.host"), Some(&json!("a")));
        assert_eq!(keys.get("origins"), Some(&json!(["x"])));
        assert_eq!(keys.get("extra"), Some(&json!({})));
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn toml_files_are_flattened() {
        let path = write_temp(
            "settings.toml",
            "name = \"billing\"\nstarted_at = 2024-05-01T10:00:00Z\n\n[db]\npool = 8\n",
        );
        let keys = load_file(&path).expect("toml loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(keys.get("name"), Some(&json!("billing")));
        assert_eq!(keys.get("db.pool"), Some(&json!(8)));
        assert_eq!(keys.get("started_at"), Some(&json!("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn yaml_files_are_flattened() {
        let path = write_temp(
            "settings.yaml",
            "db:\n  replicas:\n    r1:\n      port: 5433\nallowed_origins: [a, b]\n",
        );
        let keys = load_file(&path).expect("yaml loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(keys.get("db.replicas.r1.port"), Some(&json!(5433)));
        assert_eq!(keys.get("allowed_origins"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn json_files_must_hold_an_object() {
        let path = write_temp("list.json", "[1, 2]");
        let result = load_file(&path);
        std::fs::remove_file(&path).ok();
        result.expect_err("arrays are not settings");
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let path = write_temp("settings.ini", "a=1");
        let result = load_file(&path);
        std::fs::remove_file(&path).ok();
        result.expect_err("ini is not supported");
    }
}
