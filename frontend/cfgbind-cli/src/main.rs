mod cli;
mod loader;
mod renderer;
mod settings;

use std::collections::BTreeMap;
use std::sync::Arc;

use cfgbind_core::{key_paths, Binding, BoundValue, ConfigStore, OpenMap, StrictKeys, Value};
use serde::Serialize;

use crate::renderer::Renderer;
use crate::settings::ServiceSettings;

fn main() {
    if let Err(error) = run() {
        eprintln!("cfgbind failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> cfgbind_core::Result<()> {
    let args = cli::Cli::parse_args();
    cfgbind_core::logging::init_tracing(&args.log_level);
    let renderer = Renderer::new(args.output);

    if args.keys {
        return renderer.render_keys(&key_paths::<ServiceSettings>());
    }

    let mut batch = match &args.file {
        Some(path) => loader::load_file(path)?,
        None => BTreeMap::new(),
    };
    batch.extend(args.assignments);

    let strict = Arc::new(StrictKeys::new());
    let store = ConfigStore::with_key_validator(strict.clone());

    if args.open {
        let binding = store.bind::<OpenMap>();
        apply_batch(&store, batch)?;
        return render_binding(&renderer, &binding);
    }

    let binding = if args.strict {
        let binding = store.bind_strict::<ServiceSettings>()?;
        reject_unknown_keys(&strict, &batch)?;
        binding
    } else {
        store.bind::<ServiceSettings>()
    };
    apply_batch(&store, batch)?;
    render_binding(&renderer, &binding)
}

fn apply_batch(store: &ConfigStore, batch: BTreeMap<String, Value>) -> cfgbind_core::Result<()> {
    for key in store.set_values(batch)? {
        tracing::warn!(key = %key, "Config key matched no setting");
    }
    Ok(())
}

fn reject_unknown_keys(
    strict: &StrictKeys,
    batch: &BTreeMap<String, Value>,
) -> cfgbind_core::Result<()> {
    let unknown: Vec<&str> = batch
        .keys()
        .filter(|key| !strict.allows(key))
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(cfgbind_core::Error::Config(format!(
        "unknown config keys: {}",
        unknown.join(", ")
    )))
}

fn render_binding<V>(renderer: &Renderer, binding: &Binding<V>) -> cfgbind_core::Result<()>
where
    V: BoundValue + Serialize,
{
    let snapshot = binding.value();
    renderer.render_snapshot(serde_json::to_value(&*snapshot)?)
}
