use std::collections::BTreeMap;

use cfgbind_core::{Result, Value};

use crate::cli::OutputFormat;
use crate::loader::flatten;

pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    pub fn render_snapshot(&self, snapshot: Value) -> Result<()> {
        println!("{}", self.format_snapshot(snapshot)?);
        Ok(())
    }

    fn format_snapshot(&self, snapshot: Value) -> Result<String> {
        match self.output_format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&snapshot)?),
            OutputFormat::Text => {
                let mut keys = BTreeMap::new();
                flatten("", snapshot, &mut keys);
                let lines: Vec<String> = keys
                    .into_iter()
                    .map(|(key, value)| format!("{key} = {value}"))
                    .collect();
                Ok(lines.join("\n"))
            }
        }
    }

    pub fn render_keys(&self, keys: &[String]) -> Result<()> {
        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(keys)?),
            OutputFormat::Text => {
                for key in keys {
                    println!("{key}");
                }
            }
        }
        Ok(())
    }
}
