use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "cfgbind",
    about = "Bind service settings to a config store and print the result"
)]
pub struct Cli {
    /// TOML, YAML or JSON file whose tables are flattened into dotted keys.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Extra assignment applied after the file; VALUE is read as JSON when it parses.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub assignments: Vec<(String, Value)>,

    /// Bind an open map instead of the service settings record.
    #[arg(long, conflicts_with = "strict")]
    pub open: bool,

    /// Bind strictly and reject keys outside the record's key set.
    #[arg(long)]
    pub strict: bool,

    /// Print the record's strict key set and exit.
    #[arg(long)]
    pub keys: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    #[arg(long, env = "CFGBIND_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_assignment(input: &str) -> Result<(String, Value), String> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::{parse_assignment, Cli, OutputFormat};

    #[test]
    fn assignment_values_are_json_when_they_parse() {
        assert_eq!(
            parse_assignment("db.pool=8").expect("valid"),
            ("db.pool".to_owned(), json!(8))
        );
        assert_eq!(
            parse_assignment("allowed_origins=[\"a\",\"b\"]").expect("valid"),
            ("allowed_origins".to_owned(), json!(["a", "b"]))
        );
        assert_eq!(
            parse_assignment("name=billing-api").expect("valid"),
            ("name".to_owned(), json!("billing-api"))
        );
        assert_eq!(
            parse_assignment("labels.note=a=b").expect("valid"),
            ("labels.note".to_owned(), json!("a=b"))
        );
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        parse_assignment("no-separator").expect_err("separator is required");
        parse_assignment(" =1").expect_err("key is required");
    }

    #[test]
    fn open_and_strict_conflict() {
        Cli::try_parse_from(["cfgbind", "--open", "--strict"])
            .expect_err("open maps cannot bind strictly");

        let cli = Cli::try_parse_from(["cfgbind", "--set", "name=x", "--output", "text"])
            .expect("valid arguments");
        assert_eq!(cli.assignments.len(), 1);
        assert_eq!(cli.output, OutputFormat::Text);
    }
}
