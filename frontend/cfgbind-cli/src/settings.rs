use std::collections::HashMap;
use std::time::Duration;

use cfgbind_core::{record, text_field, DecodeError, TextDecode};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl TextDecode for LogLevel {
    fn decode_text(&mut self, text: &str) -> Result<(), DecodeError> {
        *self = match text.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            other => return Err(format!("unknown log level '{other}'").into()),
        };
        Ok(())
    }
}

text_field!(LogLevel);

#[derive(Debug, Clone, Default, Serialize)]
pub struct Runtime {
    pub workers: usize,
    #[serde(serialize_with = "duration_text")]
    pub shutdown_grace: Duration,
    pub log_level: LogLevel,
}
record!(Runtime {
    workers,
    shutdown_grace,
    log_level,
});

#[derive(Debug, Clone, Default, Serialize)]
pub struct Replica {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}
record!(Replica { host, port, weight });

#[derive(Debug, Clone, Default, Serialize)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
    #[serde(serialize_with = "duration_text")]
    pub connect_timeout: Duration,
    pub replicas: HashMap<String, Replica>,
}
record!(Database {
    url,
    pool_size = "pool",
    connect_timeout,
    replicas,
});

#[derive(Debug, Clone, Default, Serialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}
record!(Tls { cert_path, key_path });

#[derive(Debug, Clone, Default, Serialize)]
pub struct Listener {
    pub bind: String,
    pub port: u16,
    pub tls: Option<Tls>,
}
record!(Listener { bind, port, tls });

/// The record the CLI binds unless `--open` is given.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceSettings {
    pub name: String,
    #[serde(flatten)]
    pub runtime: Runtime,
    pub database: Database,
    pub listeners: HashMap<String, Listener>,
    pub labels: HashMap<String, String>,
    pub origins: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub api_token: String,
}
record!(ServiceSettings {
    name,
    #[embed] runtime,
    database = "db",
    listeners,
    labels,
    origins = "allowed_origins",
    started_at,
    api_token = "-",
});

fn duration_text<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{duration:?}"))
}
