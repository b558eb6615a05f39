use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, writing to stderr so stdout stays
/// free for command output. `RUST_LOG` overrides `default_level`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn second_install_is_refused() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }
}
