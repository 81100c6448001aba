use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "gas_induction=info";

/// Filter from `RUST_LOG`, or `gas_induction=info` when it is unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log to stderr through [`env_filter`].
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
