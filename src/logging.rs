use env_logger::{Builder, Env};

/// Initializes `env_logger`, defaulting to `info` unless `RUST_LOG` is set.
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}
