//! Logging bootstrap

/// Initialize logging from the `RUST_LOG` environment, defaulting to info.
pub fn init() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
