//! Logging setup

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// `RUST_LOG` wins over `default_filter`. Safe to call repeatedly; only the
/// first call in a process installs the logger, and a logger installed by
/// the host is left alone.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        debug!("logger initialized with default filter '{default_filter}'");
    }
}
