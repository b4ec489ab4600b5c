pub mod config;
pub mod db;
pub mod models;
pub mod services;

use env_logger::Env;

/// Initialise the global logger, defaulting to `info` unless `RUST_LOG` says otherwise.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();
}
