//! Logger setup shared by the tools and the tests.
//!
//! Verbosity is controlled with `RUST_LOG`, e.g. `RUST_LOG=mapio_map=debug`.

use log::LevelFilter;

/// Installs `env_logger` for a binary. Defaults to `info` if `RUST_LOG` is
/// unset. Calling it twice is harmless.
pub fn init() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// Installs `env_logger` for a test, routing output through the test
/// harness so it is only shown for failing tests.
pub fn init_test() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .is_test(true)
        .try_init();
}
