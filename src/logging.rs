use log::LevelFilter;

/// Configure `env_logger` for the binary. `RUST_LOG` overrides the info default.
pub fn init_logging() {
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init()
}

/// Debug-level logging captured by the test harness; safe to call repeatedly.
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .try_init();
}
