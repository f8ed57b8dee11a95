use tracing_subscriber::EnvFilter;

/// Installs the diagnostics subscriber. Progress lines are printed
/// directly; this only carries `tracing` events.
///
/// `RUST_LOG` wins over the verbosity flag when it is set.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
