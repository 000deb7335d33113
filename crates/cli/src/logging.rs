#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "retag=info,rt_workflow=info";

/// Installs the stderr subscriber. An unparseable filter falls back to the
/// default one.
pub fn init(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|err| {
            eprintln!("retag: ignoring log filter {directives:?}: {err}");
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => EnvFilter::new(DEFAULT_FILTER),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
