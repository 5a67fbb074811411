use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const LOG_ENV: &str = "CANTOLEARN_LOG";

/// Installs the stderr subscriber. `CANTOLEARN_LOG` wins over `verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
