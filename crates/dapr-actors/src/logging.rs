use anyhow::Result;
use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directives for `level`, keeping noisy HTTP internals at warn
pub fn filter_directives(level: &tracing::Level) -> String {
    format!(
        "{},dapr_actors={},dapr_actors_cli={},hyper={},reqwest={}",
        level.as_str(),
        level.as_str(),
        level.as_str(),
        "warn",
        "warn"
    )
}

/// Install the global subscriber.
///
/// Events go to stderr, and to `log_path` as well when one is given. The file
/// is truncated on every start.
pub fn setup_global_logging(
    log_path: Option<&Path>,
    log_level: &tracing::Level,
    with_ansi: bool,
) -> Result<()> {
    let filter = filter_directives(log_level);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(with_ansi)
        .with_filter(EnvFilter::builder().parse(&filter)?);

    let file_layer = match log_path {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let file = File::create(log_path)?;
            let file_writer = std::sync::Mutex::new(file).with_max_level(tracing::Level::TRACE);

            Some(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(EnvFilter::builder().parse(&filter)?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
