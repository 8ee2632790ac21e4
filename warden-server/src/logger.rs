//! Logging Infrastructure
//!
//! `RUST_LOG` overrides the default filter. With a log directory the
//! output goes to a daily rolling file instead of stdout.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warden_server=info,tower_http=info";

/// Initialize the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process, dropping
/// it flushes and stops the file writer.
pub fn init_logger(json: bool, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false);

    let Some(dir) = log_dir else {
        if json {
            builder.json().try_init().map_err(anyhow::Error::msg)?;
        } else {
            builder.try_init().map_err(anyhow::Error::msg)?;
        }
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        dir,
        "warden-server.log",
    ));
    let builder = builder.with_writer(writer).with_ansi(false);
    if json {
        builder.json().try_init().map_err(anyhow::Error::msg)?;
    } else {
        builder.try_init().map_err(anyhow::Error::msg)?;
    }
    Ok(Some(guard))
}
