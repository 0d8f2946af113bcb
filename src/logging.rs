//! Log routing for the server and the CLI.
//!
//! Every event goes to stdout and to a log file. Pipeline runs tag their events with the run id
//! and document fingerprint, so one file can hold many interleaved runs. The file sink is
//! non-blocking, which keeps chunk workers off the disk path.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "PDF_DIGEST_LOG_FILE";
const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "pdf-digest.log";

/// Install the global subscriber. Call once, before anything else logs.
///
/// `.env` is read first so `RUST_LOG` and `PDF_DIGEST_LOG_FILE` may live there. The filter
/// falls back to `info`. Without `PDF_DIGEST_LOG_FILE` the file sink is `logs/pdf-digest.log`.
pub fn init_tracing() {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match open_log_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Open the file sink; `None` leaves logging on stdout only.
fn open_log_writer() -> Option<NonBlocking> {
    let (writer, guard) = match std::env::var(LOG_FILE_ENV) {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            std::fs::create_dir_all(LOG_DIR)
                .map_err(|err| eprintln!("Failed to create {LOG_DIR} directory: {err}"))
                .ok()?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(LOG_DIR, LOG_FILE_NAME))
        }
    };
    // The guard flushes the worker on drop; it must live as long as the process.
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
