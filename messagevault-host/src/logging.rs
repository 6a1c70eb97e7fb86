use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MESSAGEVAULT_LOG";
const DEFAULT_DIRECTIVES: &str = "messagevault_host=debug,messagevault_core=debug,warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Host mode: stdout carries native-messaging frames, so logs append to
/// `log_file`, or go to stderr when the file cannot be opened.
pub fn init_host_logging(log_file: &Path) {
    if let Some(parent) = log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter())
                .with_target(true)
                .init();
        }
        Err(err) => {
            init_cli_logging();
            tracing::warn!(path = %log_file.display(), "cannot open log file: {err}");
        }
    }
}

pub fn init_cli_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter())
        .compact()
        .init();
}
