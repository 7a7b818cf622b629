use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive for the rest of the process.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "bang_redirect.log";

/// Build the level filter. Without debug logging the level is forced to
/// `info` so a stray `RUST_LOG` in the environment does not turn on verbose
/// output; with debug logging `RUST_LOG` may override the `debug` default.
fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Initialise logging.
///
/// Log lines go to stderr, or to `log_file` when one is given, so that stdout
/// stays free for redirect targets printed by the CLI. Calling this more than
/// once is harmless; only the first subscriber is installed.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let filter = env_filter(debug);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
