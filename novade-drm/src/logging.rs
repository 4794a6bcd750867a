//! Logging setup for processes embedding the DRM layer.
//!
//! The crate itself only emits `tracing` events. These helpers install a
//! subscriber for binaries and tests that do not bring their own: a console
//! layer plus an optional daily-rolling file layer, in text or JSON format.

use crate::config::LoggingConfig;
use crate::error::{DrmError, LoggingError};

use once_cell::sync::Lazy;
use std::fs;
use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the file writer's guard alive so buffered lines are flushed.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Initializes a minimal stderr subscriber filtered by `RUST_LOG` (default "info").
///
/// Errors (e.g. a global subscriber is already set) are ignored.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

fn level_filter(level: &str) -> Result<String, LoggingError> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        invalid => {
            return Err(LoggingError::InitializationFailure(format!(
                "Invalid log level in config: {}",
                invalid
            )))
        }
    };
    Ok(level.to_string())
}

fn env_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::FilterError(e.to_string()))
}

/// Creates the file layer and its guard. The parent directory is created if needed.
fn create_file_layer(log_path: &Path, format: &str) -> Result<(BoxedLayer, WorkerGuard), LoggingError> {
    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory)?;

    let file_name = log_path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("novade-drm.log"));
    let file_appender = tracing_appender::rolling::daily(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let layer: BoxedLayer = match format.to_lowercase().as_str() {
        "json" => fmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
        _ => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

fn store_guard(guard: Option<WorkerGuard>) {
    match LOG_WORKER_GUARD.lock() {
        Ok(mut slot) => *slot = guard,
        Err(e) => eprintln!("[ERROR] Failed to lock log guard slot: {}. Log flushing may be affected.", e),
    }
}

/// Installs the global subscriber described by `config`.
///
/// With `is_reload` set, failing to replace an already installed subscriber
/// is not an error. The file writer of the installed subscriber keeps running;
/// the file named in `config` is not written to.
///
/// # Errors
///
/// [`LoggingError::InitializationFailure`] for an invalid level or, on first
/// initialization, when a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig, is_reload: bool) -> Result<(), DrmError> {
    let filter = level_filter(&config.level)?;
    let json = config.format.eq_ignore_ascii_case("json");

    let stdout_layer: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(stdout)
            .with_ansi(false)
            .with_filter(env_filter(&filter)?)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(stdout)
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_filter(env_filter(&filter)?)
            .boxed()
    };

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer];
    let mut new_guard = None;
    if let Some(log_path) = &config.file_path {
        let (file_layer, guard) = create_file_layer(log_path, &config.format)?;
        layers.push(file_layer.with_filter(env_filter(&filter)?).boxed());
        new_guard = Some(guard);
    }

    let result = Registry::default().with(layers).try_init();

    match result {
        Ok(()) => {
            store_guard(new_guard);
            Ok(())
        }
        // The installed subscriber still writes through the stored guard; `new_guard`
        // belongs to layers that were never installed and is dropped here.
        Err(e) if is_reload => {
            eprintln!("[INFO] Logging re-initialization kept the previous subscriber: {}", e);
            Ok(())
        }
        Err(e) => Err(LoggingError::InitializationFailure(format!(
            "Failed to set global tracing subscriber. Was it already initialized? Error: {}",
            e
        ))
        .into()),
    }
}
