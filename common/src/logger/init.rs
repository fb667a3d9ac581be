use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `APP_ENV=production` or `LOG_FORMAT=json` selects JSON lines.
    pub fn from_env() -> Self {
        let production = std::env::var("APP_ENV").unwrap_or_default() == "production";
        let json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if production || json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    pub format: LogFormat,
    /// Append events to this file instead of stdout.
    pub file: Option<PathBuf>,
}

impl LogOptions {
    pub fn from_env() -> Self {
        Self {
            format: LogFormat::from_env(),
            file: std::env::var_os("LOG_FILE").map(PathBuf::from),
        }
    }
}

/// Installs the global subscriber once. Later calls are no-ops.
///
/// If the log file cannot be opened, logging falls back to stdout and the
/// failure is reported as the first event.
pub fn init_logger(service_name: &'static str, opts: &LogOptions) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let file = opts.file.as_ref().map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| (path.clone(), e))
        });

        let (file, file_err) = match file {
            Some(Ok(f)) => (Some(f), None),
            Some(Err(err)) => (None, Some(err)),
            None => (None, None),
        };

        let base = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        match (opts.format, file) {
            (LogFormat::Json, Some(f)) => tracing_subscriber::registry()
                .with(filter)
                .with(base.json().with_ansi(false).with_writer(Mutex::new(f)))
                .init(),
            (LogFormat::Json, None) => tracing_subscriber::registry()
                .with(filter)
                .with(base.json())
                .init(),
            (LogFormat::Pretty, Some(f)) => tracing_subscriber::registry()
                .with(filter)
                .with(base.with_ansi(false).with_writer(Mutex::new(f)))
                .init(),
            (LogFormat::Pretty, None) => tracing_subscriber::registry()
                .with(filter)
                .with(base.pretty())
                .init(),
        }

        if let Some((path, err)) = file_err {
            tracing::warn!(path = %path.display(), error = %err, "log file unavailable; using stdout");
        }

        tracing::info!(service = service_name, "logger initialized");
    });
}
