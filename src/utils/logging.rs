use anyhow::Context;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Used when `RUST_LOG` is unset
    pub default_level: String,
    /// Session log file, recreated on every start
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

/// Initialize logging: console layer, optional file layer, panic hook
pub fn init_logging(options: LogOptions) -> anyhow::Result<()> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| options.default_level.clone());
    let enable_backtrace = env::var("RUST_BACKTRACE").unwrap_or_else(|_| "0".to_string()) == "1";

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log_level)
            .with_context(|| format!("invalid log level {:?}", log_level))?
            .add_directive("emote_overlay=debug".parse()?),
    };

    let file_layer = match &options.file {
        Some(path) => {
            // Remove the previous session's log
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    eprintln!("Warning: Failed to remove existing {}: {}", path.display(), e);
                }
            }
            let log_file = fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(log_file)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false), // No ANSI codes in file
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(options.ansi),
        )
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            tracing::error!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        if enable_backtrace {
            tracing::error!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
        }
    }));

    tracing::info!("Logging initialized with level: {}", log_level);
    if let Some(path) = &options.file {
        tracing::info!("File logging enabled: {} (session-based, cleaned on startup)", path.display());
    }
    Ok(())
}

/// Log system information for debugging
pub fn log_system_info() {
    tracing::info!("=== System Information ===");
    tracing::info!("OS: {}", std::env::consts::OS);
    tracing::info!("Architecture: {}", std::env::consts::ARCH);
    tracing::info!("{} {}", crate::APP_NAME, crate::VERSION);
    tracing::info!("========================");
}
