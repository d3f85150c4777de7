use color_eyre::Result;
use std::{fs::create_dir_all, path::PathBuf};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "bunyan")]
const APP_NAME: &str = "yt-reply-bot";
const LOG_FILE: &str = "yt-reply-bot.log";

fn log_file() -> Result<RollingFileAppender> {
    let log_dir_path = PathBuf::from(".logs");
    create_dir_all(&log_dir_path)?;

    Ok(if cfg!(debug_assertions) {
        rolling::daily(log_dir_path, LOG_FILE)
    } else {
        rolling::never(log_dir_path, LOG_FILE)
    })
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stdout and to `.logs/`, filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is already set.
#[cfg(not(feature = "bunyan"))]
pub fn setup_logger() -> Result<()> {
    let logfile = log_file()?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(logfile))
        .try_init()?;

    Ok(())
}

/// Log to stdout and, as Bunyan JSON, to `.logs/`.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is already set.
#[cfg(feature = "bunyan")]
pub fn setup_logger() -> Result<()> {
    use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};

    let logfile = log_file()?;
    let formatter = BunyanFormattingLayer::new(APP_NAME.into(), logfile);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .with(JsonStorageLayer)
        .with(formatter)
        .try_init()?;

    Ok(())
}
