//! Logging setup
//!
//! Console output always; a size-rotated log file when the configuration
//! has a `logging` section.

use anyhow::{Context, Result};
use backstop_core::config::LoggingSettings;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber
///
/// `--debug` forces debug level; otherwise `RUST_LOG` applies, falling
/// back to info. The returned guard flushes the file writer on drop and
/// must live until the program ends.
pub fn init(debug: bool, file: Option<&LoggingSettings>) -> Result<Option<WorkerGuard>> {
    let filter = if debug {
        EnvFilter::new("backstop=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "backstop=info".into())
    };

    let (file_layer, guard) = match file {
        Some(settings) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(settings)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if debug {
        tracing::debug!("Run in debug mode");
    }

    Ok(guard)
}

/// Size-rotated log file: `file`, `file.1` ... `file.{backup_count}`
fn file_appender(settings: &LoggingSettings) -> Result<FileRotate<AppendCount>> {
    settings
        .file
        .file_name()
        .context("logging.file must name a file")?;
    if let Some(dir) = settings.file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }

    Ok(FileRotate::new(
        &settings.file,
        AppendCount::new(settings.backup_count.max(1)),
        ContentLimit::Bytes(settings.max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_rotates_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logs").join("backstop.log");
        let settings = LoggingSettings {
            file: file.clone(),
            max_bytes: 10,
            backup_count: 2,
        };

        let mut appender = file_appender(&settings).unwrap();
        appender.write_all(b"0123456789abcdefghij01234").unwrap();
        appender.flush().unwrap();

        assert!(file.exists());
        assert!(dir.path().join("logs").join("backstop.log.1").exists());
        assert!(!dir.path().join("logs").join("backstop.log.3").exists());
    }

    #[test]
    fn test_file_must_be_named() {
        let settings = LoggingSettings {
            file: "/".into(),
            max_bytes: 10,
            backup_count: 2,
        };
        assert!(file_appender(&settings).is_err());
    }
}
