//! Logging Infrastructure
//!
//! Structured logging shared by every service:
//! - Console output, pretty in development and JSON in production
//! - Optional daily rotating application logs (deleted after 14 days)
//! - Permanent audit and security logs (never deleted)

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, prelude::*};

/// Days an application log file is kept
const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Remove application log files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // app.YYYY-MM-DD
        if let Some(date_part) = name.strip_prefix("app.")
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(())
}

fn file_layer(dir: &Path, prefix: &str, json_format: bool, target: Option<&'static str>) -> BoxedLayer {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, prefix);
    let writer = std::sync::Mutex::new(appender);

    // Application file takes everything except the audit/security targets
    let filter = filter_fn(move |meta| match target {
        Some(t) => meta.target() == t,
        None => meta.target() != "audit" && meta.target() != "security",
    });

    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed()
    }
}

/// Initialize logging
///
/// # Arguments
/// * `level` - default filter (e.g. "info"), overridden by `RUST_LOG`
/// * `json_format` - JSON console output (production) instead of pretty
/// * `log_dir` - directory for file logs, console only when `None`
///
/// ```no_run
/// shared::logger::init_logger("debug", false, None)?;
/// shared::logger::init_logger("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        for sub in ["app", "audit", "security"] {
            fs::create_dir_all(log_dir.join(sub))?;
        }

        layers.push(file_layer(&log_dir.join("app"), "app", json_format, None));
        layers.push(file_layer(&log_dir.join("audit"), "audit", json_format, Some("audit")));
        layers.push(file_layer(
            &log_dir.join("security"),
            "security",
            json_format,
            Some("security"),
        ));

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Runs hourly
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Audit log helper - records business operations that change money state
///
/// ```ignore
/// shared::audit_log!("buyer:12", "cod_confirm", "order:42");
/// shared::audit_log!("buyer:12", "cod_confirm", "order:42", "COD payment verified");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($actor:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            "AUDIT"
        );
    };
    ($actor:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            details = $details,
            "AUDIT"
        );
    };
}

/// Security log helper - records rejected credentials and permission checks
///
/// ```ignore
/// shared::security_log!(WARN, "token_rejected", reason = "expired");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(target: "security", event = $event, $($arg)*);
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(target: "security", event = $event, $($arg)*);
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: "security", event = $event, $($arg)*);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_expired_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let old = chrono::Local::now().date_naive() - chrono::Duration::days(30);
        let recent = chrono::Local::now().date_naive();
        let old_file = app.join(format!("app.{}", old.format("%Y-%m-%d")));
        let recent_file = app.join(format!("app.{}", recent.format("%Y-%m-%d")));
        let other_file = app.join("notes.txt");
        for f in [&old_file, &recent_file, &other_file] {
            fs::write(f, b"x").unwrap();
        }

        cleanup_old_logs(dir.path()).unwrap();

        assert!(!old_file.exists());
        assert!(recent_file.exists());
        assert!(other_file.exists());
    }

    #[test]
    fn test_cleanup_without_app_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cleanup_old_logs(dir.path()).is_ok());
    }
}
