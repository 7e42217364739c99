//! File logging for TimeClock core.
//!
//! # Responsibility
//! - Start one size-rotated `flexi_logger` file writer per process.
//! - Record panics as single-line `panic_captured` events.
//!
//! # Invariants
//! - A second `init_logging` with the same settings is a no-op; different
//!   settings are an error, never a silent switch.
//! - Nothing in this module panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::PathBuf;

const LOG_BASENAME: &str = "timeclock";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Validated `init_logging` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: LevelFilter,
    dir: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        let level = match level.trim().to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            other => {
                return Err(format!(
                    "unsupported log level `{other}`; expected trace|debug|info|warn|error"
                ))
            }
        };

        let dir = log_dir.trim();
        if dir.is_empty() {
            return Err("log directory must not be empty".to_string());
        }
        let dir = PathBuf::from(dir);
        if !dir.is_absolute() {
            return Err(format!(
                "log directory must be absolute, got `{}`",
                dir.display()
            ));
        }
        Ok(Self { level, dir })
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn accept(&self, requested: &LogSettings) -> Result<(), String> {
        if self.settings == *requested {
            return Ok(());
        }
        Err(format!(
            "logging already running with level `{}` in `{}`; refusing to switch to level `{}` in `{}`",
            level_name(self.settings.level),
            self.settings.dir.display(),
            level_name(requested.level),
            requested.dir.display()
        ))
    }
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unknown level, blank or relative directory.
/// - Logging already runs with other settings.
/// - The directory cannot be created or the writer fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogSettings::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(requested.clone()))?;
    active.accept(&requested)
}

/// Level and directory of the running logger, `None` before `init_logging`.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (level_name(active.settings.level), active.settings.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!(
            "cannot create log directory `{}`: {err}",
            settings.dir.display()
        )
    })?;

    let spec = LogSpecification::builder()
        .default(settings.level)
        .build();
    let handle = Logger::with(spec)
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    PANIC_HOOK.get_or_init(install_panic_hook);
    info!(
        "event=logging_init module=core status=ok version={} os={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        level_name(settings.level),
        settings.dir.display()
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            summarize_panic(panic_info.payload(), PANIC_SUMMARY_CHARS)
        );
        previous(panic_info);
    }));
}

/// One-line, length-capped rendering of a panic payload.
///
/// Payloads can echo customer names or job comments.
fn summarize_panic(payload: &(dyn Any + Send), max_chars: usize) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");

    let mut summary: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect();
    if text.chars().count() > max_chars {
        summary.push_str("...");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, summarize_panic, LogSettings};
    use log::LevelFilter;

    #[test]
    fn settings_accept_aliases_and_reject_bad_input() {
        let settings = LogSettings::parse(" WARNING ", "/var/log/timeclock").unwrap();
        assert_eq!(settings.level, LevelFilter::Warn);

        assert!(LogSettings::parse("verbose", "/tmp").is_err());
        assert!(LogSettings::parse("info", "logs/dev")
            .unwrap_err()
            .contains("absolute"));
        assert!(LogSettings::parse("info", "  ").unwrap_err().contains("empty"));
    }

    #[test]
    fn panic_summary_is_single_line_and_capped() {
        let payload: Box<dyn std::any::Any + Send> =
            Box::new("customer Acme\nsecret comment".to_string());
        let summary = summarize_panic(payload.as_ref(), 8);
        assert_eq!(summary, "customer...");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(
            summarize_panic(payload.as_ref(), 80),
            "non-string panic payload"
        );
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_other_settings() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_dir = first.path().to_str().unwrap().to_string();
        let second_dir = second.path().to_str().unwrap().to_string();

        init_logging("info", &first_dir).unwrap();
        init_logging("INFO", &first_dir).unwrap();

        assert!(init_logging("debug", &first_dir)
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_logging("info", &second_dir)
            .unwrap_err()
            .contains("refusing to switch"));

        let (level, dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(dir, first.path());
    }
}
