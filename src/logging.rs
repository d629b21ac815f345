//! Debug logging to a rotating temp file.
//!
//! The conversation loop owns stdout for transcript echoes, so diagnostics go
//! to a side file instead. Lines that carry user speech or model replies are
//! written only when content logging is explicitly enabled.

use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;

static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static WRITER: OnceLock<Mutex<Option<LogWriter>>> = OnceLock::new();

/// Path of the rotating debug log.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("voxchat_debug.log")
}

/// Path of the crash log (metadata only).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("voxchat_crash.log")
}

struct LogWriter {
    path: PathBuf,
    file: fs::File,
    bytes_written: u64,
}

impl LogWriter {
    fn open(path: PathBuf) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > LOG_MAX_BYTES {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            bytes_written,
        })
    }

    fn write_line(&mut self, line: &str) {
        if self.bytes_written.saturating_add(line.len() as u64) > LOG_MAX_BYTES {
            match fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
            {
                Ok(file) => {
                    self.file = file;
                    self.bytes_written = 0;
                }
                Err(_) => return,
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(line.len() as u64);
        }
    }
}

fn writer() -> &'static Mutex<Option<LogWriter>> {
    WRITER.get_or_init(|| Mutex::new(None))
}

/// Configure file logging from CLI flags.
pub fn init_logging(config: &AppConfig) {
    let enabled = (config.logs || config.log_timings) && !config.no_logs;
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    CONTENT_ENABLED.store(enabled && config.log_content, Ordering::Relaxed);

    let mut guard = writer().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = if enabled {
        LogWriter::open(log_file_path())
    } else {
        None
    };
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Append a debug line when logging is enabled.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_timestamp());
    let mut guard = writer().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(writer) = guard.as_mut() {
        writer.write_line(&line);
    }
}

/// Like [`log_debug`], for lines that quote transcript or reply text.
pub fn log_debug_content(msg: &str) {
    if CONTENT_ENABLED.load(Ordering::Relaxed) {
        log_debug(msg);
    }
}

/// Panic hook target: record where we died without leaking user content.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if CONTENT_ENABLED.load(Ordering::Relaxed) {
        if let Some(text) = info.payload().downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = info.payload().downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        }
    } else {
        "panic payload omitted (log-content disabled)".to_string()
    };

    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        unix_timestamp(),
        env!("CARGO_PKG_VERSION")
    );
    let path = crash_log_path();
    if fs::metadata(&path).map(|m| m.len()).unwrap_or(0) + line.len() as u64 > CRASH_LOG_MAX_BYTES {
        let _ = fs::remove_file(&path);
    }
    if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
        let _ = file.write_all(line.as_bytes());
    }
}

#[cfg(test)]
pub(crate) fn set_logging_for_tests(enabled: bool, content_enabled: bool) {
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    CONTENT_ENABLED.store(enabled && content_enabled, Ordering::Relaxed);
    let mut guard = writer().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = if enabled {
        LogWriter::open(log_file_path())
    } else {
        None
    };
}
