//! Rolling Logger
//!
//! File logger with size-based rotation plus an in-memory circular buffer
//! of the most recent lines. `init_logger` installs it as the `tracing` fmt writer,
//! so everything logged through `tracing` lands in `app.log`.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::MakeWriter;

/// Logger settings
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Name of the active log file inside the log directory
    pub file_name: String,
    /// Rotate once the active file would grow beyond this size
    pub max_bytes: u64,
    /// Number of recent lines kept in memory
    pub buffer_lines: usize,
    /// Most verbose level forwarded by the subscriber
    pub max_level: tracing::Level,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_name: "app.log".to_string(),
            max_bytes: 1024 * 1024,
            buffer_lines: 200,
            max_level: tracing::Level::INFO,
        }
    }
}

/// Handle to a rolling log file. Cheap to clone.
#[derive(Clone)]
pub struct RollingLogger {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    capacity: usize,
    recent: VecDeque<String>,
    // Tail of a line that has not seen its newline yet
    pending: String,
}

impl RollingLogger {
    /// Open (or create) the log file inside `dir`
    pub fn open(dir: &Path, config: &LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&config.file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                file,
                written,
                max_bytes: config.max_bytes,
                capacity: config.buffer_lines.max(1),
                recent: VecDeque::new(),
                pending: String::new(),
            })),
        })
    }

    /// Append one complete line
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        let mut inner = self.lock()?;
        let mut text = line.trim_end_matches('\n').to_string();
        text.push('\n');
        inner.write_bytes(text.as_bytes())
    }

    /// Most recent lines, oldest first
    pub fn recent(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(inner) => inner.recent.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Path of the active log file
    pub fn path(&self) -> io::Result<PathBuf> {
        Ok(self.lock()?.path.clone())
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("rolling logger lock poisoned"))
    }
}

impl Inner {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(&String::from_utf8_lossy(buf));
        Ok(())
    }

    /// Move the active file to `<name>.1` and start a fresh one
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let mut backup = self.path.clone().into_os_string();
        backup.push(".1");
        fs::rename(&self.path, PathBuf::from(backup))?;
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, text: &str) {
        self.pending.push_str(text);
        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            self.recent.push_back(line.trim_end().to_string());
            if self.recent.len() > self.capacity {
                self.recent.pop_front();
            }
        }
    }
}

/// `io::Write` end handed to the fmt subscriber
pub struct LogWriter {
    inner: Arc<Mutex<Inner>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("rolling logger lock poisoned"))?;
        inner.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("rolling logger lock poisoned"))?;
        inner.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingLogger {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

static GLOBAL: OnceLock<RollingLogger> = OnceLock::new();

/// Open the global logger and install it as the `tracing` subscriber.
///
/// Calling it again returns the logger opened first. If the host already
/// installed another subscriber, the file still receives the direct
/// `info`/`error` lines.
pub fn init_logger(dir: &Path, config: &LoggerConfig) -> io::Result<RollingLogger> {
    if let Some(existing) = GLOBAL.get() {
        return Ok(existing.clone());
    }
    let logger = RollingLogger::open(dir, config)?;
    let logger = GLOBAL.get_or_init(|| logger).clone();

    let _ = tracing_subscriber::fmt()
        .with_writer(logger.clone())
        .with_ansi(false)
        .with_max_level(config.max_level)
        .try_init();

    Ok(logger)
}

/// Append an INFO line to the global log
pub fn info(msg: &str) -> io::Result<()> {
    log_line("INFO", msg)
}

/// Append an ERROR line to the global log
pub fn error(msg: &str) -> io::Result<()> {
    log_line("ERROR", msg)
}

/// Recent lines of the global log (empty before `init_logger`)
pub fn recent_lines() -> Vec<String> {
    GLOBAL.get().map(RollingLogger::recent).unwrap_or_default()
}

fn log_line(level: &str, msg: &str) -> io::Result<()> {
    let logger = GLOBAL
        .get()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "rolling logger not initialized"))?;
    logger.append_line(&format!(
        "{} {:>5} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        msg
    ))
}
