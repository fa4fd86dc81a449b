//! Logging setup
//!
//! `env_logger` still formats to stderr. Every line that passes its filter is
//! also appended to the log file, when one is configured, and kept in a bounded
//! buffer the engine console reads from.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use log::{Level, Log, Metadata, Record};

/// Lines the console keeps before dropping the oldest
pub const CONSOLE_CAPACITY: usize = 512;

/// One formatted log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogLine {
    #[must_use]
    pub fn from_record(record: &Record<'_>) -> Self {
        Self {
            level: record.level(),
            target: record.target().to_owned(),
            message: record.args().to_string(),
        }
    }
}

/// Shared ring of recent log lines
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<LogLine>>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(CONSOLE_CAPACITY)
    }
}

impl LogBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: LogLine) {
        let mut lines = self.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Copy of the current lines, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// The buffer the installed logger feeds and the console shows
pub fn console_buffer() -> LogBuffer {
    static BUFFER: OnceLock<LogBuffer> = OnceLock::new();
    BUFFER.get_or_init(LogBuffer::default).clone()
}

/// `env_logger` plus a log file and the console buffer
pub struct EngineLogger {
    inner: env_logger::Logger,
    file: Option<Mutex<LineWriter<File>>>,
    console: LogBuffer,
    start: Instant,
}

impl EngineLogger {
    #[must_use]
    pub fn new(mut builder: env_logger::Builder, console: LogBuffer) -> Self {
        Self {
            inner: builder.filter_module("wgpu_hal", log::LevelFilter::Error).build(),
            file: None,
            console,
            start: Instant::now(),
        }
    }

    /// Create or truncate the file at `path` and write every line to it
    pub fn open_file(&mut self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = File::create(path)?;
        self.file = Some(Mutex::new(LineWriter::new(file)));
        Ok(())
    }

    #[must_use]
    pub fn filter(&self) -> log::LevelFilter {
        self.inner.filter()
    }

    fn write_file(&self, line: &LogLine) {
        let Some(file) = &self.file else {
            return;
        };
        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = self.start.elapsed().as_secs_f64();
        // a failing log file must not take logging down with it
        let _ = writeln!(
            file,
            "[{elapsed:>10.3}] [{:<5}] {}: {}",
            line.level, line.target, line.message
        );
    }
}

impl Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        let line = LogLine::from_record(record);
        self.write_file(&line);
        self.console.push(line);
    }

    fn flush(&self) {
        self.inner.flush();
        if let Some(file) = &self.file {
            let _ = file.lock().unwrap_or_else(PoisonError::into_inner).flush();
        }
    }
}

/// Install the engine logger. `RUST_LOG` overrides `default_level`.
///
/// Does nothing when a logger is already installed.
pub fn init(default_level: &str, log_file: Option<&Path>) {
    let builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    let mut logger = EngineLogger::new(builder, console_buffer());
    let file_error = log_file.and_then(|path| logger.open_file(path).err().map(|e| (path, e)));

    let filter = logger.filter();
    if log::set_boxed_logger(Box::new(logger)).is_err() {
        log::debug!("logger already initialised");
        return;
    }
    log::set_max_level(filter);

    match (log_file, file_error) {
        (_, Some((path, error))) => log::warn!("cannot open log file {}: {error}", path.display()),
        (Some(path), None) => log::info!("Logging to {}", path.display()),
        (None, None) => {}
    }
}
