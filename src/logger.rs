use {
    crate::{
        Compression, ConsoleSink, ConsoleStream, LogError, LogRecord, RotatingFileSinkBuilder, RotationPolicy, Severity,
        Sink, SinkConfig, SourceLocation, TimeZone,
    },
    chrono::FixedOffset,
    std::{
        fmt,
        path::{Path, PathBuf},
        str::FromStr,
        sync::{Mutex, PoisonError},
        time::Instant,
    },
};

/// Callback receiving every sink failure a [`Logger`] isolates.
pub type ErrorHandler = Box<dyn Fn(&LogError) + Send + Sync>;

/// What happened to one log call.
///
/// Sink failures are reported here instead of being raised: a broken sink
/// never stops delivery to the others.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Sinks that wrote the record.
    pub delivered: usize,
    /// Sinks skipped because the record was below the facade's or their own
    /// floor.
    pub filtered: usize,
    /// Sinks that tried and failed, in attachment order.
    pub failures: Vec<LogError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The caller-facing logger: one name, one severity floor, and the sinks it
/// owns.
///
/// Every accepted record is handed to each sink in attachment order. A call
/// holds the sink list lock for the whole fan-out, so calls from different
/// threads are serialized.
///
/// Sharing is explicit: wrap the logger in an `Arc` to use it from several
/// places. There is no global registry.
pub struct Logger {
    name: String,
    level: Severity,
    time_zone: FixedOffset,
    started: Instant,
    sinks: Mutex<Vec<Box<dyn Sink>>>,
    on_error: ErrorHandler,
}

impl Logger {
    /// A logger with no sinks attached.
    pub fn new(name: impl Into<String>, level: Severity) -> Self {
        Logger {
            name: name.into(),
            level,
            time_zone: TimeZone::Local.offset(),
            started: Instant::now(),
            sinks: Mutex::new(Vec::new()),
            on_error: Box::new(report_to_stderr),
        }
    }

    /// Stamp records in the given time zone.
    pub fn with_time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            time_zone: time_zone.offset(),
            ..self
        }
    }

    /// Replace the default handler, which prints failures to stderr.
    pub fn with_error_handler<F>(self, on_error: F) -> Self
    where
        F: Fn(&LogError) + Send + Sync + 'static,
    {
        Self {
            on_error: Box::new(on_error),
            ..self
        }
    }

    /// Add a sink after the ones already attached.
    pub fn attach(&mut self, sink: Box<dyn Sink>) {
        self.sinks.get_mut().unwrap_or_else(PoisonError::into_inner).push(sink);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether a record of `severity` passes the facade's floor.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl Into<String>) -> DispatchReport {
        self.log_at(severity, SourceLocation::caller(), message)
    }

    /// Log with an explicit source location; the call-site macros use this.
    pub fn log_at(&self, severity: Severity, location: SourceLocation, message: impl Into<String>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.enabled(severity) {
            report.filtered = sinks.len();
            return report;
        }

        let record = LogRecord::capture(
            &self.name,
            severity,
            location,
            message,
            self.time_zone,
            self.started.elapsed().as_millis(),
        );
        for sink in sinks.iter() {
            if !sink.accepts(severity) {
                report.filtered += 1;
                continue;
            }
            match sink.emit(&record) {
                Ok(()) => report.delivered += 1,
                Err(err) => report.failures.push(err),
            }
        }
        // The handler may log through this logger again.
        drop(sinks);

        for err in &report.failures {
            (self.on_error)(err);
        }
        report
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> DispatchReport {
        self.log_at(Severity::Debug, SourceLocation::caller(), message)
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> DispatchReport {
        self.log_at(Severity::Info, SourceLocation::caller(), message)
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) -> DispatchReport {
        self.log_at(Severity::Warning, SourceLocation::caller(), message)
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> DispatchReport {
        self.log_at(Severity::Error, SourceLocation::caller(), message)
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) -> DispatchReport {
        self.log_at(Severity::Critical, SourceLocation::caller(), message)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("time_zone", &self.time_zone)
            .field("sinks", &self.sink_count())
            .finish_non_exhaustive()
    }
}

fn report_to_stderr(err: &LogError) {
    eprintln!("Failed to deliver log record: {err}");
}

/// Which sinks a [`LoggerBuilder`] attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    ConsoleOnly,
    FileOnly,
    #[default]
    FileAndConsole,
}

impl OutputMode {
    pub fn uses_console(&self) -> bool {
        matches!(self, OutputMode::ConsoleOnly | OutputMode::FileAndConsole)
    }

    pub fn uses_file(&self) -> bool {
        matches!(self, OutputMode::FileOnly | OutputMode::FileAndConsole)
    }

    fn as_str(&self) -> &'static str {
        match self {
            OutputMode::ConsoleOnly => "console-only",
            OutputMode::FileOnly => "file-only",
            OutputMode::FileAndConsole => "file-and-console",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "console-only" | "consoleonly" | "console" => Ok(OutputMode::ConsoleOnly),
            "file-only" | "fileonly" | "file" => Ok(OutputMode::FileOnly),
            "file-and-console" | "fileandconsole" | "both" => Ok(OutputMode::FileAndConsole),
            other => Err(LogError::InvalidConfiguration(format!("unknown output mode '{other}'"))),
        }
    }
}

/// Plain configuration for [`LoggerBuilder::from_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub app_name: String,
    pub log_file_path: PathBuf,
    pub severity: Severity,
    pub output_mode: OutputMode,
    pub max_backup_count: usize,
    pub max_file_size_bytes: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            app_name: "unknown".to_string(),
            log_file_path: PathBuf::from("noName.log"),
            severity: Severity::Debug,
            output_mode: OutputMode::FileAndConsole,
            max_backup_count: RotationPolicy::DEFAULT_MAX_BACKUP_COUNT,
            max_file_size_bytes: RotationPolicy::DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// Builds a [`Logger`] with a console sink, a rotating file sink, or both.
///
/// Both sinks share the logger's severity. Sinks are constructed before any
/// is attached, so a configuration error leaves nothing half-built and
/// nothing logged.
///
/// # Default Configuration
///
/// * Name `unknown`, file `noName.log`, severity `Debug`
/// * Console and file output
/// * 5 backups of at most 5 MiB each
/// * Local time zone, stdout for the console
/// * Start-up announcements enabled
///
/// # Examples
/// ```
/// use rotalog::{LoggerBuilder, OutputMode, Severity};
///
/// # let dir = tempfile::tempdir().unwrap();
/// let logger = LoggerBuilder::new("billing")
///     .log_file_path(dir.path().join("logs/billing.log"))
///     .severity(Severity::Info)
///     .output_mode(OutputMode::FileOnly)
///     .max_backup_count(3)
///     .build()
///     .unwrap();
///
/// logger.info("invoice sent");
/// rotalog::warning!(logger, "retrying payment {}", 42);
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    time_zone: TimeZone,
    console_stream: ConsoleStream,
    compression: Option<Compression>,
    file_mode: Option<u32>,
    rollover_on_start: bool,
    sync_on_write: bool,
    announce: bool,
    on_error: Option<ErrorHandler>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::from_config(LoggerConfig::default())
    }
}

impl LoggerBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::from_config(LoggerConfig {
            app_name: app_name.into(),
            ..LoggerConfig::default()
        })
    }

    pub fn from_config(config: LoggerConfig) -> Self {
        LoggerBuilder {
            config,
            time_zone: TimeZone::Local,
            console_stream: ConsoleStream::Stdout,
            compression: None,
            file_mode: None,
            rollover_on_start: true,
            sync_on_write: false,
            announce: true,
            on_error: None,
        }
    }

    pub fn log_file_path<P: AsRef<Path>>(self, log_file_path: P) -> Self {
        Self {
            config: LoggerConfig {
                log_file_path: log_file_path.as_ref().to_path_buf(),
                ..self.config
            },
            ..self
        }
    }

    pub fn severity(self, severity: Severity) -> Self {
        Self {
            config: LoggerConfig { severity, ..self.config },
            ..self
        }
    }

    pub fn output_mode(self, output_mode: OutputMode) -> Self {
        Self {
            config: LoggerConfig {
                output_mode,
                ..self.config
            },
            ..self
        }
    }

    pub fn max_backup_count(self, max_backup_count: usize) -> Self {
        Self {
            config: LoggerConfig {
                max_backup_count,
                ..self.config
            },
            ..self
        }
    }

    pub fn max_file_size_bytes(self, max_file_size_bytes: u64) -> Self {
        Self {
            config: LoggerConfig {
                max_file_size_bytes,
                ..self.config
            },
            ..self
        }
    }

    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self { time_zone, ..self }
    }

    pub fn console_stream(self, console_stream: ConsoleStream) -> Self {
        Self { console_stream, ..self }
    }

    /// Compress rotated generations.
    pub fn compression(self, compression: Compression) -> Self {
        Self {
            compression: Some(compression),
            ..self
        }
    }

    /// Unix permissions for the log files.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            file_mode: Some(mode),
            ..self
        }
    }

    /// Whether an existing log file is archived as generation 1 at start.
    pub fn rollover_on_start(self, rollover_on_start: bool) -> Self {
        Self {
            rollover_on_start,
            ..self
        }
    }

    pub fn sync_on_write(self, sync_on_write: bool) -> Self {
        Self { sync_on_write, ..self }
    }

    /// Whether the logger reports its own initialization through its sinks.
    pub fn announce(self, announce: bool) -> Self {
        Self { announce, ..self }
    }

    pub fn error_handler<F>(self, on_error: F) -> Self
    where
        F: Fn(&LogError) + Send + Sync + 'static,
    {
        Self {
            on_error: Some(Box::new(on_error)),
            ..self
        }
    }

    /// The configuration as it stands.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Build the logger.
    ///
    /// # Errors
    /// Any error from building the [`RotatingFileSink`](crate::RotatingFileSink):
    /// invalid policy, directory creation, start-up rollover or file creation.
    pub fn build(self) -> Result<Logger, LogError> {
        let LoggerBuilder {
            config,
            time_zone,
            console_stream,
            compression,
            file_mode,
            rollover_on_start,
            sync_on_write,
            announce,
            on_error,
        } = self;

        let console = config
            .output_mode
            .uses_console()
            .then(|| ConsoleSink::for_stream(console_stream, SinkConfig::console(config.severity)));

        let file = if config.output_mode.uses_file() {
            let mut builder = RotatingFileSinkBuilder::new(&config.log_file_path)
                .policy(RotationPolicy::new(
                    &config.log_file_path,
                    config.max_file_size_bytes,
                    config.max_backup_count,
                ))
                .config(SinkConfig::file(config.severity))
                .rollover_on_start(rollover_on_start)
                .sync_on_write(sync_on_write);
            if let Some(compression) = compression {
                builder = builder.compression(compression);
            }
            if let Some(mode) = file_mode {
                builder = builder.file_mode(mode);
            }
            Some(builder.build()?)
        } else {
            None
        };

        let mut logger = Logger::new(config.app_name, config.severity).with_time_zone(time_zone);
        if let Some(on_error) = on_error {
            logger.on_error = on_error;
        }

        if let Some(console) = console {
            logger.attach(Box::new(console));
            if announce {
                crate::debug!(logger, "Console sink initialized");
            }
        }
        if let Some(file) = file {
            logger.attach(Box::new(file));
            if announce {
                crate::debug!(logger, "File sink initialized: {}", config.log_file_path.display());
            }
        }
        if announce {
            crate::info!(logger, "Logger initialized");
        }

        Ok(logger)
    }
}
