use {
    crate::Severity,
    chrono::{DateTime, FixedOffset, Local, Utc},
    std::{
        panic::Location,
        path::Path,
        sync::{
            atomic::{AtomicU64, Ordering},
            OnceLock,
        },
        thread,
    },
};

/// Specifies the time zone used to stamp log records.
///
/// The zone is resolved to a fixed offset once, when the logger is built, so
/// every record of a run carries the same offset.
///
/// # Examples
/// ```
/// use rotalog::TimeZone;
/// use chrono::FixedOffset;
///
/// let utc = TimeZone::UTC;
/// let local = TimeZone::Local;
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local time zone.
    #[default]
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

impl TimeZone {
    pub(crate) fn offset(&self) -> FixedOffset {
        match self {
            TimeZone::UTC => Utc::now().fixed_offset().offset().to_owned(),
            TimeZone::Local => Local::now().offset().to_owned(),
            TimeZone::Fix(fixed_offset) => *fixed_offset,
        }
    }
}

/// Where in the source a log call was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Module path for macro calls, file stem for method calls.
    pub module: &'static str,
    /// Enclosing function, or `-` when it is not known.
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(module: &'static str, function: &'static str, file: &'static str, line: u32) -> Self {
        SourceLocation {
            module,
            function,
            file,
            line,
        }
    }

    /// Location of the caller of a `#[track_caller]` function.
    ///
    /// Rust does not expose the calling function's name here, so `function`
    /// is `-` and `module` falls back to the file stem.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        let file = location.file();
        let module = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file);
        SourceLocation::new(module, "-", file, location.line())
    }
}

/// The running process, as shown in file lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub name: &'static str,
    pub pid: u32,
}

impl ProcessIdentity {
    pub fn current() -> Self {
        static NAME: OnceLock<String> = OnceLock::new();
        let name = NAME.get_or_init(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "unknown".to_string())
        });
        ProcessIdentity {
            name: name.as_str(),
            pid: std::process::id(),
        }
    }
}

/// The thread a log call was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadIdentity {
    pub name: String,
    pub id: u64,
}

impl ThreadIdentity {
    pub fn current() -> Self {
        let current = thread::current();
        ThreadIdentity {
            name: current.name().unwrap_or("unnamed").to_string(),
            id: THREAD_NUMBER.with(|n| *n),
        }
    }
}

static NEXT_THREAD_NUMBER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Assigned on a thread's first log call; numbers start at 1 and are never reused.
    static THREAD_NUMBER: u64 = NEXT_THREAD_NUMBER.fetch_add(1, Ordering::Relaxed);
}

/// A single log event, built once per log call and handed to every sink.
///
/// Only its rendered text is ever persisted.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<FixedOffset>,
    /// Milliseconds since the emitting logger was created.
    pub elapsed_ms: u128,
    pub severity: Severity,
    pub logger_name: String,
    pub location: SourceLocation,
    pub process: ProcessIdentity,
    pub thread: ThreadIdentity,
    pub message: String,
}

impl LogRecord {
    /// Capture a record on the current thread, stamped with the current time.
    pub fn capture(
        logger_name: &str,
        severity: Severity,
        location: SourceLocation,
        message: impl Into<String>,
        time_zone: FixedOffset,
        elapsed_ms: u128,
    ) -> Self {
        LogRecord {
            timestamp: Utc::now().with_timezone(&time_zone),
            elapsed_ms,
            severity,
            logger_name: logger_name.to_string(),
            location,
            process: ProcessIdentity::current(),
            thread: ThreadIdentity::current(),
            message: message.into(),
        }
    }
}
