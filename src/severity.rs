use {
    crate::LogError,
    std::{fmt, str::FromStr},
};

/// Ordered severity of a log record.
///
/// The order is total: `Debug < Info < Warning < Error < Critical`. It is used
/// both as the threshold of a [`Logger`](crate::Logger) or a sink and as the
/// level carried by each [`LogRecord`](crate::LogRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Fine-grained events that are mostly useful while debugging.
    #[default]
    Debug,
    /// Progress of the application at a coarse-grained level.
    Info,
    /// Potentially harmful situations.
    Warning,
    /// Failures the application can still recover from.
    Error,
    /// Failures that will likely abort the application.
    Critical,
}

impl Severity {
    /// Every severity, from lowest to highest.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Name rendered into log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            other => Err(LogError::InvalidConfiguration(format!("unknown severity '{other}'"))),
        }
    }
}
