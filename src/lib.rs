//! # rotalog
//!
//! rotalog is a small leveled logger that fans each record out to a set of
//! sinks: a terminal stream, a size-bounded rotating file, or any type
//! implementing [`Sink`]. **The rotating file sink keeps a fixed number of
//! numbered generations (`app.log`, `app.log.1`, … `app.log.N`) and rotates
//! before a write would push the active file past its size bound**. By
//! default a file left over from a previous run is archived as generation 1
//! when the sink is built, so every run starts with a fresh file.
//!
//! Log calls are synchronous: when a call returns, every sink has written
//! and flushed the line or reported a failure. A failing sink never prevents
//! delivery to the others and never panics the caller; failures come back in
//! a [`DispatchReport`] and go to the logger's error handler.
//!
//! ## Example
//!
//! ```rust
//! use rotalog::{LoggerBuilder, OutputMode, Severity};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     # let dir = tempfile::tempdir()?;
//!     # let path = dir.path().join("logs/demo.log");
//!     let logger = LoggerBuilder::new("demo")
//!         .log_file_path(path)
//!         .severity(Severity::Info)
//!         .output_mode(OutputMode::FileAndConsole)
//!         .max_backup_count(10)
//!         .max_file_size_bytes(5 * 1024 * 1024)
//!         .build()?;
//!
//!     logger.info("This is an info message");
//!     rotalog::warning!(logger, "This is a warning message");
//!     rotalog::error!(logger, "This is an error message: {}", 42);
//!
//!     Ok(())
//! }
//! ```

mod console;
mod error;
mod format;
mod logger;
pub mod provision;
mod record;
mod rotating;
mod severity;
mod sink;

pub use {
    console::{ConsoleSink, ConsoleStream},
    error::LogError,
    format::{FormatTemplate, SinkConfig, CONSOLE_TEMPLATE, FILE_TEMPLATE, TIMESTAMP_FORMAT},
    logger::{DispatchReport, ErrorHandler, Logger, LoggerBuilder, LoggerConfig, OutputMode},
    provision::Provisioned,
    record::{LogRecord, ProcessIdentity, SourceLocation, ThreadIdentity, TimeZone},
    rotating::{Compression, RotatingFileSink, RotatingFileSinkBuilder, RotationPolicy, RotationSize},
    severity::Severity,
    sink::Sink,
};

#[doc(hidden)]
pub mod __private {
    /// Reduce the type name of a function item declared inside the caller to
    /// the caller's own name.
    pub fn function_name(item_type_name: &'static str) -> &'static str {
        let mut name = item_type_name.strip_suffix("::f").unwrap_or(item_type_name);
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name.rsplit("::").next().unwrap_or(name)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        $crate::__private::function_name(::std::any::type_name_of_val(&f))
    }};
}

/// The [`SourceLocation`] of the macro invocation, including the enclosing
/// function's name.
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::SourceLocation::new(
            ::std::module_path!(),
            $crate::__function_name!(),
            ::std::file!(),
            ::std::line!(),
        )
    };
}

/// Log a formatted message at the given severity, recording module path,
/// function, file and line of the call site.
///
/// ```ignore
/// rotalog::log!(logger, Severity::Warning, "disk at {}%", 91);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log_at($severity, $crate::source_location!(), ::std::format!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => { $crate::log!($logger, $crate::Severity::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => { $crate::log!($logger, $crate::Severity::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => { $crate::log!($logger, $crate::Severity::Warning, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => { $crate::log!($logger, $crate::Severity::Error, $($arg)+) };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => { $crate::log!($logger, $crate::Severity::Critical, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_name_is_trimmed_to_caller() {
        assert_eq!(__private::function_name("app::net::connect::f"), "connect");
        assert_eq!(__private::function_name("app::run::{{closure}}::{{closure}}::f"), "run");
        assert_eq!(__private::function_name("main::f"), "main");
    }

    #[test]
    fn source_location_macro_names_this_function() {
        let location = source_location!();
        assert_eq!(location.function, "source_location_macro_names_this_function");
        assert_eq!(location.module, "rotalog::tests");
        assert!(location.file.ends_with("lib.rs"));
    }
}
