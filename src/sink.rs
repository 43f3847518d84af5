use {
    crate::{LogError, LogRecord, Severity, SinkConfig},
    std::io,
};

/// A destination for rendered log lines.
///
/// Implementors only provide the raw write; severity filtering and rendering
/// come from the provided methods, so every sink applies its own floor the
/// same way regardless of what the facade already filtered.
pub trait Sink: Send + Sync {
    /// Name used in error reports.
    fn name(&self) -> &str;

    fn config(&self) -> &SinkConfig;

    /// Write one line (no trailing newline) and flush it.
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn accepts(&self, severity: Severity) -> bool {
        severity >= self.config().min_severity
    }

    /// Append an already rendered line, unless `severity` is below this
    /// sink's floor.
    fn append(&self, severity: Severity, line: &str) -> Result<(), LogError> {
        if !self.accepts(severity) {
            return Ok(());
        }
        self.write_line(line).map_err(|err| LogError::sink_write(self.name(), err))
    }

    /// Render `record` with this sink's template and append it.
    fn emit(&self, record: &LogRecord) -> Result<(), LogError> {
        if !self.accepts(record.severity) {
            return Ok(());
        }
        let line = self.config().template.render(record);
        self.append(record.severity, &line)
    }
}
