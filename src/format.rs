use {
    crate::{LogError, LogRecord, Severity},
    regex::Regex,
    std::fmt::Write as _,
};

/// Timestamp layout used by every built-in template.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Line layout written by [`ConsoleSink`](crate::ConsoleSink) by default.
pub const CONSOLE_TEMPLATE: &str = "{timestamp} - {severity} [ref: {module} {function}({line})] - {message}";

/// Line layout written by [`RotatingFileSink`](crate::RotatingFileSink) by default.
pub const FILE_TEMPLATE: &str = "{timestamp} [tickCount: {tick_ms}] [{process_name} {pid}] [{thread_name} {tid}] - \
                                 {severity} [ref: {module} {function}({line})] - {message}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Timestamp,
    TickMs,
    Logger,
    ProcessName,
    Pid,
    ThreadName,
    Tid,
    Severity,
    Module,
    Function,
    File,
    Line,
    Message,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "timestamp" => Field::Timestamp,
            "tick_ms" => Field::TickMs,
            "logger" => Field::Logger,
            "process_name" => Field::ProcessName,
            "pid" => Field::Pid,
            "thread_name" => Field::ThreadName,
            "tid" => Field::Tid,
            "severity" => Field::Severity,
            "module" => Field::Module,
            "function" => Field::Function,
            "file" => Field::File,
            "line" => Field::Line,
            "message" => Field::Message,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed line template with `{field}` placeholders.
///
/// Parsing happens once, so rendering a record is a single pass over the
/// segments. Recognised fields: `timestamp`, `tick_ms`, `logger`,
/// `process_name`, `pid`, `thread_name`, `tid`, `severity`, `module`,
/// `function`, `file`, `line`, `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    /// Parse a template.
    ///
    /// # Errors
    /// [`LogError::InvalidConfiguration`] for an unknown placeholder or a stray
    /// brace.
    pub fn parse(template: &str) -> Result<Self, LogError> {
        let placeholder =
            Regex::new(r"\{([^{}]*)\}").map_err(|err| LogError::InvalidConfiguration(err.to_string()))?;

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &template[last..whole.start()])?;
            let field = Field::parse(name.as_str()).ok_or_else(|| {
                LogError::InvalidConfiguration(format!("unknown placeholder '{{{}}}' in template", name.as_str()))
            })?;
            segments.push(Segment::Field(field));
            last = whole.end();
        }
        push_literal(&mut segments, &template[last..])?;

        Ok(FormatTemplate {
            source: template.to_string(),
            segments,
        })
    }

    /// The default console layout.
    pub fn console() -> Self {
        Self::builtin(CONSOLE_TEMPLATE)
    }

    /// The default file layout.
    pub fn file() -> Self {
        Self::builtin(FILE_TEMPLATE)
    }

    fn builtin(template: &str) -> Self {
        Self::parse(template).unwrap_or_else(|_| FormatTemplate {
            source: template.to_string(),
            segments: vec![Segment::Field(Field::Message)],
        })
    }

    /// The template text this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render `record` into a single line, without a trailing newline.
    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.source.len() + record.message.len() + 64);
        for segment in &self.segments {
            // Writing into a String cannot fail.
            let _ = match segment {
                Segment::Literal(text) => out.write_str(text),
                Segment::Field(field) => match field {
                    Field::Timestamp => write!(out, "{}", record.timestamp.format(TIMESTAMP_FORMAT)),
                    Field::TickMs => write!(out, "{}", record.elapsed_ms),
                    Field::Logger => out.write_str(&record.logger_name),
                    Field::ProcessName => out.write_str(record.process.name),
                    Field::Pid => write!(out, "{}", record.process.pid),
                    Field::ThreadName => out.write_str(&record.thread.name),
                    Field::Tid => write!(out, "{}", record.thread.id),
                    Field::Severity => out.write_str(record.severity.as_str()),
                    Field::Module => out.write_str(record.location.module),
                    Field::Function => out.write_str(record.location.function),
                    Field::File => out.write_str(record.location.file),
                    Field::Line => write!(out, "{}", record.location.line),
                    Field::Message => out.write_str(&record.message),
                },
            };
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<(), LogError> {
    if text.contains(['{', '}']) {
        return Err(LogError::InvalidConfiguration(format!(
            "unbalanced brace in template near '{text}'"
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

/// Per-sink settings: the sink's own severity floor and its line layout.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub min_severity: Severity,
    pub template: FormatTemplate,
}

impl SinkConfig {
    pub fn new(min_severity: Severity, template: FormatTemplate) -> Self {
        SinkConfig { min_severity, template }
    }

    /// Console layout at the given floor.
    pub fn console(min_severity: Severity) -> Self {
        Self::new(min_severity, FormatTemplate::console())
    }

    /// File layout at the given floor.
    pub fn file(min_severity: Severity) -> Self {
        Self::new(min_severity, FormatTemplate::file())
    }
}
