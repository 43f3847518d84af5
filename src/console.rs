use {
    crate::{Sink, SinkConfig},
    std::{
        fmt,
        io::{self, Write},
        sync::{Mutex, PoisonError},
    },
};

/// Terminal stream a [`ConsoleSink`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

/// Writes rendered lines to a terminal stream, one flush per line.
///
/// No rotation and no size bound. A closed or broken stream surfaces as
/// [`LogError::SinkWrite`](crate::LogError::SinkWrite) from
/// [`Sink::append`].
pub struct ConsoleSink {
    name: String,
    config: SinkConfig,
    stream: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout(config: SinkConfig) -> Self {
        Self::with_writer("stdout", config, io::stdout())
    }

    pub fn stderr(config: SinkConfig) -> Self {
        Self::with_writer("stderr", config, io::stderr())
    }

    pub fn for_stream(stream: ConsoleStream, config: SinkConfig) -> Self {
        match stream {
            ConsoleStream::Stdout => Self::stdout(config),
            ConsoleStream::Stderr => Self::stderr(config),
        }
    }

    /// Use any writer in place of a terminal stream.
    pub fn with_writer<W: Write + Send + 'static>(name: impl Into<String>, config: SinkConfig, writer: W) -> Self {
        ConsoleSink {
            name: name.into(),
            config,
            stream: Mutex::new(Box::new(writer)),
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &SinkConfig {
        &self.config
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
