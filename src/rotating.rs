use {
    crate::{error::with_path, provision, LogError, Severity, Sink, SinkConfig},
    flate2::write::GzEncoder,
    regex::Regex,
    std::{
        ffi::OsString,
        fmt,
        fs,
        io::{self, Write as _},
        path::{Path, PathBuf},
        sync::{Mutex, PoisonError},
    },
};

#[cfg(unix)]
use std::{fs::Permissions, os::unix::fs::PermissionsExt};

/// Defines size thresholds for rotating log files in various units.
///
/// * `Bytes` - Direct byte count (e.g., 1048576 bytes)
/// * `KB` - Kilobytes (1 KB = 1024 bytes)
/// * `MB` - Megabytes (1 MB = 1024 KB)
/// * `GB` - Gigabytes (1 GB = 1024 MB)
///
/// # Examples
/// ```
/// use rotalog::{RotatingFileSinkBuilder, RotationSize};
///
/// # let dir = tempfile::tempdir().unwrap();
/// // Rotate when the active file would grow past 100 MB
/// let sink = RotatingFileSinkBuilder::new(dir.path().join("large.log"))
///     .max_file_size(RotationSize::MB(100))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSize {
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl RotationSize {
    /// Get the threshold in bytes.
    pub fn bytes(&self) -> u64 {
        match self {
            RotationSize::Bytes(b) => *b,
            RotationSize::KB(kb) => kb.saturating_mul(1024),
            RotationSize::MB(mb) => mb.saturating_mul(1024 * 1024),
            RotationSize::GB(gb) => gb.saturating_mul(1024 * 1024 * 1024),
        }
    }
}

/// Specifies the compression algorithm applied to a freshly rotated
/// generation.
///
/// The archived generation keeps its index and gains the algorithm's
/// extension, e.g. `app.log.1.gz`. Compression runs synchronously inside the
/// rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Gzip compression. Compressed files will have the `.gz` extension.
    Gzip,
    /// XZ compression. Compressed files will have the `.xz` extension.
    #[cfg(feature = "xz")]
    XZ,
}

impl Compression {
    /// Get the extension for the compressed log file.
    fn get_extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "gz",
            #[cfg(feature = "xz")]
            Compression::XZ => "xz",
        }
    }
}

/// When and how the active file is rotated.
///
/// `file_path` is generation 0; generation `i` lives at `<file_path>.<i>` and
/// a higher index is older. At most `max_backup_count` generations are kept
/// besides the active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub file_path: PathBuf,
    pub max_file_size_bytes: u64,
    pub max_backup_count: usize,
}

impl RotationPolicy {
    pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
    pub const DEFAULT_MAX_BACKUP_COUNT: usize = 5;

    pub fn new<P: AsRef<Path>>(file_path: P, max_file_size_bytes: u64, max_backup_count: usize) -> Self {
        RotationPolicy {
            file_path: file_path.as_ref().to_path_buf(),
            max_file_size_bytes,
            max_backup_count,
        }
    }

    /// # Errors
    /// [`LogError::InvalidConfiguration`] for an empty path, a path that does
    /// not name a file, or a zero size bound.
    pub fn validate(&self) -> Result<(), LogError> {
        if self.file_path.as_os_str().is_empty() {
            return Err(LogError::InvalidConfiguration("log file path is empty".to_string()));
        }
        if self.file_path.file_name().is_none() {
            return Err(LogError::InvalidConfiguration(format!(
                "log file path '{}' does not name a file",
                self.file_path.display()
            )));
        }
        if self.max_file_size_bytes == 0 {
            return Err(LogError::InvalidConfiguration(
                "max file size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of generation `index`; index 0 is the active file.
    pub fn generation_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            return self.file_path.clone();
        }
        let mut path = OsString::from(self.file_path.as_os_str());
        path.push(format!(".{index}"));
        PathBuf::from(path)
    }

    fn directory(&self) -> &Path {
        match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Everything a rotating sink needs that does not change after build.
#[derive(Clone)]
struct RotatingFileMeta {
    policy: RotationPolicy,
    config: SinkConfig,
    compression: Option<Compression>,
    /// The file permissions to set on newly created log files (Unix-like
    /// systems only), in octal notation (e.g., 0o644 for rw-r--r--).
    file_mode: Option<u32>,
    /// Archive a pre-existing active file before the first append.
    rollover_on_start: bool,
    /// Call `sync_data` after every append.
    sync_on_write: bool,
}

impl RotatingFileMeta {
    fn new<P: AsRef<Path>>(file_path: P) -> Self {
        RotatingFileMeta {
            policy: RotationPolicy::new(
                file_path,
                RotationPolicy::DEFAULT_MAX_FILE_SIZE_BYTES,
                RotationPolicy::DEFAULT_MAX_BACKUP_COUNT,
            ),
            config: SinkConfig::file(Severity::Debug),
            compression: None,
            file_mode: None,
            rollover_on_start: true,
            sync_on_write: false,
        }
    }

    /// Open the active file for appending, creating it if missing.
    fn open_active(&self) -> io::Result<fs::File> {
        let path = &self.policy.file_path;
        fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| with_path("Failed to open", path, err))
    }

    /// Set the permissions for a file based on the configured file mode.
    ///
    /// # Platform-specific behavior
    /// * On Unix systems: Sets the file mode using the octal permissions.
    /// * On non-Unix systems: Prints a warning message and does nothing.
    fn set_permissions(&self, path: &Path) -> io::Result<()> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                fs::set_permissions(path, Permissions::from_mode(mode))
                    .map_err(|err| with_path("Failed to set permissions on", path, err))?;
            }
            #[cfg(not(unix))]
            {
                let _ = (mode, path);
                eprintln!("Warning: Setting file permissions is not supported on non-Unix platforms");
            }
        }
        Ok(())
    }

    /// Both on-disk forms a generation may take: plain and compressed.
    fn generation_forms(&self, index: usize) -> Vec<PathBuf> {
        let plain = self.policy.generation_path(index);
        let mut forms = vec![plain.clone()];
        if let Some(compression) = &self.compression {
            let mut compressed = plain.into_os_string();
            compressed.push(format!(".{}", compression.get_extension()));
            forms.push(PathBuf::from(compressed));
        }
        forms
    }

    /// Evict the oldest generation and shift the others up by one, ending
    /// with the active file moved to generation 1.
    ///
    /// With no backups allowed the active file is simply discarded.
    fn shift_generations(&self) -> io::Result<()> {
        let max = self.policy.max_backup_count;
        if max == 0 {
            return remove_if_exists(&self.policy.file_path);
        }

        // 1. Evict the oldest generation.
        for path in self.generation_forms(max) {
            remove_if_exists(&path)?;
        }

        // 2. Shift the remaining generations, oldest first.
        for idx in (1..max).rev() {
            for (source_file, target_file) in self.generation_forms(idx).into_iter().zip(self.generation_forms(idx + 1)) {
                if source_file.exists() {
                    fs::rename(&source_file, &target_file).map_err(|err| {
                        io::Error::new(
                            err.kind(),
                            format!(
                                "Failed to rename file from '{}' to '{}': {err}",
                                source_file.display(),
                                target_file.display()
                            ),
                        )
                    })?;
                }
            }
        }

        // 3. Move the active file to generation 1.
        let active = &self.policy.file_path;
        let first = self.policy.generation_path(1);
        if active.exists() {
            fs::rename(active, &first).map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!(
                        "Failed to rename file from '{}' to '{}': {err}",
                        active.display(),
                        first.display()
                    ),
                )
            })?;
        }
        Ok(())
    }

    /// Compress generation 1 if requested, then drop any generation beyond
    /// the retention bound left behind by an earlier configuration.
    fn process_old_logs(&self) -> io::Result<()> {
        if self.policy.max_backup_count > 0 {
            let first = self.policy.generation_path(1);
            if first.is_file() {
                self.compress(&first)?;
            }
        }
        for (index, path) in self.list_generations()? {
            if index > self.policy.max_backup_count {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    /// Compress the log file.
    fn compress(&self, log_path: &Path) -> io::Result<()> {
        let compression = match &self.compression {
            Some(compression) => compression,
            None => {
                return Ok(());
            }
        };
        let infile = fs::File::open(log_path).map_err(|err| with_path("Failed to open", log_path, err))?;
        let mut reader = io::BufReader::new(infile);

        let mut compressed_path = OsString::from(log_path.as_os_str());
        compressed_path.push(format!(".{}", compression.get_extension()));
        let compressed_path = PathBuf::from(compressed_path);
        let outfile =
            fs::File::create(&compressed_path).map_err(|err| with_path("Failed to create", &compressed_path, err))?;
        #[allow(unused_mut)]
        let mut writer = io::BufWriter::new(outfile);

        match compression {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
                io::copy(&mut reader, &mut encoder)?;
                encoder.finish()?.flush()?;
            }
            #[cfg(feature = "xz")]
            Compression::XZ => {
                lzma_rs::xz_compress(&mut reader, &mut writer)?;
                writer.flush()?;
            }
        }
        // Ensures compressed file has correct permissions.
        self.set_permissions(&compressed_path)?;

        fs::remove_file(log_path).map_err(|err| with_path("Failed to remove", log_path, err))
    }

    /// Every numbered generation next to the active file, sorted by index.
    fn list_generations(&self) -> io::Result<Vec<(usize, PathBuf)>> {
        let Some(filename) = self.policy.file_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(Vec::new());
        };
        let file_pattern = Regex::new(&format!(r"^{}\.(\d+)(\.(gz|xz))?$", regex::escape(&filename)))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

        let directory = self.policy.directory();
        let files = fs::read_dir(directory).map_err(|err| with_path("Failed to list", directory, err))?;

        let mut generations = Vec::new();
        for file in files.flatten() {
            if !file.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(file_name) = file.file_name().to_str() {
                if let Some(index) = file_pattern
                    .captures(file_name)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<usize>().ok())
                {
                    generations.push((index, self.policy.directory().join(file_name)));
                }
            }
        }

        generations.sort();
        Ok(generations)
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(with_path("Failed to remove", path, err)),
        _ => Ok(()),
    }
}

/// Mutable part of the sink, guarded by one lock so that the
/// check-size, rotate, append sequence is atomic.
struct RotatingFileState {
    file: fs::File,
    size_bytes: u64,
}

/// Appends lines to a size-bounded set of generation files.
///
/// Before a line is written, the sink checks whether it would push the
/// active file past `max_file_size_bytes`; if so the generations are shifted
/// (`.1` → `.2`, …, oldest evicted), the active file becomes `.1` and a fresh
/// active file is opened. A line larger than the bound is still written, into
/// an otherwise empty file.
///
/// By default a file already present at the path when the sink is built is
/// rotated away immediately, so every run starts with a fresh active file.
///
/// # Examples
/// ```
/// use rotalog::{RotatingFileSinkBuilder, RotationSize, Severity, Sink};
///
/// # let dir = tempfile::tempdir().unwrap();
/// let sink = RotatingFileSinkBuilder::new(dir.path().join("logs/app.log"))
///     .max_file_size(RotationSize::KB(256))
///     .max_backup_count(3)
///     .build()
///     .unwrap();
/// sink.append(Severity::Info, "service started").unwrap();
/// ```
pub struct RotatingFileSink {
    name: String,
    meta: RotatingFileMeta,
    state: Mutex<RotatingFileState>,
}

impl RotatingFileSink {
    /// The active log file.
    pub fn path(&self) -> &Path {
        &self.meta.policy.file_path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.meta.policy
    }

    /// Bytes in the active file as tracked by the sink.
    pub fn current_size(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).size_bytes
    }

    pub fn generation_path(&self, index: usize) -> PathBuf {
        self.meta.policy.generation_path(index)
    }

    /// Existing generation files (`.1`, `.2`, … in either plain or compressed
    /// form), oldest last.
    pub fn generations(&self) -> Result<Vec<PathBuf>, LogError> {
        self.meta
            .list_generations()
            .map(|gens| gens.into_iter().map(|(_, path)| path).collect())
            .map_err(|err| LogError::sink_write(&self.name, err))
    }

    /// Rotate now, regardless of the active file's size.
    pub fn rollover(&self) -> Result<(), LogError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.swap_active(&mut state)
            .and_then(|_| self.meta.process_old_logs())
            .map_err(|err| LogError::sink_write(&self.name, err))
    }

    /// Shift the generations and switch the writer to a fresh active file.
    fn swap_active(&self, state: &mut RotatingFileState) -> io::Result<()> {
        state.file.flush()?;
        self.meta.shift_generations()?;

        // Only swap the writer once the new file exists.
        let file = self.meta.open_active()?;
        self.meta.set_permissions(&self.meta.policy.file_path)?;
        state.file = file;
        state.size_bytes = 0;
        Ok(())
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let incoming = buf.len() as u64;
        let mut processed = Ok(());
        if state.size_bytes > 0 && state.size_bytes.saturating_add(incoming) > self.meta.policy.max_file_size_bytes {
            self.swap_active(&mut state)?;
            // The fresh file is usable even if archiving failed; report after the write.
            processed = self.meta.process_old_logs();
        }

        state.file.write_all(buf)?;
        state.size_bytes += incoming;
        state.file.flush()?;
        if self.meta.sync_on_write {
            state.file.sync_data()?;
        }
        processed
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &SinkConfig {
        &self.meta.config
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.write_bytes(&buf)
    }
}

/// Raw byte access with the same rotation rules, for use as a plain writer
/// (e.g. behind `tracing_appender::non_blocking`).
impl io::Write for RotatingFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner).file.flush()
    }
}

impl fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("policy", &self.meta.policy)
            .field("compression", &self.meta.compression)
            .field("min_severity", &self.meta.config.min_severity)
            .finish_non_exhaustive()
    }
}

/// Fluent configuration for a [`RotatingFileSink`].
///
/// # Default Configuration
///
/// * 5 MiB size bound
/// * 5 backup generations
/// * Rollover of a pre-existing file at build time
/// * No compression, default file permissions
/// * File line layout, accepting every severity
pub struct RotatingFileSinkBuilder {
    meta: RotatingFileMeta,
}

impl RotatingFileSinkBuilder {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        RotatingFileSinkBuilder {
            meta: RotatingFileMeta::new(file_path),
        }
    }

    /// Size the active file may reach before it is rotated.
    pub fn max_file_size(self, size: RotationSize) -> Self {
        Self {
            meta: RotatingFileMeta {
                policy: RotationPolicy {
                    max_file_size_bytes: size.bytes(),
                    ..self.meta.policy
                },
                ..self.meta
            },
        }
    }

    /// Number of rotated generations to keep besides the active file.
    pub fn max_backup_count(self, max_backup_count: usize) -> Self {
        Self {
            meta: RotatingFileMeta {
                policy: RotationPolicy {
                    max_backup_count,
                    ..self.meta.policy
                },
                ..self.meta
            },
        }
    }

    /// Replace path, size bound and retention at once.
    pub fn policy(self, policy: RotationPolicy) -> Self {
        Self {
            meta: RotatingFileMeta { policy, ..self.meta },
        }
    }

    pub fn compression(self, compression: Compression) -> Self {
        Self {
            meta: RotatingFileMeta {
                compression: Some(compression),
                ..self.meta
            },
        }
    }

    /// Set the file permissions for log files (Unix-like systems only).
    /// For example, 0o644 for rw-r--r-- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: RotatingFileMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Whether a file already present at build time is rotated away first.
    pub fn rollover_on_start(self, rollover_on_start: bool) -> Self {
        Self {
            meta: RotatingFileMeta {
                rollover_on_start,
                ..self.meta
            },
        }
    }

    /// Whether every append waits for the data to reach the disk.
    pub fn sync_on_write(self, sync_on_write: bool) -> Self {
        Self {
            meta: RotatingFileMeta {
                sync_on_write,
                ..self.meta
            },
        }
    }

    pub fn config(self, config: SinkConfig) -> Self {
        Self {
            meta: RotatingFileMeta { config, ..self.meta },
        }
    }

    pub fn min_severity(self, min_severity: Severity) -> Self {
        Self {
            meta: RotatingFileMeta {
                config: SinkConfig {
                    min_severity,
                    ..self.meta.config
                },
                ..self.meta
            },
        }
    }

    /// Build the sink.
    ///
    /// Creates the parent directory when missing, rotates a pre-existing file
    /// (unless disabled or no backups are kept) and opens the active file for
    /// appending.
    ///
    /// # Errors
    /// * [`LogError::InvalidConfiguration`] for an invalid policy.
    /// * [`LogError::DirectoryCreation`] when the parent directory cannot be created.
    /// * [`LogError::SinkWrite`] when the start-up rollover fails.
    /// * [`LogError::CreateFile`] / [`LogError::SetFilePermissions`] for the active file.
    pub fn build(self) -> Result<RotatingFileSink, LogError> {
        let meta = self.meta;
        meta.policy.validate()?;
        provision::ensure_parent_dir(&meta.policy.file_path)?;

        let name = meta.policy.file_path.display().to_string();
        let path = meta.policy.file_path.clone();

        // Without backups a start-up rollover could only discard the prior run.
        if meta.rollover_on_start && meta.policy.max_backup_count > 0 && path.is_file() {
            meta.shift_generations()
                .and_then(|_| meta.process_old_logs())
                .map_err(|err| LogError::sink_write(&name, err))?;
        }

        let file = meta
            .open_active()
            .map_err(|source| LogError::CreateFile { path: path.clone(), source })?;
        meta.set_permissions(&path)
            .map_err(|source| LogError::SetFilePermissions { path: path.clone(), source })?;
        let size_bytes = file.metadata().map_or(0, |m| m.len());

        Ok(RotatingFileSink {
            name,
            meta,
            state: Mutex::new(RotatingFileState { file, size_bytes }),
        })
    }
}
