//! Rotating file transport
//!
//! Writes one JSON object per line to `<dir>/<name>-YYYY-MM-DD.log`. Before
//! each write the transport rotates on a date change (new dated file) or when
//! the current file has reached the size limit (current file renamed with the
//! next free `.1`, `.2`, ... suffix). A background sweep deletes files older
//! than the retention period.

use crate::core::{FileConfig, LogEntry, LoggerError, Result, Transport};
use crate::transports::optimize::{optimize_entry, OptimizeOptions};
use crate::transports::timer::PeriodicTask;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::fs::File as StdFile;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Rotation state: exactly one open handle for the active day
struct RotationState {
    date: NaiveDate,
    current_size: u64,
    writer: Option<File>,
    rotation_failures: u64,
}

/// Repeated rotation failures only warn on the first and every Nth
const ROTATION_WARN_EVERY: u64 = 100;

struct FileInner {
    directory: PathBuf,
    stem: String,
    max_size: u64,
    retention_days: i64,
    compress: bool,
    write_timeout: Duration,
    options: OptimizeOptions,
    state: Mutex<RotationState>,
}

/// Durable local storage with date and size rotation plus retention cleanup
///
/// # Example
///
/// ```no_run
/// use log_pipeline::core::FileConfig;
/// use log_pipeline::transports::{FileTransport, OptimizeOptions};
///
/// # async fn example() -> log_pipeline::Result<()> {
/// let config = FileConfig {
///     directory: "/var/log/app".into(),
///     max_size: 50 * 1024 * 1024,
///     ..FileConfig::default()
/// };
/// let transport = FileTransport::new(&config, OptimizeOptions::for_scope(false, false)).await?;
/// # Ok(())
/// # }
/// ```
pub struct FileTransport {
    inner: Arc<FileInner>,
    retention: parking_lot::Mutex<Option<PeriodicTask>>,
    closed: AtomicBool,
}

impl FileTransport {
    /// Create the directory, open (or resume) today's file and schedule the
    /// retention sweep
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub async fn new(config: &FileConfig, options: OptimizeOptions) -> Result<Self> {
        fs::create_dir_all(&config.directory).await.map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", config.directory.display()),
                e,
            )
        })?;

        let stem = config
            .filename
            .strip_suffix(".log")
            .unwrap_or(&config.filename)
            .to_string();

        let today = Local::now().date_naive();
        let path = dated_path(&config.directory, &stem, today);
        let (file, size) = open_append(&path).await?;

        let inner = Arc::new(FileInner {
            directory: config.directory.clone(),
            stem,
            max_size: config.max_size,
            retention_days: config.retention_days,
            compress: config.compress,
            write_timeout: config.write_timeout,
            options,
            state: Mutex::new(RotationState {
                date: today,
                current_size: size,
                writer: Some(file),
                rotation_failures: 0,
            }),
        });

        let retention = if config.retention_days > 0 {
            Some(spawn_retention(Arc::clone(&inner), config.retention_interval)?)
        } else {
            None
        };

        Ok(Self {
            inner,
            retention: parking_lot::Mutex::new(retention),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the file for a given day
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.inner.directory, &self.inner.stem, date)
    }

    /// Path of the currently active file
    pub async fn current_path(&self) -> PathBuf {
        let date = self.inner.state.lock().await.date;
        self.path_for(date)
    }

    /// Bytes written to the active file so far
    pub async fn current_size(&self) -> u64 {
        self.inner.state.lock().await.current_size
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    /// Write an entry as if the wall clock read `today`
    pub(crate) async fn write_on(&self, entry: &LogEntry, today: NaiveDate) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::TransportClosed("file".to_string()));
        }

        let mut line = serde_json::to_string(&optimize_entry(entry, self.inner.options))?;
        line.push('\n');

        let mut state = self.inner.state.lock().await;
        self.inner.prepare(&mut state, today).await?;

        let path = self.path_for(state.date);
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_transport(path.display().to_string(), "Writer not initialized"))?;

        let bytes = line.as_bytes();
        let outcome = tokio::time::timeout(self.inner.write_timeout, async {
            writer.write_all(bytes).await?;
            writer.flush().await
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                state.current_size += bytes.len() as u64;
                Ok(())
            }
            Ok(Err(e)) => {
                // Next write re-creates the handle
                state.writer = None;
                Err(LoggerError::file_transport(
                    path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                ))
            }
            Err(_) => {
                state.writer = None;
                Err(LoggerError::timeout("file write", self.inner.write_timeout))
            }
        }
    }

    /// Delete files older than the retention period, returning how many went
    pub async fn sweep_retention(&self) -> Result<usize> {
        self.inner.sweep_retention(SystemTime::now()).await
    }
}

impl FileInner {
    /// Rotate before writing when the date changed or the size limit is reached
    async fn prepare(&self, state: &mut RotationState, today: NaiveDate) -> Result<()> {
        if today != state.date {
            if let Some(mut writer) = state.writer.take() {
                let _ = tokio::time::timeout(self.write_timeout, writer.flush()).await;
            }
            let (file, size) = open_append(&dated_path(&self.directory, &self.stem, today)).await?;
            state.writer = Some(file);
            state.current_size = size;
            state.date = today;
        } else if state.current_size >= self.max_size {
            match self.rotate(state).await {
                Ok(()) => state.rotation_failures = 0,
                Err(e) => {
                    // Size stays real so the next write tries again
                    state.rotation_failures += 1;
                    if state.rotation_failures % ROTATION_WARN_EVERY == 1 {
                        eprintln!(
                            "[LOGGER WARNING] Log rotation failed ({} in a row): {}. Continuing with current file.",
                            state.rotation_failures, e
                        );
                    }
                }
            }
        }

        if state.writer.is_none() {
            let path = dated_path(&self.directory, &self.stem, state.date);
            let (file, size) = tokio::time::timeout(self.write_timeout, open_append(&path))
                .await
                .map_err(|_| LoggerError::timeout("file open", self.write_timeout))??;
            state.writer = Some(file);
            state.current_size = size;
        }
        Ok(())
    }

    /// Move the active file aside under the next unused numeric suffix
    async fn rotate(&self, state: &mut RotationState) -> Result<()> {
        let active = dated_path(&self.directory, &self.stem, state.date);

        if let Some(mut writer) = state.writer.take() {
            tokio::time::timeout(self.write_timeout, writer.flush())
                .await
                .map_err(|_| LoggerError::timeout("flush before rotation", self.write_timeout))?
                .map_err(|e| {
                    LoggerError::file_rotation(
                        active.display().to_string(),
                        format!("Failed to flush before rotation: {}", e),
                    )
                })?;
        }

        let mut index = 1;
        let backup = loop {
            let candidate = suffixed_path(&active, index);
            let compressed = gz_path(&candidate);
            if !fs::try_exists(&candidate).await.unwrap_or(false)
                && !fs::try_exists(&compressed).await.unwrap_or(false)
            {
                break candidate;
            }
            index += 1;
        };

        fs::rename(&active, &backup).await.map_err(|e| {
            LoggerError::file_rotation(
                active.display().to_string(),
                format!("Failed to rotate current log file: {}", e),
            )
        })?;

        if self.compress {
            let target = backup.clone();
            let result = tokio::task::spawn_blocking(move || compress_file(&target))
                .await
                .map_err(|e| LoggerError::other(format!("compression task failed: {}", e)))?;
            if let Err(e) = result {
                eprintln!("[LOGGER WARNING] Failed to compress {}: {}", backup.display(), e);
            }
        }

        let (file, _) = open_append(&active).await.map_err(|e| {
            LoggerError::file_rotation(
                active.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        state.writer = Some(file);
        state.current_size = 0;
        Ok(())
    }

    async fn sweep_retention(&self, now: SystemTime) -> Result<usize> {
        if self.retention_days <= 0 {
            return Ok(0);
        }
        let max_age = Duration::from_secs(self.retention_days as u64 * 86_400);
        let prefix = format!("{}-", self.stem);

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) || !name.contains(".log") {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else { continue };
            if !metadata.is_file() {
                continue;
            }
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age > max_age)
                .unwrap_or(false);
            if expired {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => eprintln!(
                        "[LOGGER WARNING] Failed to remove expired log {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, entry: &LogEntry) -> Result<()> {
        self.write_on(entry, Local::now().date_naive()).await
    }

    async fn flush(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if let Some(writer) = state.writer.as_mut() {
            match tokio::time::timeout(self.inner.write_timeout, writer.flush()).await {
                Ok(result) => result?,
                Err(_) => {
                    state.writer = None;
                    return Err(LoggerError::timeout("file flush", self.inner.write_timeout));
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let task = self.retention.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }

        let mut state = self.inner.state.lock().await;
        if let Some(mut writer) = state.writer.take() {
            let timeout = self.inner.write_timeout;
            match tokio::time::timeout(timeout, async {
                writer.flush().await?;
                writer.shutdown().await
            })
            .await
            {
                Ok(result) => result?,
                Err(_) => return Err(LoggerError::timeout("file close", timeout)),
            }
        }
        Ok(())
    }
}

fn spawn_retention(inner: Arc<FileInner>, period: Duration) -> Result<PeriodicTask> {
    PeriodicTask::spawn(period, true, move || {
        let inner = Arc::clone(&inner);
        async move {
            if let Err(e) = inner.sweep_retention(SystemTime::now()).await {
                eprintln!("[LOGGER WARNING] Log retention sweep failed: {}", e);
            }
        }
    })
}

fn dated_path(directory: &Path, stem: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}-{}.log", stem, date.format("%Y-%m-%d")))
}

fn suffixed_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

async fn open_append(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| {
            LoggerError::file_transport(path.display().to_string(), format!("Failed to open: {}", e))
        })?;
    let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Gzip a rotated file, removing the original only once the archive is complete
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, BufWriter};

    let target = gz_path(path);
    let mut temp = target.clone().into_os_string();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let mut reader = BufReader::with_capacity(64 * 1024, StdFile::open(path)?);
    let output = BufWriter::with_capacity(64 * 1024, StdFile::create(&temp)?);
    let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

    let finished = std::io::copy(&mut reader, &mut encoder).and_then(|_| encoder.finish());
    if let Err(e) = finished {
        let _ = std::fs::remove_file(&temp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    std::fs::rename(&temp, &target)?;
    if let Err(e) = std::fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}
