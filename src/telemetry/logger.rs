//! Rotating JSON Lines writer.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::record::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::{HelmError, Result};

const FILE_PREFIX: &str = "telemetry_";
const FILE_SUFFIX: &str = ".jsonl";

/// Appends telemetry records to rotating files in one directory.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    session: String,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u32,
}

impl TelemetryLogger {
    /// Creates the log directory if needed. No file is opened until the first
    /// record.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        let session = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        info!("Telemetry logging to {} (session {})", dir.display(), session);

        Ok(Self {
            dir,
            session,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Writes one record as a single line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`HelmError::Telemetry`] on serialization failure and
    /// [`HelmError::Io`] on file errors.
    pub fn log(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(HelmError::Telemetry("no open telemetry file".to_string()));
        };

        serde_json::to_writer(&mut *writer, record)
            .map_err(|e| HelmError::Telemetry(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.records_in_file += 1;
        Ok(())
    }

    /// Path of the file currently being written, if any
    #[cfg(test)]
    pub(crate) fn current_file(&self) -> Option<PathBuf> {
        self.writer.as_ref().map(|_| self.file_path(self.file_seq))
    }

    fn file_path(&self, seq: u32) -> PathBuf {
        self.dir
            .join(format!("{}{}_{:04}{}", FILE_PREFIX, self.session, seq, FILE_SUFFIX))
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            self.file_seq += 1;
        }

        let path = self.file_path(self.file_seq);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Deletes the oldest telemetry files beyond the retention limit.
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Session timestamp and zero-padded sequence make names sort by age
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry file {}: {}", path.display(), e);
            } else {
                debug!("Removed old telemetry file {}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorCommand;
    use crate::arbiter::{Decision, Mode};
    use crate::telemetry::TelemetryEvent;
    use std::path::Path;
    use tempfile::tempdir;

    fn config(dir: &Path, per_file: usize, keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            log_dir: dir.to_string_lossy().into_owned(),
            max_records_per_file: per_file,
            max_files_to_keep: keep,
            ..TelemetryConfig::default()
        }
    }

    fn record() -> TelemetryRecord {
        let decision = Decision {
            mode: Mode::Rc,
            command: ActuatorCommand::neutral(0.46),
            indicator: Mode::Rc.indicator(),
        };
        TelemetryRecord::new(TelemetryEvent::Periodic, &decision, 3, None)
    }

    fn telemetry_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_creates_log_dir() {
        let root = tempdir().unwrap();
        let dir = root.path().join("nested").join("logs");
        let logger = TelemetryLogger::new(&config(&dir, 10, 10)).unwrap();

        assert!(dir.is_dir());
        assert!(logger.current_file().is_none());
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let dir = tempdir().unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 10, 10)).unwrap();

        logger.log(&record()).unwrap();
        logger.log(&record()).unwrap();

        let path = logger.current_file().unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("telemetry_"));
        assert!(name.ends_with(".jsonl"));

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["mode"], "rc");
            assert_eq!(value["indicator_color"], 4);
        }
    }

    #[test]
    fn test_rotates_after_max_records() {
        let dir = tempdir().unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 2, 10)).unwrap();

        for _ in 0..5 {
            logger.log(&record()).unwrap();
        }

        let files = telemetry_files(dir.path());
        assert_eq!(files.len(), 3);
        let counts: Vec<usize> = files
            .iter()
            .map(|f| fs::read_to_string(f).unwrap().lines().count())
            .collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_keeps_newest_files() {
        let dir = tempdir().unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 1, 2)).unwrap();

        for _ in 0..5 {
            logger.log(&record()).unwrap();
        }

        let files = telemetry_files(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files.last(), logger.current_file().as_ref());
        assert!(files[0].to_string_lossy().ends_with("_0003.jsonl"));
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 1, 1)).unwrap();

        for _ in 0..3 {
            logger.log(&record()).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(telemetry_files(dir.path()).len(), 2);
    }
}
