use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::{
    fs::operations::{ends_with_newline, read_last_line},
    utils::dir::log_file_path,
};

use super::record::{header_row, LogRecord};

/// Rows read back from the log, plus how many rows could not be decoded.
#[derive(Debug, Default)]
pub struct LogContents {
    pub records: Vec<LogRecord>,
    pub skipped: usize,
}

/// Append-only CSV log: one header row, then one row per flushed interval.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: log_file_path(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Appends one row, writing the header first if the file is new. Returns once the data has
    /// been handed to the disk.
    pub async fn append(&self, record: &LogRecord) -> Result<()> {
        let mut file = File::options()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;

        file.lock_exclusive()?;
        let result = Self::append_with_file(&mut file, record).await;
        file.unlock_async().await?;
        result
    }

    async fn append_with_file(file: &mut File, record: &LogRecord) -> Result<()> {
        let mut buffer = String::new();
        if file.metadata().await?.len() == 0 {
            buffer.push_str(&header_row());
            buffer.push('\n');
        } else if !ends_with_newline(file).await? {
            // Previous write was cut short, keep the torn row on its own line.
            warn!("Log file doesn't end with a newline, starting a new row");
            buffer.push('\n');
        }
        buffer.push_str(&record.to_row());
        buffer.push('\n');

        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    /// Reads every row. Rows that fail to decode are skipped with a warning. A missing file
    /// reads as empty.
    pub async fn read_all(&self) -> Result<LogContents> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogContents::default()),
            Err(e) => Err(e)?,
        };
        debug!("Reading {:?}", self.path);
        file.lock_shared()?;

        let header = header_row();
        let mut contents = LogContents::default();
        let mut reader = BufReader::new(file);
        let mut buffer = Vec::new();
        let mut line_number = 0usize;
        while reader.read_until(b'\n', &mut buffer).await? > 0 {
            line_number += 1;
            let line = std::str::from_utf8(&buffer).map(|l| l.trim_end_matches(['\r', '\n']));
            let parsed = match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) if line_number == 1 && line == header => None,
                Ok(line) => Some(LogRecord::parse_row(line).map_err(anyhow::Error::from)),
                Err(e) => Some(Err(e.into())),
            };
            match parsed {
                None => (),
                Some(Ok(record)) => contents.records.push(record),
                Some(Err(e)) => {
                    warn!(
                        "Skipping malformed row {line_number} in {:?}: {e}",
                        self.path
                    );
                    contents.skipped += 1;
                }
            }
            buffer.clear();
        }

        reader.into_inner().unlock_async().await?;
        Ok(contents)
    }

    /// The most recently written row, if any.
    pub async fn last_record(&self) -> Result<Option<LogRecord>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let last_line = read_last_line(&mut file).await;
        file.unlock_async().await?;

        let last_line = last_line?;
        if last_line.is_empty() || last_line == header_row() {
            return Ok(None);
        }
        Ok(Some(LogRecord::parse_row(&last_line)?))
    }
}
