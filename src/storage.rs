//! Append-only result sink and configuration persistence

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::CrawlerConfig;
use crate::models::{PageResult, UrlItem};

const RESULTS_FILE: &str = "sitemap.jsonl";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent storage for crawl output: one JSON object per line appended to
/// `sitemap.jsonl`, plus the crawl configuration in `config.json`.
///
/// Appends are serialized by an internal mutex; flushes during the crawl are
/// best-effort, while `close` guarantees a durable flush.
pub struct Storage {
    data_dir: PathBuf,
    results: Mutex<BufWriter<File>>,
}

impl Storage {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_dir.join(RESULTS_FILE))?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            results: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one page record. Exactly one line per attempted URL.
    pub fn append_result(&self, result: &PageResult) -> Result<(), StorageError> {
        let line = serde_json::to_string(result)?;
        let mut writer = self.results.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn close(&self) -> Result<(), StorageError> {
        self.results.lock().flush()?;
        Ok(())
    }

    pub fn save_config(&self, config: &CrawlerConfig) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(config)?;
        std::fs::write(self.data_dir.join(CONFIG_FILE), data)?;
        Ok(())
    }

    pub fn load_config(data_dir: &Path) -> Result<CrawlerConfig, StorageError> {
        let data = std::fs::read_to_string(data_dir.join(CONFIG_FILE))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Pending URLs from a previous run. Frontier state is not persisted, so
    /// resume starts from the configured seeds.
    pub fn load_pending_urls(&self) -> Result<Vec<UrlItem>, StorageError> {
        Ok(Vec::new())
    }

    /// Read every parseable record back; malformed lines are skipped.
    pub fn load_results(data_dir: &Path) -> Result<Vec<PageResult>, StorageError> {
        let path = data_dir.join(RESULTS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut results = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let Ok(result) = serde_json::from_str::<PageResult>(&line) {
                results.push(result);
            }
        }
        Ok(results)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        let _ = self.results.lock().flush();
    }
}
