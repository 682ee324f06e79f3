use super::{IngestError, RecordSet, SpreadsheetLoader};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

/// Names, sizes and modification times of the spreadsheets in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFingerprint {
    files: Vec<FileStamp>,
}

impl DirectoryFingerprint {
    pub fn scan(dir: &Path) -> Result<Self, IngestError> {
        let mut files = Vec::new();
        for path in SpreadsheetLoader::spreadsheet_files(dir)? {
            let metadata = fs::metadata(&path).map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })?;
            files.push(FileStamp {
                len: metadata.len(),
                modified: metadata.modified().ok(),
                path,
            });
        }
        Ok(Self { files })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

struct CachedRecords {
    fingerprint: DirectoryFingerprint,
    records: Arc<RecordSet>,
}

/// Load-once view of the input directory. The record set is reused until the
/// directory fingerprint changes or the cache is invalidated.
pub struct RecordCache {
    directory: PathBuf,
    state: Mutex<Option<CachedRecords>>,
}

impl RecordCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            state: Mutex::new(None),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn get_or_load(&self) -> Result<Arc<RecordSet>, IngestError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let fingerprint = DirectoryFingerprint::scan(&self.directory)?;

        if let Some(cached) = state.as_ref() {
            if cached.fingerprint == fingerprint {
                return Ok(Arc::clone(&cached.records));
            }
            debug!(directory = %self.directory.display(), "input directory changed, reloading");
        }

        let records = Arc::new(SpreadsheetLoader::from_dir(&self.directory)?);
        *state = Some(CachedRecords {
            fingerprint,
            records: Arc::clone(&records),
        });
        Ok(records)
    }

    /// True when nothing is cached yet or the directory no longer matches.
    pub fn is_stale(&self) -> Result<bool, IngestError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.as_ref() {
            Some(cached) => Ok(cached.fingerprint != DirectoryFingerprint::scan(&self.directory)?),
            None => Ok(true),
        }
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.take().is_some() {
            info!(directory = %self.directory.display(), "record cache invalidated");
        }
    }

    pub fn refresh(&self) -> Result<Arc<RecordSet>, IngestError> {
        self.invalidate();
        self.get_or_load()
    }
}
