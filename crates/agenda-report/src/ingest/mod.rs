mod cache;
mod normalizer;
mod parser;

use crate::scheduling::SchedulingRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use cache::{DirectoryFingerprint, RecordCache};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        source: calamine::Error,
    },
    #[error("invalid CSV data in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{} has no '{column}' column", path.display())]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },
    #[error("no spreadsheet files found in {}", .0.display())]
    Empty(PathBuf),
}

/// Union of every row loaded from the input directory.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<SchedulingRecord>,
    files: Vec<PathBuf>,
    undated: usize,
}

impl RecordSet {
    pub fn new(records: Vec<SchedulingRecord>) -> Self {
        let undated = records
            .iter()
            .filter(|record| record.completed_on.is_none())
            .count();
        Self {
            records,
            files: Vec::new(),
            undated,
        }
    }

    pub fn records(&self) -> &[SchedulingRecord] {
        &self.records
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Rows whose completion date was blank or unparseable.
    pub fn undated(&self) -> usize {
        self.undated
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct SpreadsheetLoader;

impl SpreadsheetLoader {
    pub fn is_supported(path: &Path) -> bool {
        let hidden_lock = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$") || name.starts_with('.'));
        if hidden_lock || !path.is_file() {
            return false;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| ext == "csv" || WORKBOOK_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Supported files directly inside `dir`, sorted by path.
    pub fn spreadsheet_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let io_error = |source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if Self::is_supported(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn from_dir(dir: &Path) -> Result<RecordSet, IngestError> {
        let files = Self::spreadsheet_files(dir)?;
        if files.is_empty() {
            return Err(IngestError::Empty(dir.to_path_buf()));
        }

        let mut set = RecordSet::default();
        for path in &files {
            let records = Self::from_path(path)?;
            set.undated += records
                .iter()
                .filter(|record| record.completed_on.is_none())
                .count();
            set.records.extend(records);
        }
        set.files = files;

        info!(
            directory = %dir.display(),
            files = set.files.len(),
            records = set.records.len(),
            undated = set.undated,
            "scheduling records loaded"
        );
        Ok(set)
    }

    pub fn from_path(path: &Path) -> Result<Vec<SchedulingRecord>, IngestError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let sheet = if is_csv {
            let file = fs::File::open(path).map_err(|source| IngestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parser::read_csv(file, path)?
        } else {
            parser::read_workbook(path)?
        };

        if sheet.undated > 0 {
            debug!(
                file = %path.display(),
                undated = sheet.undated,
                "rows without a usable completion date"
            );
        }
        Ok(sheet.records)
    }
}
