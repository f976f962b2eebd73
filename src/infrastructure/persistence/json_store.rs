use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::domain::entities::analysis::AnalysisRecord;
use crate::domain::ports::store::{HistoryStore, StoreError};

/// Analysis history persisted as a pretty-printed JSON array.
///
/// Saves write a sibling `.tmp` file and rename it over the target.
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    /// Creates a store at `path`, expanding a leading `~`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::ReadFailed(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| StoreError::ReadFailed(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, records: &[AnalysisRecord]) -> Result<(), StoreError> {
        let write_err = |e: &dyn std::fmt::Display| {
            StoreError::WriteFailed(format!("{}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }

        let json = serde_json::to_string_pretty(records).map_err(|e| write_err(&e))?;
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).map_err(|e| write_err(&e))?;
        file.write_all(json.as_bytes()).map_err(|e| write_err(&e))?;
        file.sync_all().map_err(|e| write_err(&e))?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(|e| write_err(&e))
    }
}
