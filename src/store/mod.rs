use crate::registry::GroupRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Durable fire markers: entity id -> event key -> last fired date.
pub type FireRecords = BTreeMap<String, BTreeMap<String, NaiveDate>>;

/// The whole persisted document: entities plus fire records.
///
/// Read and written as a unit; there is no partial-field API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub entities: BTreeMap<String, GroupRecord>,

    #[serde(rename = "fireRecords", default)]
    pub fire_records: FireRecords,
}

/// Whole-document JSON persistence for scheduler state.
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the persisted document.
    ///
    /// A missing or unparseable file yields an empty valid document: the
    /// scheduler must always be able to start cold.
    pub fn load(&self) -> StateDocument {
        if !self.path.exists() {
            info!(
                path = %self.path.display(),
                "No persisted state, starting cold"
            );
            return StateDocument::default();
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read persisted state, starting cold"
                );
                return StateDocument::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt persisted state, starting cold"
                );
                StateDocument::default()
            }
        }
    }

    /// Save the document atomically: write to a temp file, fsync, rename.
    /// A crash mid-write leaves the previously committed store intact.
    pub fn save(&self, document: &StateDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)
            .context("Failed to serialize schedule state to JSON")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create state directory")?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");

        {
            let mut tmp_file =
                File::create(&tmp_path).context("Failed to create temporary state file")?;
            tmp_file
                .write_all(json.as_bytes())
                .context("Failed to write state data")?;
            tmp_file
                .sync_all()
                .context("Failed to sync state file to disk")?;
        }

        fs::rename(&tmp_path, &self.path)
            .context("Failed to rename temporary state file")?;

        Ok(())
    }
}
