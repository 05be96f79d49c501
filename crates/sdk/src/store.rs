//! Deployment record persistence
//!
//! One JSON document per network, replaced whole on every save. A single
//! writer per document is assumed; concurrent processes writing the same
//! network are not coordinated.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use dex_testbed_types::DeploymentRecord;
use tracing::{debug, warn};

use crate::StoreError;

/// Document name for the default local network.
pub const LOCAL_DOCUMENT: &str = "local";

pub trait DeploymentStore: Send + Sync {
    /// Record for `network`; empty when nothing readable is persisted.
    fn load(&self, network: &str) -> DeploymentRecord;

    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<(), StoreError>;
}

impl dyn DeploymentStore + '_ {
    /// Load once, mutate, then commit the whole record.
    pub fn session(&self, network: &str) -> RecordSession<'_> {
        RecordSession {
            record: self.load(network),
            network: network.to_string(),
            store: self,
        }
    }
}

/// A loaded record bound to the store it came from.
pub struct RecordSession<'a> {
    pub record: DeploymentRecord,
    network: String,
    store: &'a dyn DeploymentStore,
}

impl RecordSession<'_> {
    pub fn commit(&self) -> Result<(), StoreError> {
        self.store.save(&self.network, &self.record)
    }

    pub fn network(&self) -> &str {
        &self.network
    }
}

/// Document name for a network: empty or `localhost` map to `local`.
pub fn document_name(network: &str) -> &str {
    match network {
        "" | "localhost" => LOCAL_DOCUMENT,
        other => other,
    }
}

/// Records stored as `{dir}/{network}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, network: &str) -> PathBuf {
        self.dir.join(format!("{}.json", document_name(network)))
    }
}

impl DeploymentStore for JsonFileStore {
    fn load(&self, network: &str) -> DeploymentRecord {
        let path = self.path_for(network);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No deployment record, starting empty");
                return DeploymentRecord::default();
            }
        };

        match DeploymentRecord::from_json(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable deployment record, starting empty");
                DeploymentRecord::default()
            }
        }
    }

    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<(), StoreError> {
        let path = self.path_for(network);
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_error)?;
        let content = record.to_json_pretty()?;
        fs::write(&path, content).map_err(io_error)?;

        debug!(path = %path.display(), "Deployment record saved");
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, DeploymentRecord>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl DeploymentStore for MemoryStore {
    fn load(&self, network: &str) -> DeploymentRecord {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(document_name(network)).cloned())
            .unwrap_or_default()
    }

    fn save(&self, network: &str, record: &DeploymentRecord) -> Result<(), StoreError> {
        if let Ok(mut records) = self.records.lock() {
            records.insert(document_name(network).to_string(), record.clone());
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
