//! Dashboard store - keep ingested datasets and their KPIs on disk
//!
//! One JSON file per dashboard. A failed write never loses the dashboard:
//! it stays in memory marked [`StorageState::Pending`] until
//! [`DashboardStore::retry_pending`] manages to write it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_success, log_warning};
use crate::error::{StoreError, StoreResult};
use crate::models::{Dataset, Kpi};

/// Directory where dashboards are stored (relative to current dir)
pub const DEFAULT_STORE_DIR: &str = ".kpilens/dashboards";

/// Whether a dashboard has reached disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StorageState {
    /// Written to disk at the given RFC 3339 time
    Stored { at: String },
    /// Only in memory; `reason` is the last write error
    Pending { reason: String },
}

impl StorageState {
    pub fn is_stored(&self) -> bool {
        matches!(self, StorageState::Stored { .. })
    }
}

/// A dataset with its KPIs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Creation timestamp
    pub created_at: String,
    pub dataset: Dataset,
    pub kpis: Vec<Kpi>,
    /// Persistence state
    pub storage: StorageState,
}

/// Summary line for listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub rows: usize,
    pub kpis: usize,
    pub storage: StorageState,
}

impl From<&Dashboard> for DashboardSummary {
    fn from(d: &Dashboard) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            created_at: d.created_at.clone(),
            rows: d.dataset.row_count(),
            kpis: d.kpis.len(),
            storage: d.storage.clone(),
        }
    }
}

/// Store for dashboards
pub struct DashboardStore {
    /// Directory where dashboards are stored
    store_dir: PathBuf,
    /// Loaded dashboards (id -> dashboard)
    dashboards: HashMap<String, Dashboard>,
}

impl DashboardStore {
    /// Create a store in the default directory, loading existing dashboards
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Create a store with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            store_dir: PathBuf::from(dir.as_ref()),
            dashboards: HashMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    /// Load all dashboards from the store directory
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.store_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                match fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|content| Ok(serde_json::from_str::<Dashboard>(&content)?))
                {
                    Ok(dashboard) => {
                        self.dashboards.insert(dashboard.id.clone(), dashboard);
                    }
                    Err(e) => log_warning(format!("Skipping {}: {}", path.display(), e)),
                }
            }
        }
    }

    /// All dashboards, newest first
    pub fn list(&self) -> Vec<&Dashboard> {
        let mut all: Vec<&Dashboard> = self.dashboards.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Get a dashboard by ID
    pub fn get(&self, id: &str) -> Option<&Dashboard> {
        self.dashboards.get(id)
    }

    /// Dashboards not yet written to disk
    pub fn pending(&self) -> Vec<&Dashboard> {
        self.list()
            .into_iter()
            .filter(|d| !d.storage.is_stored())
            .collect()
    }

    /// Save a new dashboard.
    ///
    /// Dashboards left pending by earlier failed writes are retried first.
    /// Always returns the dashboard; check its `storage` to see whether the
    /// write succeeded.
    pub fn save(&mut self, name: &str, dataset: Dataset, kpis: Vec<Kpi>) -> &Dashboard {
        if !self.pending().is_empty() {
            let written = self.retry_pending();
            if written > 0 {
                log_success(format!("{} pending dashboards written", written));
            }
        }

        let id = self.generate_id(name);
        let mut dashboard = Dashboard {
            id: id.clone(),
            name: name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            dataset,
            kpis,
            storage: StorageState::Pending {
                reason: "not written yet".to_string(),
            },
        };

        dashboard.storage = self.write(&dashboard);
        match &dashboard.storage {
            StorageState::Stored { .. } => log_success(format!("Dashboard saved as: {}", id)),
            StorageState::Pending { reason } => {
                log_warning(format!("Dashboard {} kept in memory only: {}", id, reason))
            }
        }

        self.dashboards.entry(id).or_insert(dashboard)
    }

    /// Try to write every pending dashboard again. Returns how many made it.
    pub fn retry_pending(&mut self) -> usize {
        let pending: Vec<String> = self
            .dashboards
            .values()
            .filter(|d| !d.storage.is_stored())
            .map(|d| d.id.clone())
            .collect();

        let mut written = 0;
        for id in pending {
            let state = match self.dashboards.get(&id) {
                Some(dashboard) => self.write(dashboard),
                None => continue,
            };
            if state.is_stored() {
                written += 1;
            }
            if let Some(dashboard) = self.dashboards.get_mut(&id) {
                dashboard.storage = state;
            }
        }
        written
    }

    /// Delete a dashboard from memory and disk
    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        let dashboard = self
            .dashboards
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if dashboard.storage.is_stored() {
            fs::remove_file(self.path_for(id))?;
        }
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.store_dir.join(format!("{}.json", id))
    }

    fn write(&self, dashboard: &Dashboard) -> StorageState {
        let at = chrono::Utc::now().to_rfc3339();
        let mut stored = dashboard.clone();
        stored.storage = StorageState::Stored { at: at.clone() };

        match self.write_file(&stored) {
            Ok(()) => StorageState::Stored { at },
            Err(e) => StorageState::Pending {
                reason: e.to_string(),
            },
        }
    }

    fn write_file(&self, dashboard: &Dashboard) -> StoreResult<()> {
        fs::create_dir_all(&self.store_dir)?;
        let content = serde_json::to_string_pretty(dashboard)?;
        fs::write(self.path_for(&dashboard.id), content)?;
        Ok(())
    }

    /// Generate a unique ID from a name
    fn generate_id(&self, name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "dashboard".to_string() } else { slug };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut id = format!("{}-{}", slug, timestamp);
        let mut n = 2;
        while self.dashboards.contains_key(&id) {
            id = format!("{}-{}-{}", slug, timestamp, n);
            n += 1;
        }
        id
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}
