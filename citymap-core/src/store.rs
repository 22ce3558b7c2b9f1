//! Map persistence.
//!
//! The core reads and writes through the [`MapStore`] trait. [`JsonStore`]
//! keeps the whole map in one versioned JSON document and replaces the file
//! atomically on every change.

use crate::axis::{AxisKind, NamedAxis};
use crate::grid::GridPoint;
use crate::registry::{Category, Intersection, RawEntity};
use crate::sync::NextRefresh;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Current map file version.
const MAP_VERSION: u32 = 1;

/// How many recent destinations are remembered.
pub const RECENT_DESTINATION_LIMIT: usize = 10;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("No {category} named {name} in store")]
    UnknownEntity { category: Category, name: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage interface consumed by the core.
#[async_trait]
pub trait MapStore: Send + Sync {
    /// Street names of one axis. An empty axis means no data.
    async fn axis(&self, kind: AxisKind) -> Result<NamedAxis, StoreError>;

    /// Provisioned landmarks of a category.
    async fn raw_entities(&self, category: Category) -> Result<Vec<RawEntity>, StoreError>;

    /// When the category may next be refreshed from the catalog.
    async fn next_refresh(&self, category: Category) -> Result<NextRefresh, StoreError>;

    /// Set one landmark's address (`None` for "NA") and the category's next
    /// refresh time.
    async fn set_entity_location(
        &self,
        category: Category,
        name: &str,
        location: Option<Intersection>,
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError>;

    /// Reset every landmark of the category to "NA", then apply `locations`,
    /// as a single write. Names the category does not provision are ignored.
    async fn commit_category(
        &self,
        category: Category,
        locations: &[(String, Intersection)],
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError>;

    async fn destination(&self) -> Result<Option<GridPoint>, StoreError>;

    /// Set the destination and push it onto the recent list.
    async fn set_destination(&self, destination: GridPoint) -> Result<(), StoreError>;

    async fn clear_destination(&self) -> Result<(), StoreError>;

    /// Recently set destinations, most recent first.
    async fn recent_destinations(&self) -> Result<Vec<GridPoint>, StoreError>;

    async fn zoom_level(&self) -> Result<Option<i32>, StoreError>;

    async fn set_zoom_level(&self, zoom: i32) -> Result<(), StoreError>;
}

/// One category's landmarks and refresh schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub rows: Vec<RawEntity>,

    #[serde(default)]
    pub next_refresh: NextRefresh,
}

/// The persisted map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMap {
    /// Format version for compatibility checking.
    pub version: u32,

    /// When the document was last written.
    #[serde(default)]
    pub saved_at: String,

    #[serde(default)]
    pub columns: NamedAxis,

    #[serde(default)]
    pub rows: NamedAxis,

    #[serde(default)]
    pub categories: BTreeMap<Category, CategoryTable>,

    #[serde(default)]
    pub destination: Option<GridPoint>,

    #[serde(default)]
    pub recent_destinations: Vec<GridPoint>,

    #[serde(default)]
    pub zoom_level: Option<i32>,
}

impl Default for SavedMap {
    fn default() -> Self {
        Self {
            version: MAP_VERSION,
            saved_at: String::new(),
            columns: NamedAxis::default(),
            rows: NamedAxis::default(),
            categories: BTreeMap::new(),
            destination: None,
            recent_destinations: Vec::new(),
            zoom_level: None,
        }
    }
}

impl SavedMap {
    /// A map with the given axes and no landmarks.
    pub fn new(columns: NamedAxis, rows: NamedAxis) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Add a category's rows.
    pub fn with_category(mut self, category: Category, rows: Vec<RawEntity>) -> Self {
        self.categories.entry(category).or_default().rows = rows;
        self
    }

    pub fn axis(&self, kind: AxisKind) -> &NamedAxis {
        match kind {
            AxisKind::Column => &self.columns,
            AxisKind::Row => &self.rows,
        }
    }

    pub fn raw_entities(&self, category: Category) -> Vec<RawEntity> {
        self.categories
            .get(&category)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn next_refresh(&self, category: Category) -> NextRefresh {
        self.categories
            .get(&category)
            .map(|t| t.next_refresh)
            .unwrap_or_default()
    }

    pub fn set_entity_location(
        &mut self,
        category: Category,
        name: &str,
        location: Option<Intersection>,
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError> {
        let unknown = || StoreError::UnknownEntity {
            category,
            name: name.to_string(),
        };
        let table = self.categories.get_mut(&category).ok_or_else(unknown)?;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(unknown)?;
        place(row, location);
        table.next_refresh = next_refresh;
        Ok(())
    }

    pub fn commit_category(
        &mut self,
        category: Category,
        locations: &[(String, Intersection)],
        next_refresh: NextRefresh,
    ) {
        let table = self.categories.entry(category).or_default();
        for row in &mut table.rows {
            place(row, None);
        }
        for (name, intersection) in locations {
            if let Some(row) = table.rows.iter_mut().find(|r| &r.name == name) {
                place(row, Some(intersection.clone()));
            }
        }
        table.next_refresh = next_refresh;
    }

    pub fn set_destination(&mut self, destination: GridPoint) {
        self.destination = Some(destination);
        self.recent_destinations.retain(|d| *d != destination);
        self.recent_destinations.insert(0, destination);
        self.recent_destinations.truncate(RECENT_DESTINATION_LIMIT);
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
    }

    /// Save to a JSON file, replacing it atomically.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let mut document = self.clone();
        document.saved_at = chrono::Utc::now().to_rfc3339();
        let content = serde_json::to_string_pretty(&document)?;

        let staging = staging_path(path);
        fs::write(&staging, content).await?;
        fs::rename(&staging, path).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != MAP_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: MAP_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }
}

fn place(row: &mut RawEntity, location: Option<Intersection>) {
    match location {
        Some(intersection) => {
            row.column = Some(intersection.column);
            row.row = Some(intersection.row);
        }
        None => {
            row.column = None;
            row.row = None;
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A [`MapStore`] backed by one JSON file.
///
/// The document is held in memory; each change is written to disk before it
/// is made visible, so a failed write leaves both the file and the in-memory
/// copy as they were.
pub struct JsonStore {
    path: PathBuf,
    map: Mutex<SavedMap>,
}

impl JsonStore {
    /// Open an existing map file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map = SavedMap::load_json(&path).await?;
        info!(path = %path.display(), "opened map store");
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Write `map` to `path` and open it.
    pub async fn create(path: impl Into<PathBuf>, map: SavedMap) -> Result<Self, StoreError> {
        let path = path.into();
        map.save_json(&path).await?;
        info!(path = %path.display(), "created map store");
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current document.
    pub async fn snapshot(&self) -> SavedMap {
        self.map.lock().await.clone()
    }

    async fn read<T>(&self, f: impl FnOnce(&SavedMap) -> T) -> T {
        let map = self.map.lock().await;
        f(&map)
    }

    async fn update<T>(
        &self,
        f: impl FnOnce(&mut SavedMap) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut map = self.map.lock().await;
        let mut next = map.clone();
        let value = f(&mut next)?;
        next.save_json(&self.path).await?;
        *map = next;
        debug!(path = %self.path.display(), "map store written");
        Ok(value)
    }
}

#[async_trait]
impl MapStore for JsonStore {
    async fn axis(&self, kind: AxisKind) -> Result<NamedAxis, StoreError> {
        Ok(self.read(|m| m.axis(kind).clone()).await)
    }

    async fn raw_entities(&self, category: Category) -> Result<Vec<RawEntity>, StoreError> {
        Ok(self.read(|m| m.raw_entities(category)).await)
    }

    async fn next_refresh(&self, category: Category) -> Result<NextRefresh, StoreError> {
        Ok(self.read(|m| m.next_refresh(category)).await)
    }

    async fn set_entity_location(
        &self,
        category: Category,
        name: &str,
        location: Option<Intersection>,
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError> {
        self.update(|m| m.set_entity_location(category, name, location, next_refresh))
            .await
    }

    async fn commit_category(
        &self,
        category: Category,
        locations: &[(String, Intersection)],
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError> {
        self.update(|m| {
            m.commit_category(category, locations, next_refresh);
            Ok(())
        })
        .await
    }

    async fn destination(&self) -> Result<Option<GridPoint>, StoreError> {
        Ok(self.read(|m| m.destination).await)
    }

    async fn set_destination(&self, destination: GridPoint) -> Result<(), StoreError> {
        self.update(|m| {
            m.set_destination(destination);
            Ok(())
        })
        .await
    }

    async fn clear_destination(&self) -> Result<(), StoreError> {
        self.update(|m| {
            m.clear_destination();
            Ok(())
        })
        .await
    }

    async fn recent_destinations(&self) -> Result<Vec<GridPoint>, StoreError> {
        Ok(self.read(|m| m.recent_destinations.clone()).await)
    }

    async fn zoom_level(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.read(|m| m.zoom_level).await)
    }

    async fn set_zoom_level(&self, zoom: i32) -> Result<(), StoreError> {
        self.update(|m| {
            m.zoom_level = Some(zoom);
            Ok(())
        })
        .await
    }
}
