//! Catalog synchronization.
//!
//! The [`SyncScheduler`] pulls the external catalog page, rebuilds one
//! category's coordinates from it, and records when the category may be
//! refreshed again. A refresh is staged in full before anything is written:
//! a failed fetch, a missing section or a failed store write leaves both the
//! registry and the store exactly as they were.

mod countdown;

pub use countdown::{parse_countdown, NextRefresh};

use crate::axis::AxisModel;
use crate::registry::{
    Category, Intersection, PointOfInterestRegistry, Skip, SkipReason,
};
use crate::store::{MapStore, StoreError};
use async_trait::async_trait;
use catalog::{CatalogClient, CatalogPage, Section};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a catalog refresh.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} is not listed in the catalog")]
    NotInCatalog(Category),

    #[error("Catalog page has no {0} section")]
    SectionMissing(Category),

    #[error("A refresh is already in progress")]
    AlreadyRunning,

    #[error("Catalog fetch failed: {0}")]
    Fetch(#[from] catalog::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Source of the raw catalog markup.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self) -> Result<String, catalog::Error>;
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_page(&self) -> Result<String, catalog::Error> {
        CatalogClient::fetch_page(self).await
    }
}

/// The catalog section that lists a category, if any.
pub fn catalog_section(category: Category) -> Option<Section> {
    match category {
        Category::Guild => Some(Section::Guilds),
        Category::Shop => Some(Section::Shops),
        _ => None,
    }
}

/// Categories the catalog lists.
pub fn catalog_categories() -> impl Iterator<Item = Category> {
    Category::all()
        .into_iter()
        .filter(|c| catalog_section(*c).is_some())
}

/// Outcome of one successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub category: Category,
    pub next_refresh: NextRefresh,
    /// Landmarks placed from the catalog.
    pub updated: usize,
    /// Landmarks left without a location.
    pub unresolved: usize,
    /// Provisioned landmarks left unplaced because their catalog row was
    /// malformed.
    pub reset_malformed: usize,
    /// Catalog rows that could not be applied.
    pub dropped: Vec<Skip>,
}

/// Fetches the catalog and reconciles it with the registry.
pub struct SyncScheduler {
    source: Box<dyn CatalogSource>,
    records: Mutex<HashMap<Category, NextRefresh>>,
    running: AtomicBool,
}

/// Clears the in-progress flag when a refresh ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncScheduler {
    pub fn new(source: Box<dyn CatalogSource>) -> Self {
        Self {
            source,
            records: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Read every catalog category's next refresh time from the store.
    pub async fn load_records(&self, store: &dyn MapStore) -> Result<(), StoreError> {
        for category in catalog_categories() {
            let next = store.next_refresh(category).await?;
            self.set_record(category, next);
        }
        Ok(())
    }

    /// When the category may next be refreshed.
    pub fn next_refresh(&self, category: Category) -> NextRefresh {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
            .copied()
            .unwrap_or_default()
    }

    /// Whether the category is listed in the catalog and eligible at `now`.
    pub fn is_due(&self, category: Category, now: DateTime<Utc>) -> bool {
        catalog_section(category).is_some() && self.next_refresh(category).is_due(now)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Refresh every catalog category that is due.
    ///
    /// Stops at the first failure; categories refreshed before it stay
    /// committed.
    pub async fn refresh_due(
        &self,
        registry: &mut PointOfInterestRegistry,
        axes: &AxisModel,
        store: &dyn MapStore,
        now: DateTime<Utc>,
    ) -> Result<Vec<SyncReport>, SyncError> {
        let mut reports = Vec::new();
        for category in catalog_categories() {
            if !self.is_due(category, now) {
                debug!(category = %category, next = %self.next_refresh(category), "not due");
                continue;
            }
            reports.push(self.refresh(category, registry, axes, store, now).await?);
        }
        Ok(reports)
    }

    /// Rebuild one category from the catalog, regardless of eligibility.
    pub async fn refresh(
        &self,
        category: Category,
        registry: &mut PointOfInterestRegistry,
        axes: &AxisModel,
        store: &dyn MapStore,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        let section = catalog_section(category).ok_or(SyncError::NotInCatalog(category))?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(category = %category, "refresh already in progress");
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        info!(category = %category, "refreshing from catalog");
        let markup = self.source.fetch_page().await.map_err(|e| {
            warn!(category = %category, error = %e, "catalog fetch failed");
            SyncError::Fetch(e)
        })?;

        let data = CatalogPage::parse(&markup)
            .into_section(section)
            .ok_or(SyncError::SectionMissing(category))?;

        let next_refresh = parse_countdown(data.countdown.as_deref(), now);
        if next_refresh == NextRefresh::Anytime {
            warn!(category = %category, "no countdown found, next refresh set to NA");
        }

        // Stage the reset and rewrite on a copy of the category.
        let mut staged = PointOfInterestRegistry::new();
        staged.replace_category(category, registry.entities_of(category).to_vec());
        staged.reset_category(category);

        let mut dropped: Vec<Skip> = data
            .malformed
            .into_iter()
            .map(|row| Skip {
                category,
                name: row.name,
                intersection: None,
                reason: SkipReason::MalformedLocation(row.location),
            })
            .collect();

        for row in data.rows {
            let intersection = Intersection::new(row.column, row.row);
            match staged.set_location(axes, category, &row.name, intersection.clone()) {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(category = %category, name = %row.name, error = %e, "catalog row has unknown street");
                    dropped.push(Skip {
                        category,
                        name: row.name,
                        intersection: Some(intersection),
                        reason: SkipReason::UnknownStreet(e),
                    });
                }
                Err(_) => {
                    debug!(category = %category, name = %row.name, "catalog row is not a known landmark");
                    dropped.push(Skip {
                        category,
                        name: row.name,
                        intersection: Some(intersection),
                        reason: SkipReason::NotProvisioned,
                    });
                }
            }
        }

        // Later rows for the same name win, so the store gets what was staged.
        let locations: Vec<(String, Intersection)> = staged
            .entities_of(category)
            .iter()
            .filter_map(|e| e.intersection.clone().map(|at| (e.name.clone(), at)))
            .collect();

        let reset_malformed = dropped
            .iter()
            .filter(|skip| matches!(skip.reason, SkipReason::MalformedLocation(_)))
            .filter(|skip| {
                staged
                    .get(category, &skip.name)
                    .is_some_and(|e| !e.is_resolved())
            })
            .count();
        if reset_malformed > 0 {
            warn!(category = %category, reset_malformed, "landmarks reset by malformed catalog rows");
        }

        store
            .commit_category(category, &locations, next_refresh)
            .await?;

        let entities = staged.entities_of(category).to_vec();
        let updated = entities.iter().filter(|e| e.is_resolved()).count();
        let unresolved = entities.len() - updated;
        registry.replace_category(category, entities);
        self.set_record(category, next_refresh);

        info!(
            category = %category,
            updated,
            unresolved,
            dropped = dropped.len(),
            next = %next_refresh,
            "refresh complete"
        );

        Ok(SyncReport {
            category,
            next_refresh,
            updated,
            unresolved,
            reset_malformed,
            dropped,
        })
    }

    fn set_record(&self, category: Category, next: NextRefresh) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category, next);
    }
}
