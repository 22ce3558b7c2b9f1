//! Navigator - the primary public API for the city map.
//!
//! This module wraps the axis model, landmark registry, viewport and catalog
//! sync behind one object that is loaded once from a [`MapStore`] and then
//! driven by the presentation layer: push the tracked position in, read
//! plain values back out.

use crate::axis::{AxisError, AxisKind, AxisModel};
use crate::grid::GridPoint;
use crate::proximity::{Nearby, ProximityIndex};
use crate::registry::{
    self, BuildReport, Category, Entity, Intersection, PointOfInterestRegistry, RegistryError,
};
use crate::route::{RouteOptions, RoutePlanner};
use crate::store::{MapStore, StoreError};
use crate::sync::{CatalogSource, SyncError, SyncReport, SyncScheduler};
use crate::viewport::{
    ViewportController, ViewportError, ZoomRange, DEFAULT_CANVAS_SIZE, DEFAULT_MAX_ZOOM,
    DEFAULT_MIN_ZOOM,
};
use catalog::{CatalogClient, ClientConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Catalog connection settings.
pub type SyncConfig = ClientConfig;

/// Errors from Navigator operations.
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("No {0} street data in store; cannot build the map")]
    NoAxisData(AxisKind),

    #[error("Street lookup failed: {0}")]
    Axis(#[from] AxisError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Viewport error: {0}")]
    Viewport(#[from] ViewportError),

    #[error("Catalog client error: {0}")]
    Catalog(#[from] catalog::Error),
}

/// Configuration for loading a [`Navigator`].
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Closest zoom (odd).
    pub min_zoom: i32,

    /// Widest zoom (odd).
    pub max_zoom: i32,

    /// Minimap canvas edge in pixels.
    pub canvas_size: u32,

    /// Catalog connection settings.
    pub sync: SyncConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigatorConfig {
    pub fn new() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            canvas_size: DEFAULT_CANVAS_SIZE,
            sync: SyncConfig::default(),
        }
    }

    /// Set the allowed zoom levels. Both must be odd.
    pub fn with_zoom_range(mut self, min: i32, max: i32) -> Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    pub fn with_canvas_size(mut self, pixels: u32) -> Self {
        self.canvas_size = pixels;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}

/// A landmark as shown in the info panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Landmark {
    pub category: Category,
    pub name: String,
    /// Street address, e.g. `"Alder & 2nd"`.
    pub intersection: String,
    /// Cell a player walks to.
    pub point: GridPoint,
    /// AP to walk there.
    pub cost: u32,
}

/// The destination as shown in the info panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationInfo {
    pub point: GridPoint,
    pub intersection: String,
    pub cost: u32,
    /// A place of interest at the destination cell, if any.
    pub place: Option<String>,
}

/// Best transit route to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitSummary {
    pub boarding: String,
    pub alighting: String,
    pub cost: u32,
}

/// Everything the info panel shows for the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Briefing {
    pub position: GridPoint,
    pub location: String,
    pub nearest_bank: Option<Landmark>,
    pub nearest_transit: Option<Landmark>,
    pub nearest_tavern: Option<Landmark>,
    pub destination: Option<DestinationInfo>,
    /// `None` when there is no destination or no resolved station.
    pub transit: Option<TransitSummary>,
}

/// The loaded city map.
pub struct Navigator {
    store: Arc<dyn MapStore>,
    axes: AxisModel,
    registry: PointOfInterestRegistry,
    load_report: BuildReport,
    viewport: ViewportController,
    scheduler: SyncScheduler,
    position: Option<GridPoint>,
    destination: Option<GridPoint>,
}

impl Navigator {
    /// Load the map from `store`, syncing against `source`.
    ///
    /// Fails with [`NavigatorError::NoAxisData`] if either street axis is
    /// empty. Missing destination and zoom fall back to none and the closest
    /// zoom.
    pub async fn load(
        store: Arc<dyn MapStore>,
        source: Box<dyn CatalogSource>,
        config: NavigatorConfig,
    ) -> Result<Self, NavigatorError> {
        let columns = store.axis(AxisKind::Column).await?;
        let rows = store.axis(AxisKind::Row).await?;
        let axes = AxisModel::new(columns, rows).map_err(|e| match e {
            AxisError::Empty(kind) => NavigatorError::NoAxisData(kind),
            other => NavigatorError::Axis(other),
        })?;

        let mut raw = Vec::new();
        for category in Category::all() {
            raw.push((category, store.raw_entities(category).await?));
        }
        let (registry, load_report) = PointOfInterestRegistry::from_rows(&axes, raw);
        if !load_report.skipped.is_empty() {
            warn!(skipped = load_report.skipped.len(), "some landmarks could not be placed");
        }

        let range = ZoomRange::new(config.min_zoom, config.max_zoom)?;
        let zoom = store.zoom_level().await?.unwrap_or(range.min());
        let viewport = ViewportController::new(axes.bounds(), range, config.canvas_size, zoom)?;

        let scheduler = SyncScheduler::new(source);
        scheduler.load_records(store.as_ref()).await?;

        let destination = store.destination().await?;

        info!(
            columns = axes.columns().len(),
            rows = axes.rows().len(),
            landmarks = load_report.loaded,
            unplaced = load_report.unplaced,
            zoom = viewport.zoom_level(),
            "map loaded"
        );

        Ok(Self {
            store,
            axes,
            registry,
            load_report,
            viewport,
            scheduler,
            position: None,
            destination,
        })
    }

    /// Load the map and sync against the live catalog described by
    /// `config.sync`.
    pub async fn connect(
        store: Arc<dyn MapStore>,
        config: NavigatorConfig,
    ) -> Result<Self, NavigatorError> {
        let client = CatalogClient::new(config.sync.clone())?;
        Self::load(store, Box::new(client), config).await
    }

    pub fn axes(&self) -> &AxisModel {
        &self.axes
    }

    pub fn registry(&self) -> &PointOfInterestRegistry {
        &self.registry
    }

    /// What happened to each provisioned row at load.
    pub fn load_report(&self) -> &BuildReport {
        &self.load_report
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    // ========================================================================
    // Position and queries
    // ========================================================================

    /// Record the tracked position and center the minimap on it.
    pub fn update_position(&mut self, position: GridPoint) {
        self.position = Some(position);
        self.viewport.recenter(position);
    }

    pub fn position(&self) -> Option<GridPoint> {
        self.position
    }

    /// The tracked position, or the viewport center before one is known.
    pub fn reference_point(&self) -> GridPoint {
        self.position.unwrap_or_else(|| self.viewport.center())
    }

    /// Cell southeast of a named intersection.
    pub fn cell_at(&self, column: &str, row: &str) -> Result<GridPoint, NavigatorError> {
        Ok(self.axes.resolve_intersection(column, row)?.southeast())
    }

    /// `"<column> & <row>"` for a cell, or "Edge of Map".
    pub fn intersection_name(&self, point: GridPoint) -> String {
        self.axes.intersection_name(point)
    }

    /// Resolved landmarks of a category, nearest to the reference point first.
    pub fn nearest(&self, category: Category) -> Vec<Nearby<'_>> {
        ProximityIndex::new(&self.registry).nearest(category, self.reference_point())
    }

    pub fn entities_at(&self, point: GridPoint) -> Vec<&Entity> {
        self.registry.entities_at(point)
    }

    /// Direct and transit costs from the reference point to `to`.
    pub fn route_to(&self, to: GridPoint) -> RouteOptions<'_> {
        RoutePlanner::new(&self.registry).options(self.reference_point(), to)
    }

    /// The info panel for the reference point.
    pub fn briefing(&self) -> Briefing {
        let position = self.reference_point();
        let proximity = ProximityIndex::new(&self.registry);
        let landmark = |category| {
            proximity
                .closest(category, position)
                .map(|hit| self.landmark(hit))
        };

        let destination = self.destination.map(|point| DestinationInfo {
            point,
            intersection: self.axes.intersection_name(point),
            cost: RoutePlanner::new(&self.registry).direct_cost(position, point),
            place: self
                .registry
                .entities_at(point)
                .into_iter()
                .find(|e| e.category == Category::PlaceOfInterest)
                .map(|e| e.name.clone()),
        });

        let transit = self.destination.and_then(|point| {
            let route = RoutePlanner::new(&self.registry).transit_cost(position, point)?;
            Some(TransitSummary {
                boarding: route.boarding.name().to_string(),
                alighting: route.alighting.name().to_string(),
                cost: route.total_cost(),
            })
        });

        Briefing {
            position,
            location: self.axes.intersection_name(position),
            nearest_bank: landmark(Category::Bank),
            nearest_transit: landmark(Category::Transit),
            nearest_tavern: landmark(Category::Tavern),
            destination,
            transit,
        }
    }

    fn landmark(&self, hit: Nearby<'_>) -> Landmark {
        let intersection = hit
            .entity
            .intersection
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| self.axes.intersection_name(hit.point));
        Landmark {
            category: hit.entity.category,
            name: hit.entity.name.clone(),
            intersection,
            point: hit.point,
            cost: hit.distance,
        }
    }

    // ========================================================================
    // Destination
    // ========================================================================

    pub fn destination(&self) -> Option<GridPoint> {
        self.destination
    }

    /// Set and persist the destination.
    pub async fn set_destination(&mut self, point: GridPoint) -> Result<(), NavigatorError> {
        self.store.set_destination(point).await?;
        self.destination = Some(point);
        info!(destination = %point, "destination set");
        Ok(())
    }

    /// Set the destination to the cell southeast of a named intersection.
    pub async fn set_destination_to(
        &mut self,
        column: &str,
        row: &str,
    ) -> Result<GridPoint, NavigatorError> {
        let point = self.cell_at(column, row)?;
        self.set_destination(point).await?;
        Ok(point)
    }

    pub async fn clear_destination(&mut self) -> Result<(), NavigatorError> {
        self.store.clear_destination().await?;
        self.destination = None;
        info!("destination cleared");
        Ok(())
    }

    /// Recently used destinations, most recent first.
    pub async fn recent_destinations(&self) -> Result<Vec<GridPoint>, NavigatorError> {
        Ok(self.store.recent_destinations().await?)
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    pub async fn zoom_in(&mut self) -> Result<bool, NavigatorError> {
        let changed = self.viewport.zoom_in();
        self.persist_zoom(changed).await?;
        Ok(changed)
    }

    pub async fn zoom_out(&mut self) -> Result<bool, NavigatorError> {
        let changed = self.viewport.zoom_out();
        self.persist_zoom(changed).await?;
        Ok(changed)
    }

    pub async fn set_zoom(&mut self, zoom: i32) -> Result<bool, NavigatorError> {
        let changed = self.viewport.set_zoom(zoom);
        self.persist_zoom(changed).await?;
        Ok(changed)
    }

    async fn persist_zoom(&self, changed: bool) -> Result<(), NavigatorError> {
        if changed {
            let zoom = self.viewport.zoom_level();
            self.store.set_zoom_level(zoom).await?;
            debug!(zoom, "zoom level saved");
        }
        Ok(())
    }

    pub fn pan(&mut self, columns: i32, rows: i32) {
        self.viewport.pan(columns, rows);
    }

    /// Map a minimap click to a cell and center there.
    pub fn click(&mut self, x: i32, y: i32) -> Option<GridPoint> {
        self.viewport.click_to_grid(x, y)
    }

    /// Center the minimap on a named intersection.
    pub fn go_to_intersection(&mut self, column: &str, row: &str) -> Result<GridPoint, NavigatorError> {
        let point = self.cell_at(column, row)?;
        self.viewport.go_to(point);
        Ok(point)
    }

    // ========================================================================
    // Landmarks and sync
    // ========================================================================

    /// Move one landmark by hand (`None` marks it unknown) and persist it.
    ///
    /// The store is written first; the registry changes only if that
    /// succeeds.
    pub async fn relocate(
        &mut self,
        category: Category,
        name: &str,
        location: Option<Intersection>,
    ) -> Result<Option<GridPoint>, NavigatorError> {
        if self.registry.get(category, name).is_none() {
            return Err(RegistryError::UnknownEntity {
                category,
                name: name.to_string(),
            }
            .into());
        }
        let resolved = match &location {
            Some(at) => Some(registry::resolve(&self.axes, category, &at.column, &at.row)?),
            None => None,
        };

        let next_refresh = self.scheduler.next_refresh(category);
        self.store
            .set_entity_location(category, name, location.clone(), next_refresh)
            .await?;

        match location {
            Some(at) => {
                self.registry.set_location(&self.axes, category, name, at)??;
            }
            None => self.registry.set_coordinate(category, name, None)?,
        }
        info!(category = %category, name, "landmark relocated");
        Ok(resolved.map(|p| category.anchor().to_cell(p)))
    }

    /// "Update Data": refresh every catalog category that is due.
    pub async fn update_data(&mut self, now: DateTime<Utc>) -> Result<Vec<SyncReport>, NavigatorError> {
        Ok(self
            .scheduler
            .refresh_due(&mut self.registry, &self.axes, self.store.as_ref(), now)
            .await?)
    }

    /// Refresh one category now, ignoring its countdown.
    pub async fn refresh(
        &mut self,
        category: Category,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, NavigatorError> {
        Ok(self
            .scheduler
            .refresh(category, &mut self.registry, &self.axes, self.store.as_ref(), now)
            .await?)
    }
}
