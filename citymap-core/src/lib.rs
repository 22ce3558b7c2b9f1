//! Spatial model and catalog sync for the city map.
//!
//! This crate provides:
//! - Street-name ↔ grid-coordinate translation over two named axes
//! - A categorized landmark registry with per-category anchor rules
//! - Chebyshev-distance proximity and AP route costs (direct and transit)
//! - A zoomable, clamped minimap viewport
//! - Scheduled resync of guild and shop locations from the external catalog
//! - JSON-file persistence behind the [`MapStore`] trait
//!
//! # Quick Start
//!
//! ```ignore
//! use citymap_core::{GridPoint, JsonStore, Navigator, NavigatorConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JsonStore::open("citymap.json").await?);
//!     let mut nav = Navigator::connect(store, NavigatorConfig::new()).await?;
//!
//!     nav.update_position(GridPoint::new(101, 57));
//!     nav.update_data(chrono::Utc::now()).await?;
//!
//!     let briefing = nav.briefing();
//!     println!("{}", briefing.location);
//!     Ok(())
//! }
//! ```

pub mod axis;
pub mod grid;
pub mod navigator;
pub mod proximity;
pub mod registry;
pub mod route;
pub mod store;
pub mod sync;
pub mod testing;
pub mod viewport;

// Primary public API
pub use axis::{AxisError, AxisKind, AxisModel, NamedAxis, EDGE_OF_MAP};
pub use grid::GridPoint;
pub use navigator::{
    Briefing, DestinationInfo, Landmark, Navigator, NavigatorConfig, NavigatorError, SyncConfig,
    TransitSummary,
};
pub use proximity::{Nearby, ProximityIndex};
pub use registry::{
    BuildReport, Category, Entity, Intersection, PointOfInterestRegistry, RawEntity, Skip,
    SkipReason,
};
pub use route::{direct_cost, RouteOptions, RoutePlanner, TransitRoute};
pub use store::{JsonStore, MapStore, SavedMap, StoreError};
pub use sync::{CatalogSource, NextRefresh, SyncError, SyncReport, SyncScheduler};
pub use viewport::{ViewportController, ZoomRange};
