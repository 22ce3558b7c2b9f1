//! End-to-end tests driving the Navigator against an in-memory store and a
//! scripted catalog.

use chrono::{DateTime, TimeZone, Utc};
use citymap_core::testing::{catalog_page, sample_map, MemoryStore, MockCatalog};
use citymap_core::{
    Category, GridPoint, MapStore, Navigator, NavigatorConfig, NavigatorError, NextRefresh,
    SyncError,
};
use std::sync::Arc;

fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn load(store: &Arc<MemoryStore>, catalog: MockCatalog) -> Navigator {
    Navigator::load(store.clone(), Box::new(catalog), NavigatorConfig::new())
        .await
        .expect("Failed to load navigator")
}

// =============================================================================
// Catalog refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_forgets_shop_missing_from_catalog() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let page = catalog_page(
        &[],
        &[("Sparks", "SE of Cedar and 6th")],
        Some("Shops move in 2 days, 3h 15m 0s"),
    );
    let mut nav = load(&store, MockCatalog::with_page(page)).await;

    let before = nav.registry().get(Category::Shop, "Z Mart").unwrap();
    assert_eq!(before.resolved, Some(GridPoint::new(9, 5)));

    let report = nav.refresh(Category::Shop, new_year()).await.unwrap();

    // Z Mart was not listed, so it is unknown now rather than at its old spot.
    let z = nav.registry().get(Category::Shop, "Z Mart").unwrap();
    assert!(!z.is_resolved());
    assert!(nav
        .nearest(Category::Shop)
        .iter()
        .all(|hit| hit.name() != "Z Mart"));

    assert_eq!(report.updated, 1);
    assert_eq!(
        report.next_refresh,
        NextRefresh::At(Utc.with_ymd_and_hms(2024, 1, 3, 3, 15, 0).unwrap())
    );
    let next = report.next_refresh.at().unwrap();
    assert!(next > new_year());

    let saved = store.snapshot();
    let rows = saved.raw_entities(Category::Shop);
    let z_row = rows.iter().find(|r| r.name == "Z Mart").unwrap();
    assert!(z_row.intersection().is_none());
}

#[tokio::test]
async fn test_listed_entities_take_catalog_coordinates() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let page = catalog_page(
        &[
            ("Allurists Guild 1", "SE of Aardvark and 6th"),
            ("Thieves Guild 1", "SE of Cormorant and 1st"),
        ],
        &[],
        Some("Guilds move in 0 days, 6h 0m 0s"),
    );
    let mut nav = load(&store, MockCatalog::with_page(page)).await;

    nav.refresh(Category::Guild, new_year()).await.unwrap();

    let guild = |name: &str| nav.registry().get(Category::Guild, name).unwrap().resolved;
    assert_eq!(guild("Allurists Guild 1"), Some(GridPoint::new(3, 13)));
    assert_eq!(guild("Thieves Guild 1"), Some(GridPoint::new(11, 3)));
}

#[tokio::test]
async fn test_fetch_failure_keeps_category_intact() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let mut nav = load(
        &store,
        MockCatalog::failing(catalog::Error::Timeout(std::time::Duration::from_secs(30))),
    )
    .await;
    let before = nav.registry().entities_of(Category::Shop).to_vec();

    let result = nav.update_data(new_year()).await;

    assert!(matches!(
        result,
        Err(NavigatorError::Sync(SyncError::Fetch(catalog::Error::Timeout(_))))
    ));
    assert_eq!(nav.registry().entities_of(Category::Shop), before.as_slice());
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_update_data_honours_countdown() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let page = catalog_page(
        &[("Allurists Guild 1", "Beech and 4th")],
        &[("Sparks", "Cedar and 6th")],
        Some("Guilds and Shops move in 0 days, 1h 30m 0s"),
    );
    let catalog = MockCatalog::with_page(page);
    let calls = catalog.calls();
    let mut nav = load(&store, catalog).await;

    let first = nav.update_data(new_year()).await.unwrap();
    assert_eq!(first.len(), 2);

    let second = nav.update_data(new_year()).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(calls.get(), 2);

    let later = new_year() + chrono::TimeDelta::hours(2);
    let third = nav.update_data(later).await.unwrap();
    assert_eq!(third.len(), 2);

    // A forced refresh ignores the countdown.
    nav.refresh(Category::Shop, new_year()).await.unwrap();
    assert_eq!(calls.get(), 5);
}

#[tokio::test]
async fn test_schedule_survives_reload() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let page = catalog_page(&[], &[("Sparks", "Cedar and 6th")], Some("Shops 1 day, 0h 0m 0s"));
    let mut nav = load(&store, MockCatalog::with_page(page.clone())).await;
    nav.refresh(Category::Shop, new_year()).await.unwrap();
    drop(nav);

    let reloaded = load(&store, MockCatalog::with_page(page)).await;
    assert!(!reloaded.scheduler().is_due(Category::Shop, new_year()));
    assert!(reloaded
        .registry()
        .get(Category::Shop, "Sparks")
        .unwrap()
        .is_resolved());
}

// =============================================================================
// Destination and viewport
// =============================================================================

#[tokio::test]
async fn test_destination_roundtrip() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let mut nav = load(&store, MockCatalog::with_page(String::new())).await;

    nav.set_destination(GridPoint::new(40, 2)).await.unwrap();
    assert_eq!(store.destination().await.unwrap(), Some(GridPoint::new(40, 2)));

    nav.set_destination_to("Cedar", "6th").await.unwrap();
    nav.set_destination(GridPoint::new(40, 2)).await.unwrap();
    assert_eq!(
        nav.recent_destinations().await.unwrap(),
        vec![GridPoint::new(40, 2), GridPoint::new(13, 13)]
    );

    nav.clear_destination().await.unwrap();
    assert_eq!(nav.destination(), None);
    assert_eq!(store.destination().await.unwrap(), None);
    assert_eq!(nav.recent_destinations().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_position_drives_viewport() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let mut nav = load(&store, MockCatalog::with_page(String::new())).await;

    nav.zoom_out().await.unwrap();
    nav.update_position(GridPoint::new(5, 5));
    assert_eq!(nav.viewport().origin(), GridPoint::new(3, 3));
    assert!(nav.viewport().contains(GridPoint::new(5, 5)));

    // Near the south-east limit the window stops at the last street.
    nav.update_position(GridPoint::new(12, 12));
    assert_eq!(nav.viewport().origin(), GridPoint::new(8, 8));

    let clicked = nav.click(0, 0).unwrap();
    assert_eq!(clicked, GridPoint::new(8, 8));
    assert_eq!(nav.viewport().center(), GridPoint::new(8, 8));
}

#[tokio::test]
async fn test_briefing_bank_offset_applied_once() {
    let store = Arc::new(MemoryStore::new(sample_map()));
    let mut nav = load(&store, MockCatalog::with_page(String::new())).await;

    // OmniBank Alder is stored at (4, 4); its door is at (5, 5).
    nav.update_position(GridPoint::new(5, 5));
    let bank = nav.briefing().nearest_bank.unwrap();
    assert_eq!(bank.point, GridPoint::new(5, 5));
    assert_eq!(bank.cost, 0);
}
