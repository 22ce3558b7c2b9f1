//! Persistence tests against a real map file.

use chrono::{TimeZone, Utc};
use citymap_core::testing::{catalog_page, sample_map, MockCatalog};
use citymap_core::{
    AxisKind, Category, GridPoint, JsonStore, MapStore, Navigator, NavigatorConfig,
    NavigatorError, NextRefresh, SavedMap, StoreError,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_navigator(store: Arc<JsonStore>, page: String) -> Navigator {
    Navigator::load(store, Box::new(MockCatalog::with_page(page)), NavigatorConfig::new())
        .await
        .expect("Failed to load navigator")
}

#[tokio::test]
async fn test_navigator_state_survives_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("citymap.json");
    JsonStore::create(&path, sample_map()).await.unwrap();

    {
        let store = Arc::new(JsonStore::open(&path).await.unwrap());
        let mut nav = open_navigator(store, String::new()).await;
        nav.set_destination_to("Buzzard", "5th").await.unwrap();
        nav.zoom_out().await.unwrap();
        nav.zoom_out().await.unwrap();
    }

    let store = Arc::new(JsonStore::open(&path).await.unwrap());
    let nav = open_navigator(store, String::new()).await;
    assert_eq!(nav.destination(), Some(GridPoint::new(7, 11)));
    assert_eq!(nav.viewport().zoom_level(), 7);
}

#[tokio::test]
async fn test_refresh_is_written_to_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("citymap.json");
    let store = Arc::new(JsonStore::create(&path, sample_map()).await.unwrap());

    let page = catalog_page(
        &[("Thieves Guild 1", "SE of Alder and 3rd")],
        &[],
        Some("Guilds move in 1 day, 0h 0m 0s"),
    );
    let mut nav = open_navigator(store, page).await;
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    nav.refresh(Category::Guild, now).await.unwrap();

    let saved = SavedMap::load_json(&path).await.unwrap();
    let guilds = saved.raw_entities(Category::Guild);
    let thieves = guilds.iter().find(|r| r.name == "Thieves Guild 1").unwrap();
    assert_eq!(thieves.column.as_deref(), Some("Alder"));
    assert_eq!(thieves.row.as_deref(), Some("3rd"));
    let allurists = guilds.iter().find(|r| r.name == "Allurists Guild 1").unwrap();
    assert!(allurists.intersection().is_none());
    assert_eq!(
        saved.next_refresh(Category::Guild),
        NextRefresh::At(Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap())
    );
    assert!(!saved.saved_at.is_empty());
}

#[tokio::test]
async fn test_missing_axes_refuse_to_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("empty.json");
    let store = Arc::new(JsonStore::create(&path, SavedMap::default()).await.unwrap());

    let result = Navigator::load(
        store,
        Box::new(MockCatalog::with_page(String::new())),
        NavigatorConfig::new(),
    )
    .await;
    assert!(matches!(
        result,
        Err(NavigatorError::NoAxisData(AxisKind::Column))
    ));
}

#[tokio::test]
async fn test_open_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let result = JsonStore::open(temp_dir.path().join("nope.json")).await;
    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[tokio::test]
async fn test_hand_written_map_loads() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("hand.json");
    let json = r#"{
        "version": 1,
        "columns": [{"name": "Aardvark", "coordinate": 2}],
        "rows": [{"name": "1st", "coordinate": 2}],
        "categories": {
            "Tavern": {"rows": [{"name": "X", "column": "Aardvark", "row": "1st"}]},
            "Shop": {"rows": [{"name": "Y"}], "next_refresh": "NA"}
        }
    }"#;
    tokio::fs::write(&path, json).await.unwrap();

    let store = Arc::new(JsonStore::open(&path).await.unwrap());
    assert_eq!(store.zoom_level().await.unwrap(), None);
    let nav = open_navigator(store, String::new()).await;

    let nearest = nav.registry().get(Category::Tavern, "X").unwrap();
    assert_eq!(nearest.resolved, Some(GridPoint::new(3, 3)));
    assert!(!nav.registry().get(Category::Shop, "Y").unwrap().is_resolved());
    assert_eq!(nav.viewport().zoom_level(), 3);
    assert_eq!(nav.destination(), None);
}
