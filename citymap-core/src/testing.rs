//! Testing utilities for the city map.
//!
//! This module provides tools for deterministic tests:
//! - `sample_axes` / `sample_map` fixtures on a small 12×12 grid
//! - `MemoryStore`, a [`MapStore`] that never touches disk and can be told to
//!   fail its writes
//! - `MockCatalog`, a scripted [`CatalogSource`] that counts its fetches
//! - `catalog_page` for building catalog markup

use crate::axis::{AxisKind, AxisModel, NamedAxis};
use crate::grid::GridPoint;
use crate::registry::{Category, Intersection, RawEntity};
use crate::store::{MapStore, SavedMap, StoreError};
use crate::sync::{CatalogSource, NextRefresh};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

fn sample_columns() -> NamedAxis {
    NamedAxis::new([
        ("WCL", 0),
        ("Western City Limits", 0),
        ("Aardvark", 2),
        ("Alder", 4),
        ("Buzzard", 6),
        ("Beech", 8),
        ("Cormorant", 10),
        ("Cedar", 12),
    ])
}

fn sample_rows() -> NamedAxis {
    NamedAxis::new([
        ("NCL", 0),
        ("Northern City Limits", 0),
        ("1st", 2),
        ("2nd", 4),
        ("3rd", 6),
        ("4th", 8),
        ("5th", 10),
        ("6th", 12),
    ])
}

/// A small city: eight streets per axis, coordinates 0 through 12.
pub fn sample_axes() -> AxisModel {
    AxisModel::new(sample_columns(), sample_rows()).expect("sample axes are non-empty")
}

/// A map document on [`sample_axes`] with a few landmarks of every kind.
///
/// Guild "Allurists Guild 1" and shop "Sparks" are provisioned but unplaced.
pub fn sample_map() -> SavedMap {
    SavedMap::new(sample_columns(), sample_rows())
        .with_category(
            Category::Bank,
            vec![RawEntity::new("OmniBank Alder", "Alder", "2nd")],
        )
        .with_category(
            Category::Tavern,
            vec![
                RawEntity::new("Abbey", "Buzzard", "3rd"),
                RawEntity::new("Stray Dog", "Cormorant", "5th"),
            ],
        )
        .with_category(
            Category::Transit,
            vec![
                RawEntity::new("Aardvark Station", "Aardvark", "1st"),
                RawEntity::new("Cedar Station", "Cedar", "5th"),
            ],
        )
        .with_category(
            Category::Shop,
            vec![
                RawEntity::unplaced("Sparks"),
                RawEntity::new("Herman's Scrolls", "Aardvark", "4th"),
                RawEntity::new("Z Mart", "Beech", "2nd"),
            ],
        )
        .with_category(
            Category::Guild,
            vec![
                RawEntity::unplaced("Allurists Guild 1"),
                RawEntity::new("Thieves Guild 1", "Beech", "2nd"),
            ],
        )
        .with_category(
            Category::PlaceOfInterest,
            vec![RawEntity::new("Fountain", "Beech", "4th")],
        )
        .with_category(
            Category::UserBuilding,
            vec![RawEntity::new("Hideout", "Cormorant", "6th")],
        )
}

/// Catalog markup with the given guild and shop rows.
///
/// Rows are `(name, location)`; `countdown` becomes the page's single
/// "next change" div.
pub fn catalog_page(
    guilds: &[(&str, &str)],
    shops: &[(&str, &str)],
    countdown: Option<&str>,
) -> String {
    fn table(rows: &[(&str, &str)]) -> String {
        let mut out = String::from("<table>\n<tr class=\"header\"><th>Name</th><th>Location</th></tr>\n");
        for (i, (name, location)) in rows.iter().enumerate() {
            let class = if i % 2 == 0 { "odd" } else { "even" };
            out.push_str(&format!(
                "<tr class=\"{class}\"><td>{name}</td><td>{location}</td></tr>\n"
            ));
        }
        out.push_str("</table>\n");
        out
    }

    let mut page = String::from("<html><body>\n");
    page.push_str("<img src=\"guilds.gif\" alt=\"the guilds\">\n");
    page.push_str(&table(guilds));
    page.push_str("<img src=\"shops.gif\" alt=\"the shops\">\n");
    page.push_str(&table(shops));
    if let Some(text) = countdown {
        page.push_str(&format!("<div class=\"next_change\">{text}</div>\n"));
    }
    page.push_str("</body></html>\n");
    page
}

/// An in-memory [`MapStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<SavedMap>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(map: SavedMap) -> Self {
        Self {
            map: Mutex::new(map),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// A copy of the current document.
    pub fn snapshot(&self) -> SavedMap {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SavedMap> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut SavedMap) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut map = self.lock();
        let mut next = map.clone();
        let value = f(&mut next)?;
        *map = next;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

#[async_trait]
impl MapStore for MemoryStore {
    async fn axis(&self, kind: AxisKind) -> Result<NamedAxis, StoreError> {
        Ok(self.lock().axis(kind).clone())
    }

    async fn raw_entities(&self, category: Category) -> Result<Vec<RawEntity>, StoreError> {
        Ok(self.lock().raw_entities(category))
    }

    async fn next_refresh(&self, category: Category) -> Result<NextRefresh, StoreError> {
        Ok(self.lock().next_refresh(category))
    }

    async fn set_entity_location(
        &self,
        category: Category,
        name: &str,
        location: Option<Intersection>,
        next_refresh: NextRefresh,
    ) -> Result<(), StoreError> {
        self.update(|m| m.set_entity_location(category, name, location, next_refresh))
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
    }

    async fn destination(&self) -> Result<Option<GridPoint>, StoreError> {
        Ok(self.lock().destination)
    }

    async fn set_destination(&self, destination: GridPoint) -> Result<(), StoreError> {
        self.update(|m| {
            m.set_destination(destination);
            Ok(())
        })
    }

    async fn clear_destination(&self) -> Result<(), StoreError> {
        self.update(|m| {
            m.clear_destination();
            Ok(())
        })
    }

    async fn recent_destinations(&self) -> Result<Vec<GridPoint>, StoreError> {
        Ok(self.lock().recent_destinations.clone())
    }

    async fn zoom_level(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.lock().zoom_level)
    }

    async fn set_zoom_level(&self, zoom: i32) -> Result<(), StoreError> {
        self.update(|m| {
            m.zoom_level = Some(zoom);
            Ok(())
        })
    }
}

/// Shared count of catalog fetches.
#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A scripted catalog.
///
/// Responses are returned in order; the last one repeats forever.
pub struct MockCatalog {
    responses: Mutex<VecDeque<Result<String, catalog::Error>>>,
    calls: CallCount,
}

impl MockCatalog {
    /// Answer every fetch with the responses in order.
    pub fn scripted(responses: Vec<Result<String, catalog::Error>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: CallCount::default(),
        }
    }

    /// Always return `markup`.
    pub fn with_page(markup: String) -> Self {
        Self::scripted(vec![Ok(markup)])
    }

    /// Always fail with `error`.
    pub fn failing(error: catalog::Error) -> Self {
        Self::scripted(vec![Err(error)])
    }

    /// A handle that keeps counting after the catalog is boxed.
    pub fn calls(&self) -> CallCount {
        self.calls.clone()
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn fetch_page(&self) -> Result<String, catalog::Error> {
        self.calls.bump();
        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        next.unwrap_or_else(|| Err(catalog::Error::Network("no scripted response".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{CatalogPage, Section};

    #[test]
    fn test_catalog_page_parses() {
        let markup = catalog_page(
            &[("Allurists Guild 1", "SE of Beech and 4th")],
            &[("Sparks", "SE of Cedar and 6th"), ("Z Mart", "SE of Alder and 1st")],
            Some("Shops 1 day, 2h 3m 4s"),
        );
        let page = CatalogPage::parse(&markup);

        assert_eq!(page.section(Section::Guilds).unwrap().rows.len(), 1);
        let shops = page.section(Section::Shops).unwrap();
        assert_eq!(shops.rows.len(), 2);
        assert_eq!(shops.rows[1].row, "1st");
        assert!(shops.countdown.is_some());
        assert!(page.section(Section::Guilds).unwrap().countdown.is_none());
    }

    #[tokio::test]
    async fn test_mock_catalog_script() {
        let catalog = MockCatalog::scripted(vec![
            Err(catalog::Error::Status { status: 500 }),
            Ok("page".to_string()),
        ]);
        let calls = catalog.calls();

        assert!(catalog.fetch_page().await.is_err());
        assert_eq!(catalog.fetch_page().await.unwrap(), "page");
        assert_eq!(catalog.fetch_page().await.unwrap(), "page");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_failing_writes() {
        let store = MemoryStore::new(sample_map());
        store.fail_writes(true);
        assert!(store.set_zoom_level(5).await.is_err());
        assert_eq!(store.zoom_level().await.unwrap(), None);

        store.fail_writes(false);
        store.set_zoom_level(5).await.unwrap();
        assert_eq!(store.zoom_level().await.unwrap(), Some(5));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_sample_map_resolves() {
        let axes = sample_axes();
        let map = sample_map();
        for category in Category::all() {
            for row in map.raw_entities(category) {
                if let Some(at) = row.intersection() {
                    assert!(axes.resolve_intersection(&at.column, &at.row).is_ok(), "{}", row.name);
                }
            }
        }
    }
}
