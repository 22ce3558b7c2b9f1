//! Point-of-interest registry.
//!
//! Every landmark belongs to a [`Category`] and is addressed by the
//! intersection it stands at. Resolution goes through one function,
//! [`resolve`], parameterized by the category's [`AnchorCorner`]:
//!
//! - Most categories are stored at the cell southeast of their intersection.
//! - Banks are stored at the raw intersection, and [`Entity::effective_point`]
//!   applies the southeast step when the bank is used.
//!
//! Membership is fixed by what the store provisioned; nothing here inserts a
//! new entity, and every row that cannot be placed is reported as a [`Skip`].

use crate::axis::{AxisError, AxisModel};
use crate::grid::GridPoint;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No {category} named {name}")]
    UnknownEntity { category: Category, name: String },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Point-of-interest categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Bank,
    Tavern,
    Transit,
    Shop,
    Guild,
    UserBuilding,
    PlaceOfInterest,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Bank => "Bank",
            Category::Tavern => "Tavern",
            Category::Transit => "Transit",
            Category::Shop => "Shop",
            Category::Guild => "Guild",
            Category::UserBuilding => "User Building",
            Category::PlaceOfInterest => "Place of Interest",
        }
    }

    /// Where the stored coordinate sits relative to the named intersection.
    pub fn anchor(&self) -> AnchorCorner {
        match self {
            Category::Bank => AnchorCorner::Intersection,
            _ => AnchorCorner::SoutheastCell,
        }
    }

    pub fn all() -> [Category; 7] {
        [
            Category::Bank,
            Category::Tavern,
            Category::Transit,
            Category::Shop,
            Category::Guild,
            Category::UserBuilding,
            Category::PlaceOfInterest,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "bank" | "banks" => Ok(Category::Bank),
            "tavern" | "taverns" => Ok(Category::Tavern),
            "transit" | "transits" => Ok(Category::Transit),
            "shop" | "shops" => Ok(Category::Shop),
            "guild" | "guilds" => Ok(Category::Guild),
            "userbuilding" | "userbuildings" => Ok(Category::UserBuilding),
            "placeofinterest" | "placesofinterest" | "poi" => Ok(Category::PlaceOfInterest),
            _ => Err(RegistryError::UnknownCategory(s.to_string())),
        }
    }
}

/// Which corner of its intersection a category's stored coordinate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorCorner {
    /// Stored at the intersection itself; the building is one cell southeast.
    Intersection,
    /// Stored at the building's cell, southeast of the intersection.
    SoutheastCell,
}

impl AnchorCorner {
    /// Stored coordinate for an intersection.
    pub fn stored(self, intersection: GridPoint) -> GridPoint {
        match self {
            AnchorCorner::Intersection => intersection,
            AnchorCorner::SoutheastCell => intersection.southeast(),
        }
    }

    /// Cell a player walks to, given the stored coordinate.
    pub fn to_cell(self, stored: GridPoint) -> GridPoint {
        match self {
            AnchorCorner::Intersection => stored.southeast(),
            AnchorCorner::SoutheastCell => stored,
        }
    }
}

/// Stored coordinate of `(column, row)` for a category.
pub fn resolve(
    axes: &AxisModel,
    category: Category,
    column: &str,
    row: &str,
) -> Result<GridPoint, AxisError> {
    let intersection = axes.resolve_intersection(column, row)?;
    Ok(category.anchor().stored(intersection))
}

/// A `(column name, row name)` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intersection {
    pub column: String,
    pub row: String,
}

impl Intersection {
    pub fn new(column: impl Into<String>, row: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            row: row.into(),
        }
    }
}

impl fmt::Display for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} & {}", self.column, self.row)
    }
}

/// A landmark row as persisted: a name and an optional address.
///
/// `None` columns or rows are the "NA" sentinel: the landmark exists but its
/// location is currently unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntity {
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub row: Option<String>,
}

impl RawEntity {
    pub fn new(name: impl Into<String>, column: impl Into<String>, row: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
            row: Some(row.into()),
        }
    }

    /// A provisioned landmark with no known location.
    pub fn unplaced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            row: None,
        }
    }

    pub fn intersection(&self) -> Option<Intersection> {
        match (&self.column, &self.row) {
            (Some(column), Some(row)) => Some(Intersection::new(column, row)),
            _ => None,
        }
    }
}

/// A registered landmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub category: Category,
    pub intersection: Option<Intersection>,
    /// Stored coordinate, following the category's anchor rule.
    pub resolved: Option<GridPoint>,
}

impl Entity {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// The cell a player walks to: the stored coordinate corrected by the
    /// category's anchor corner.
    pub fn effective_point(&self) -> Option<GridPoint> {
        self.resolved.map(|p| self.category.anchor().to_cell(p))
    }

    fn unresolve(&mut self) {
        self.intersection = None;
        self.resolved = None;
    }
}

/// Why a row did not make it into the registry (or was left unresolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A street name is missing from its axis.
    UnknownStreet(AxisError),
    /// A second row with a name already registered in the category.
    DuplicateName,
    /// A catalog row naming a landmark the registry does not provision.
    NotProvisioned,
    /// A catalog row whose location could not be split into two streets.
    MalformedLocation(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownStreet(e) => write!(f, "{e}"),
            SkipReason::DuplicateName => write!(f, "duplicate name"),
            SkipReason::NotProvisioned => write!(f, "not a known landmark"),
            SkipReason::MalformedLocation(location) => {
                write!(f, "unrecognised location {location:?}")
            }
        }
    }
}

/// A row that was dropped or could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub category: Category,
    pub name: String,
    pub intersection: Option<Intersection>,
    pub reason: SkipReason,
}

/// Outcome of building a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub loaded: usize,
    pub unplaced: usize,
    pub skipped: Vec<Skip>,
}

impl BuildReport {
    fn absorb(&mut self, other: BuildReport) {
        self.loaded += other.loaded;
        self.unplaced += other.unplaced;
        self.skipped.extend(other.skipped);
    }
}

/// Categorized landmark collections.
#[derive(Debug, Clone, Default)]
pub struct PointOfInterestRegistry {
    categories: HashMap<Category, Vec<Entity>>,
}

impl PointOfInterestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve one category's raw rows.
    ///
    /// Rows without a location join the registry unresolved. Rows naming an
    /// unknown street, and repeated names, are left out and reported.
    pub fn build(
        axes: &AxisModel,
        category: Category,
        rows: Vec<RawEntity>,
    ) -> (Vec<Entity>, BuildReport) {
        let mut entities: Vec<Entity> = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();
        let mut report = BuildReport::default();

        for raw in rows {
            let intersection = raw.intersection();

            if !seen.insert(raw.name.clone()) {
                warn!(category = %category, name = %raw.name, "duplicate landmark name");
                report.skipped.push(Skip {
                    category,
                    name: raw.name,
                    intersection,
                    reason: SkipReason::DuplicateName,
                });
                continue;
            }

            let Some(address) = intersection else {
                report.unplaced += 1;
                entities.push(Entity {
                    name: raw.name,
                    category,
                    intersection: None,
                    resolved: None,
                });
                continue;
            };

            match resolve(axes, category, &address.column, &address.row) {
                Ok(point) => {
                    report.loaded += 1;
                    entities.push(Entity {
                        name: raw.name,
                        category,
                        intersection: Some(address),
                        resolved: Some(point),
                    });
                }
                Err(e) => {
                    warn!(category = %category, name = %raw.name, error = %e, "skipping landmark");
                    report.skipped.push(Skip {
                        category,
                        name: raw.name,
                        intersection: Some(address),
                        reason: SkipReason::UnknownStreet(e),
                    });
                }
            }
        }

        debug!(
            category = %category,
            loaded = report.loaded,
            unplaced = report.unplaced,
            skipped = report.skipped.len(),
            "built category"
        );
        (entities, report)
    }

    /// Build every category from raw rows.
    pub fn from_rows<I>(axes: &AxisModel, rows: I) -> (Self, BuildReport)
    where
        I: IntoIterator<Item = (Category, Vec<RawEntity>)>,
    {
        let mut registry = Self::new();
        let mut report = BuildReport::default();
        for (category, raw) in rows {
            let (entities, category_report) = Self::build(axes, category, raw);
            registry.categories.insert(category, entities);
            report.absorb(category_report);
        }
        (registry, report)
    }

    /// All landmarks of a category, in provisioning order.
    pub fn entities_of(&self, category: Category) -> &[Entity] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&Entity> {
        self.entities_of(category).iter().find(|e| e.name == name)
    }

    /// Resolved landmarks of a category with their effective cells.
    pub fn resolved(&self, category: Category) -> impl Iterator<Item = (&Entity, GridPoint)> {
        self.entities_of(category)
            .iter()
            .filter_map(|e| e.effective_point().map(|p| (e, p)))
    }

    /// Landmarks whose effective cell is `point`, in category order.
    pub fn entities_at(&self, point: GridPoint) -> Vec<&Entity> {
        Category::all()
            .into_iter()
            .flat_map(|c| self.resolved(c))
            .filter(|(_, p)| *p == point)
            .map(|(e, _)| e)
            .collect()
    }

    /// Overwrite a landmark's stored coordinate (`None` marks it unresolved).
    /// The street address is dropped; it is named from the point from now on.
    pub fn set_coordinate(
        &mut self,
        category: Category,
        name: &str,
        coordinate: Option<GridPoint>,
    ) -> Result<(), RegistryError> {
        let entity = self.entity_mut(category, name)?;
        entity.resolved = coordinate;
        entity.intersection = None;
        Ok(())
    }

    /// Move a landmark to a named intersection, resolving it through the axes.
    pub fn set_location(
        &mut self,
        axes: &AxisModel,
        category: Category,
        name: &str,
        intersection: Intersection,
    ) -> Result<Result<GridPoint, AxisError>, RegistryError> {
        let entity = self.entity_mut(category, name)?;
        let resolved = resolve(axes, category, &intersection.column, &intersection.row);
        match &resolved {
            Ok(point) => {
                entity.intersection = Some(intersection);
                entity.resolved = Some(*point);
            }
            Err(_) => entity.unresolve(),
        }
        Ok(resolved)
    }

    /// Mark every landmark of a category unresolved.
    pub fn reset_category(&mut self, category: Category) {
        if let Some(entities) = self.categories.get_mut(&category) {
            entities.iter_mut().for_each(Entity::unresolve);
        }
    }

    /// Swap in a fully prepared set of landmarks for a category.
    pub(crate) fn replace_category(&mut self, category: Category, entities: Vec<Entity>) {
        self.categories.insert(category, entities);
    }

    fn entity_mut(&mut self, category: Category, name: &str) -> Result<&mut Entity, RegistryError> {
        self.categories
            .get_mut(&category)
            .and_then(|entities| entities.iter_mut().find(|e| e.name == name))
            .ok_or_else(|| RegistryError::UnknownEntity {
                category,
                name: name.to_string(),
            })
    }
}
