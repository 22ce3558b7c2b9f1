//! Named street axes.
//!
//! The city is addressed by two independent naming conventions: column
//! streets (Aardvark, Alder, ...) running north-south and numbered row
//! streets (1st, 2nd, ...) running east-west. Each axis maps a street name to
//! an even grid coordinate; the two are never interchanged.

use crate::grid::GridPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Label used for any cell whose anchoring street lies outside the named range.
pub const EDGE_OF_MAP: &str = "Edge of Map";

/// Errors from axis lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AxisError {
    #[error("Unknown {axis} name: {name}")]
    NotFound { axis: AxisKind, name: String },

    #[error("No {0} data")]
    Empty(AxisKind),
}

/// Which of the two axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    Column,
    Row,
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Column => write!(f, "column"),
            AxisKind::Row => write!(f, "row"),
        }
    }
}

/// One named street.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisEntry {
    pub name: String,
    pub coordinate: i32,
}

/// Ordered street name → coordinate mapping.
///
/// Several names may share a coordinate (`WCL` and `Western City Limits`
/// are both 0). Reverse lookups return the first entry in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AxisEntry>", into = "Vec<AxisEntry>")]
pub struct NamedAxis {
    entries: Vec<AxisEntry>,
    index: HashMap<String, i32>,
}

impl NamedAxis {
    /// Build an axis from `(name, coordinate)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        entries
            .into_iter()
            .map(|(name, coordinate)| AxisEntry {
                name: name.into(),
                coordinate,
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// Coordinate of a street name.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.index.get(name).copied()
    }

    pub fn entries(&self) -> &[AxisEntry] {
        &self.entries
    }

    /// Street names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min_coordinate(&self) -> Option<i32> {
        self.entries.iter().map(|e| e.coordinate).min()
    }

    pub fn max_coordinate(&self) -> Option<i32> {
        self.entries.iter().map(|e| e.coordinate).max()
    }

    /// First street name at exactly this coordinate.
    pub fn name_at(&self, coordinate: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.coordinate == coordinate)
            .map(|e| e.name.as_str())
    }
}

impl From<Vec<AxisEntry>> for NamedAxis {
    fn from(entries: Vec<AxisEntry>) -> Self {
        let index = entries
            .iter()
            .map(|e| (e.name.clone(), e.coordinate))
            .collect();
        Self { entries, index }
    }
}

impl From<NamedAxis> for Vec<AxisEntry> {
    fn from(axis: NamedAxis) -> Self {
        axis.entries
    }
}

/// The largest coordinate on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub max_column: i32,
    pub max_row: i32,
}

impl GridBounds {
    pub fn max(&self, axis: AxisKind) -> i32 {
        match axis {
            AxisKind::Column => self.max_column,
            AxisKind::Row => self.max_row,
        }
    }
}

/// Both street axes of the city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisModel {
    columns: NamedAxis,
    rows: NamedAxis,
}

impl AxisModel {
    /// Create the model. Both axes must name at least one street.
    pub fn new(columns: NamedAxis, rows: NamedAxis) -> Result<Self, AxisError> {
        if columns.is_empty() {
            return Err(AxisError::Empty(AxisKind::Column));
        }
        if rows.is_empty() {
            return Err(AxisError::Empty(AxisKind::Row));
        }
        Ok(Self { columns, rows })
    }

    pub fn axis(&self, kind: AxisKind) -> &NamedAxis {
        match kind {
            AxisKind::Column => &self.columns,
            AxisKind::Row => &self.rows,
        }
    }

    pub fn columns(&self) -> &NamedAxis {
        &self.columns
    }

    pub fn rows(&self) -> &NamedAxis {
        &self.rows
    }

    /// Coordinate of a street name on one axis.
    ///
    /// A miss is a per-row problem for the caller to record and skip, never a
    /// reason to abort a load.
    pub fn resolve(&self, kind: AxisKind, name: &str) -> Result<i32, AxisError> {
        self.axis(kind).get(name).ok_or_else(|| AxisError::NotFound {
            axis: kind,
            name: name.to_string(),
        })
    }

    /// Grid point of a `(column, row)` intersection.
    pub fn resolve_intersection(&self, column: &str, row: &str) -> Result<GridPoint, AxisError> {
        Ok(GridPoint::new(
            self.resolve(AxisKind::Column, column)?,
            self.resolve(AxisKind::Row, row)?,
        ))
    }

    /// Name of the street anchoring a cell on one axis.
    ///
    /// Streets sit one cell northwest of the cells they anchor, so this looks
    /// up `coordinate - 1`. When that anchor lies outside the named range, or
    /// no street is defined there, the result is [`EDGE_OF_MAP`].
    pub fn name_nearest(&self, kind: AxisKind, coordinate: i32) -> &str {
        let axis = self.axis(kind);
        let Some(anchor) = coordinate.checked_sub(1) else {
            return EDGE_OF_MAP;
        };
        let in_range = matches!(
            (axis.min_coordinate(), axis.max_coordinate()),
            (Some(min), Some(max)) if anchor >= min && anchor <= max
        );
        if !in_range {
            return EDGE_OF_MAP;
        }
        axis.name_at(anchor).unwrap_or(EDGE_OF_MAP)
    }

    /// `"<column> & <row>"` for a cell, or [`EDGE_OF_MAP`] if either side is
    /// off the named grid.
    pub fn intersection_name(&self, point: GridPoint) -> String {
        let column = self.name_nearest(AxisKind::Column, point.column);
        let row = self.name_nearest(AxisKind::Row, point.row);
        if column == EDGE_OF_MAP || row == EDGE_OF_MAP {
            EDGE_OF_MAP.to_string()
        } else {
            format!("{column} & {row}")
        }
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            max_column: self.columns.max_coordinate().unwrap_or_default(),
            max_row: self.rows.max_coordinate().unwrap_or_default(),
        }
    }
}
