//! Grid coordinates and the Chebyshev movement metric.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell on the city grid.
///
/// Columns grow eastward and rows grow southward. Named streets sit on even
/// coordinates; odd coordinates are the unnamed blocks between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub column: i32,
    pub row: i32,
}

impl GridPoint {
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Shift by a column and row delta, stopping at the integer limits.
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }

    /// The cell one step southeast.
    pub const fn southeast(self) -> Self {
        self.offset(1, 1)
    }

    /// Chebyshev distance to another cell.
    pub fn distance_to(self, other: GridPoint) -> u32 {
        chebyshev(self, other)
    }
}

impl From<(i32, i32)> for GridPoint {
    fn from((column, row): (i32, i32)) -> Self {
        Self::new(column, row)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// `max(|Δcolumn|, |Δrow|)`: one diagonal-capable step costs one AP.
pub fn chebyshev(a: GridPoint, b: GridPoint) -> u32 {
    a.column.abs_diff(b.column).max(a.row.abs_diff(b.row))
}
