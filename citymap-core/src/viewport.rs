//! Minimap viewport.
//!
//! The viewport shows a `zoom × zoom` window of cells starting at `origin`.
//! Zoom levels are odd so the window has a center cell. The origin is kept in
//! `[-1, max - zoom + 1]` on each axis: one ring of off-map cells may show on
//! the north and west sides, and the window never runs past the last street.

use crate::axis::{AxisKind, GridBounds};
use crate::grid::GridPoint;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MIN_ZOOM: i32 = 3;
pub const DEFAULT_MAX_ZOOM: i32 = 7;
pub const DEFAULT_CANVAS_SIZE: u32 = 280;

/// Lowest origin coordinate: one ring of edge cells.
const ORIGIN_FLOOR: i32 = -1;

/// Errors from viewport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("Zoom level {0} must be odd and at least 1")]
    InvalidZoom(i32),

    #[error("Zoom range {min}..={max} is empty")]
    EmptyZoomRange { min: i32, max: i32 },

    #[error("Canvas size must be positive")]
    EmptyCanvas,
}

/// Allowed zoom levels (both ends odd, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: i32,
    max: i32,
}

impl ZoomRange {
    pub fn new(min: i32, max: i32) -> Result<Self, ViewportError> {
        for zoom in [min, max] {
            if zoom < 1 || zoom % 2 == 0 {
                return Err(ViewportError::InvalidZoom(zoom));
            }
        }
        if min > max {
            return Err(ViewportError::EmptyZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Nearest allowed level to an arbitrary value.
    pub fn normalize(&self, zoom: i32) -> i32 {
        let clamped = zoom.clamp(self.min, self.max);
        if clamped % 2 == 0 {
            clamped - 1
        } else {
            clamped
        }
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

/// Zoom level and window origin over a bounded grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportController {
    zoom: i32,
    origin: GridPoint,
    bounds: GridBounds,
    range: ZoomRange,
    canvas_size: u32,
}

impl ViewportController {
    /// Create a viewport at the north-west corner.
    ///
    /// An out-of-range or even `zoom` is normalized into `range`.
    pub fn new(
        bounds: GridBounds,
        range: ZoomRange,
        canvas_size: u32,
        zoom: i32,
    ) -> Result<Self, ViewportError> {
        if canvas_size == 0 {
            return Err(ViewportError::EmptyCanvas);
        }
        let normalized = range.normalize(zoom);
        if normalized != zoom {
            warn!(requested = zoom, using = normalized, "zoom level out of range");
        }
        let mut viewport = Self {
            zoom: normalized,
            origin: GridPoint::new(ORIGIN_FLOOR, ORIGIN_FLOOR),
            bounds,
            range,
            canvas_size,
        };
        viewport.origin = viewport.clamp_origin(viewport.origin);
        Ok(viewport)
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom
    }

    pub fn origin(&self) -> GridPoint {
        self.origin
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.range
    }

    /// The middle cell of the window.
    pub fn center(&self) -> GridPoint {
        let half = self.half_span();
        self.origin.offset(half, half)
    }

    /// Pixel size of one cell. Any remainder of the canvas is left unrendered.
    pub fn cell_size(&self) -> u32 {
        self.canvas_size / self.zoom as u32
    }

    /// Whether a cell is inside the visible window.
    pub fn contains(&self, point: GridPoint) -> bool {
        let within = |start: i32, value: i32| value >= start && value < start + self.zoom;
        within(self.origin.column, point.column) && within(self.origin.row, point.row)
    }

    /// Show fewer cells. Returns false when already at the closest zoom.
    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.zoom - 2)
    }

    /// Show more cells. Returns false when already at the widest zoom.
    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.zoom + 2)
    }

    /// Change the zoom level, keeping the center cell where possible.
    pub fn set_zoom(&mut self, zoom: i32) -> bool {
        let zoom = self.range.normalize(zoom);
        if zoom == self.zoom {
            return false;
        }
        let center = self.center();
        self.zoom = zoom;
        self.recenter(center);
        true
    }

    /// Center the window on a position, clamped to the grid.
    pub fn recenter(&mut self, position: GridPoint) {
        let half = self.half_span();
        self.origin = self.clamp_origin(position.offset(-half, -half));
        debug!(
            position = %position,
            origin = %self.origin,
            zoom = self.zoom,
            "recentered viewport"
        );
    }

    /// Center the window on an arbitrary cell (a looked-up intersection).
    pub fn go_to(&mut self, point: GridPoint) {
        self.recenter(point);
    }

    /// Shift the window by whole cells.
    pub fn pan(&mut self, columns: i32, rows: i32) {
        self.origin = self.clamp_origin(self.origin.offset(columns, rows));
    }

    /// Map a click on the canvas to the grid cell under it and center there.
    ///
    /// Clicks outside the canvas are ignored.
    pub fn click_to_grid(&mut self, x: i32, y: i32) -> Option<GridPoint> {
        let canvas = self.canvas_size as i32;
        if !(0..canvas).contains(&x) || !(0..canvas).contains(&y) {
            debug!(x, y, "click outside minimap");
            return None;
        }
        let cell_size = self.cell_size() as i32;
        if cell_size == 0 {
            return None;
        }
        // A click in the unrendered border lands on the last visible cell.
        let last = self.zoom - 1;
        let cell = self
            .origin
            .offset((x / cell_size).min(last), (y / cell_size).min(last));
        debug!(x, y, cell = %cell, "minimap click");
        self.recenter(cell);
        Some(cell)
    }

    /// Cells in the window, row by row from the north-west corner.
    pub fn visible_cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (0..self.zoom).flat_map(move |dy| {
            (0..self.zoom).map(move |dx| self.origin.offset(dx, dy))
        })
    }

    fn half_span(&self) -> i32 {
        (self.zoom - 1) / 2
    }

    fn clamp_origin(&self, origin: GridPoint) -> GridPoint {
        GridPoint::new(
            self.clamp_axis(AxisKind::Column, origin.column),
            self.clamp_axis(AxisKind::Row, origin.row),
        )
    }

    fn clamp_axis(&self, axis: AxisKind, value: i32) -> i32 {
        let ceiling = (self.bounds.max(axis) - self.zoom + 1).max(ORIGIN_FLOOR);
        value.clamp(ORIGIN_FLOOR, ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITY: GridBounds = GridBounds {
        max_column: 200,
        max_row: 200,
    };

    fn viewport(zoom: i32) -> ViewportController {
        ViewportController::new(CITY, ZoomRange::new(3, 9).unwrap(), DEFAULT_CANVAS_SIZE, zoom)
            .unwrap()
    }

    #[test]
    fn test_recenter_within_bounds() {
        let mut vp = viewport(5);
        vp.recenter(GridPoint::new(100, 100));
        assert_eq!(vp.origin(), GridPoint::new(98, 98));
        assert_eq!(vp.center(), GridPoint::new(100, 100));
    }

    #[test]
    fn test_recenter_clamps_at_edges() {
        let mut vp = viewport(7);
        vp.recenter(GridPoint::new(0, 1));
        assert_eq!(vp.origin(), GridPoint::new(-1, -1));
        assert!(vp.contains(GridPoint::new(0, 1)));

        vp.recenter(GridPoint::new(200, 199));
        assert_eq!(vp.origin(), GridPoint::new(194, 194));
        assert!(vp.contains(GridPoint::new(200, 199)));
    }

    #[test]
    fn test_zoom_steps_and_limits() {
        let mut vp = viewport(3);
        assert!(!vp.zoom_in());
        assert_eq!(vp.zoom_level(), 3);

        assert!(vp.zoom_out());
        assert!(vp.zoom_out());
        assert!(vp.zoom_out());
        assert_eq!(vp.zoom_level(), 9);
        assert!(!vp.zoom_out());
        assert_eq!(vp.zoom_level(), 9);

        assert!(vp.zoom_in());
        assert_eq!(vp.zoom_level(), 7);
    }

    #[test]
    fn test_zoom_keeps_center() {
        let mut vp = viewport(3);
        vp.recenter(GridPoint::new(50, 60));
        vp.zoom_out();
        assert_eq!(vp.zoom_level(), 5);
        assert_eq!(vp.center(), GridPoint::new(50, 60));
    }

    #[test]
    fn test_zoom_reclamps_origin() {
        let mut vp = viewport(3);
        vp.recenter(GridPoint::new(200, 200));
        assert_eq!(vp.origin(), GridPoint::new(198, 198));
        vp.zoom_out();
        assert_eq!(vp.origin(), GridPoint::new(196, 196));
    }

    #[test]
    fn test_pan_clamped() {
        let mut vp = viewport(5);
        vp.recenter(GridPoint::new(10, 10));
        vp.pan(3, -2);
        assert_eq!(vp.origin(), GridPoint::new(11, 6));
        vp.pan(-100, 1000);
        assert_eq!(vp.origin(), GridPoint::new(-1, 196));
    }

    #[test]
    fn test_click_to_grid() {
        // 280 / 5 = 56 pixel cells.
        let mut vp = viewport(5);
        vp.recenter(GridPoint::new(100, 100));

        let cell = vp.click_to_grid(0, 279).unwrap();
        assert_eq!(cell, GridPoint::new(98, 102));
        assert_eq!(vp.center(), cell);

        assert_eq!(vp.click_to_grid(-1, 10), None);
        assert_eq!(vp.click_to_grid(10, 280), None);
    }

    #[test]
    fn test_click_in_unrendered_border() {
        // 280 / 3 = 93, leaving a one pixel border at 279.
        let mut vp = viewport(3);
        vp.recenter(GridPoint::new(20, 20));
        assert_eq!(vp.click_to_grid(279, 0), Some(GridPoint::new(21, 19)));
    }

    #[test]
    fn test_visible_cells() {
        let mut vp = viewport(3);
        vp.recenter(GridPoint::new(5, 5));
        let cells: Vec<_> = vp.visible_cells().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], GridPoint::new(4, 4));
        assert_eq!(cells[1], GridPoint::new(5, 4));
        assert_eq!(cells[8], GridPoint::new(6, 6));
    }

    #[test]
    fn test_normalize_zoom() {
        let range = ZoomRange::new(3, 7).unwrap();
        assert_eq!(range.normalize(1), 3);
        assert_eq!(range.normalize(4), 3);
        assert_eq!(range.normalize(10), 7);
        assert_eq!(viewport(6).zoom_level(), 5);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(ZoomRange::new(2, 7), Err(ViewportError::InvalidZoom(2)));
        assert_eq!(
            ZoomRange::new(9, 3),
            Err(ViewportError::EmptyZoomRange { min: 9, max: 3 })
        );
        assert_eq!(
            ViewportController::new(CITY, ZoomRange::default(), 0, 3),
            Err(ViewportError::EmptyCanvas)
        );
    }

    #[test]
    fn test_tiny_grid_keeps_floor() {
        let tiny = GridBounds {
            max_column: 2,
            max_row: 2,
        };
        let mut vp = ViewportController::new(tiny, ZoomRange::default(), 280, 7).unwrap();
        vp.recenter(GridPoint::new(2, 2));
        assert_eq!(vp.origin(), GridPoint::new(-1, -1));
    }
}
