//! Movement costs.
//!
//! Walking costs one AP per Chebyshev step. A transit route walks to the
//! station nearest the start, rides for free to the station nearest the
//! destination, and walks from there.

use crate::grid::{chebyshev, GridPoint};
use crate::proximity::{Nearby, ProximityIndex};
use crate::registry::{Category, PointOfInterestRegistry};

/// AP cost of walking straight from `a` to `b`.
pub fn direct_cost(a: GridPoint, b: GridPoint) -> u32 {
    chebyshev(a, b)
}

/// A two-leg route through the transit network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitRoute<'a> {
    /// Station nearest the start; its distance is the first leg.
    pub boarding: Nearby<'a>,
    /// Station nearest the destination; its distance is the second leg.
    pub alighting: Nearby<'a>,
}

impl TransitRoute<'_> {
    /// Walking AP for both legs. Station-to-station travel is free.
    pub fn total_cost(&self) -> u32 {
        self.boarding.distance.saturating_add(self.alighting.distance)
    }
}

/// Direct and transit costs for one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions<'a> {
    pub direct: u32,
    pub transit: Option<TransitRoute<'a>>,
}

impl RouteOptions<'_> {
    /// The cheaper of the two, preferring walking on a tie.
    pub fn best_cost(&self) -> u32 {
        self.transit
            .map(|t| t.total_cost().min(self.direct))
            .unwrap_or(self.direct)
    }

    pub fn transit_saves(&self) -> bool {
        self.transit.is_some_and(|t| t.total_cost() < self.direct)
    }
}

/// Cost calculations over a registry's transit stations.
#[derive(Debug, Clone, Copy)]
pub struct RoutePlanner<'a> {
    proximity: ProximityIndex<'a>,
}

impl<'a> RoutePlanner<'a> {
    pub fn new(registry: &'a PointOfInterestRegistry) -> Self {
        Self {
            proximity: ProximityIndex::new(registry),
        }
    }

    pub fn direct_cost(&self, from: GridPoint, to: GridPoint) -> u32 {
        direct_cost(from, to)
    }

    pub fn nearest_transit(&self, position: GridPoint) -> Option<Nearby<'a>> {
        self.proximity.closest(Category::Transit, position)
    }

    /// Route via the nearest stations, or `None` when no station is resolved.
    pub fn transit_cost(&self, from: GridPoint, to: GridPoint) -> Option<TransitRoute<'a>> {
        Some(TransitRoute {
            boarding: self.nearest_transit(from)?,
            alighting: self.nearest_transit(to)?,
        })
    }

    pub fn options(&self, from: GridPoint, to: GridPoint) -> RouteOptions<'a> {
        RouteOptions {
            direct: self.direct_cost(from, to),
            transit: self.transit_cost(from, to),
        }
    }
}
