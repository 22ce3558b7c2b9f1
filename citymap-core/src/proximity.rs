//! Nearest-landmark queries.
//!
//! Distance is Chebyshev distance, which is also the AP cost of walking
//! there, so the same ordering feeds both "nearest X" and cost displays.

use crate::grid::{chebyshev, GridPoint};
use crate::registry::{Category, Entity, PointOfInterestRegistry};

/// A landmark and how far it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nearby<'a> {
    pub distance: u32,
    /// Effective cell of the landmark.
    pub point: GridPoint,
    pub entity: &'a Entity,
}

impl Nearby<'_> {
    pub fn name(&self) -> &str {
        &self.entity.name
    }
}

/// Proximity queries over a registry.
#[derive(Debug, Clone, Copy)]
pub struct ProximityIndex<'a> {
    registry: &'a PointOfInterestRegistry,
}

impl<'a> ProximityIndex<'a> {
    pub fn new(registry: &'a PointOfInterestRegistry) -> Self {
        Self { registry }
    }

    /// Resolved landmarks of a category, nearest first.
    ///
    /// Equal distances keep registry order. Unresolved landmarks are left out.
    pub fn nearest(&self, category: Category, position: GridPoint) -> Vec<Nearby<'a>> {
        let mut hits: Vec<Nearby<'a>> = self
            .registry
            .resolved(category)
            .map(|(entity, point)| Nearby {
                distance: chebyshev(position, point),
                point,
                entity,
            })
            .collect();
        hits.sort_by_key(|hit| hit.distance);
        hits
    }

    /// The single nearest resolved landmark of a category.
    pub fn closest(&self, category: Category, position: GridPoint) -> Option<Nearby<'a>> {
        // First minimum, so ties resolve to registry order like `nearest`.
        self.registry
            .resolved(category)
            .map(|(entity, point)| Nearby {
                distance: chebyshev(position, point),
                point,
                entity,
            })
            .fold(None, |best: Option<Nearby<'a>>, hit| match best {
                Some(b) if b.distance <= hit.distance => Some(b),
                _ => Some(hit),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisModel, NamedAxis};
    use crate::registry::RawEntity;
    use crate::testing::sample_axes;

    #[test]
    fn test_single_tavern_at_position() {
        let axes = AxisModel::new(
            NamedAxis::new([("Aardvark", 2)]),
            NamedAxis::new([("1st", 2)]),
        )
        .unwrap();
        let (registry, _) = PointOfInterestRegistry::from_rows(
            &axes,
            [(Category::Tavern, vec![RawEntity::new("X", "Aardvark", "1st")])],
        );

        let hits = ProximityIndex::new(&registry).nearest(Category::Tavern, GridPoint::new(3, 3));
        let pairs: Vec<_> = hits.iter().map(|h| (h.distance, h.point)).collect();
        assert_eq!(pairs, vec![(0, GridPoint::new(3, 3))]);
    }

    #[test]
    fn test_sorted_with_stable_ties() {
        let axes = sample_axes();
        let (registry, _) = PointOfInterestRegistry::from_rows(
            &axes,
            [(
                Category::Tavern,
                vec![
                    RawEntity::new("Far", "Cedar", "6th"),
                    RawEntity::new("West", "Aardvark", "3rd"),
                    RawEntity::new("East", "Buzzard", "3rd"),
                    RawEntity::new("Here", "Alder", "3rd"),
                ],
            )],
        );
        let index = ProximityIndex::new(&registry);

        let hits = index.nearest(Category::Tavern, GridPoint::new(5, 7));
        let names: Vec<_> = hits.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["Here", "West", "East", "Far"]);
        assert_eq!(hits[1].distance, hits[2].distance);

        assert_eq!(index.closest(Category::Tavern, GridPoint::new(5, 7)).unwrap().name(), "Here");
        // West, East and Here are all 5 away; West was provisioned first.
        assert_eq!(index.closest(Category::Tavern, GridPoint::new(5, 12)).unwrap().name(), "West");
    }

    #[test]
    fn test_unresolved_excluded() {
        let axes = sample_axes();
        let (registry, _) = PointOfInterestRegistry::from_rows(
            &axes,
            [(
                Category::Shop,
                vec![RawEntity::unplaced("Sparks"), RawEntity::new("McPotions", "Beech", "1st")],
            )],
        );

        let hits = ProximityIndex::new(&registry).nearest(Category::Shop, GridPoint::new(0, 0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "McPotions");
        assert!(ProximityIndex::new(&registry)
            .closest(Category::Guild, GridPoint::new(0, 0))
            .is_none());
    }

    #[test]
    fn test_bank_distance_uses_offset() {
        let axes = sample_axes();
        let (registry, _) = PointOfInterestRegistry::from_rows(
            &axes,
            [(Category::Bank, vec![RawEntity::new("OmniBank", "Aardvark", "1st")])],
        );

        let hit = ProximityIndex::new(&registry)
            .closest(Category::Bank, GridPoint::new(3, 3))
            .unwrap();
        assert_eq!(hit.point, GridPoint::new(3, 3));
        assert_eq!(hit.distance, 0);
    }
}
