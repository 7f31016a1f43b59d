//! Safe-position fallback for rejected transitions.

use std::sync::Arc;

use shardline_domain::{Location, ScopeClass, ScreenPoint};

use crate::infrastructure::ports::WorldDirectory;
use crate::session::{PlayerPlacement, PlayerState};

/// Returned when no scope of a location resolves.
pub const FALLBACK_POINT: ScreenPoint = ScreenPoint::ORIGIN;

/// Finds a position a player can safely be reset to within their current
/// location.
pub struct InsertionPointResolver {
    world: Arc<dyn WorldDirectory>,
}

impl InsertionPointResolver {
    pub fn new(world: Arc<dyn WorldDirectory>) -> Self {
        Self { world }
    }

    /// Scopes tried in order: the location itself, then its tile map, world
    /// and town.
    fn candidates(location: &Location) -> Vec<Location> {
        let own = match location.classify() {
            ScopeClass::Building | ScopeClass::Invalid => None,
            _ => Some(*location),
        };

        let mut candidates: Vec<Location> = Vec::with_capacity(4);
        for candidate in [own, location.tile_map_of(), location.world_of(), location.town_of()]
            .into_iter()
            .flatten()
        {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// Insertion point for `location`. Total: falls back to [`FALLBACK_POINT`].
    pub async fn resolve(&self, location: &Location) -> ScreenPoint {
        for candidate in Self::candidates(location) {
            match self.world.resolve(candidate).await {
                Ok(Some(map)) => return map.insertion_point,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(location = %candidate, error = %e, "Insertion point lookup failed");
                }
            }
        }

        tracing::error!(
            location = %location,
            "No scope of this location resolves, using fallback insertion point"
        );
        FALLBACK_POINT
    }

    /// Reset a player in place: move them to a safe point of their unchanged
    /// location and bump their sync id.
    pub async fn reset(&self, state: &mut PlayerState) -> PlayerPlacement {
        let point = self.resolve(&state.location).await;
        state.position = point;
        state.composer.reset();
        state.sync_id.bump();
        state.placement()
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::infrastructure::ports::{MockWorldDirectory, RepoError};
    use crate::test_fixtures::resolved;

    #[test]
    fn candidates_start_with_own_scope() {
        let room = Location::room(0, 1, 2, 0, 3);
        assert_eq!(
            InsertionPointResolver::candidates(&room),
            vec![room, Location::world(0), Location::town(0, 1)]
        );

        let town = Location::town(0, 1);
        assert_eq!(
            InsertionPointResolver::candidates(&town),
            vec![town, Location::world(0)]
        );

        assert!(InsertionPointResolver::candidates(&Location::invalid()).is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_world_when_room_is_missing() {
        let room = Location::room(0, 1, 2, 0, 3);
        let mut world = MockWorldDirectory::new();
        world.expect_resolve().with(eq(room)).returning(|_| Ok(None));
        world
            .expect_resolve()
            .with(eq(Location::world(0)))
            .returning(|loc| Ok(Some(resolved(loc, ScreenPoint::new(400, 300)))));

        let resolver = InsertionPointResolver::new(Arc::new(world));
        assert_eq!(resolver.resolve(&room).await, ScreenPoint::new(400, 300));
    }

    #[tokio::test]
    async fn lookup_errors_are_skipped() {
        let town = Location::town(0, 1);
        let mut world = MockWorldDirectory::new();
        world
            .expect_resolve()
            .with(eq(town))
            .returning(|_| Err(RepoError::storage("resolve", "unavailable")));
        world
            .expect_resolve()
            .with(eq(Location::world(0)))
            .returning(|loc| Ok(Some(resolved(loc, ScreenPoint::new(7, 8)))));

        let resolver = InsertionPointResolver::new(Arc::new(world));
        assert_eq!(resolver.resolve(&town).await, ScreenPoint::new(7, 8));
    }

    #[tokio::test]
    async fn nothing_resolves_gives_fallback() {
        let mut world = MockWorldDirectory::new();
        world.expect_resolve().returning(|_| Ok(None));

        let resolver = InsertionPointResolver::new(Arc::new(world));
        assert_eq!(
            resolver.resolve(&Location::tile_map(4, 2)).await,
            FALLBACK_POINT
        );
        assert_eq!(resolver.resolve(&Location::invalid()).await, FALLBACK_POINT);
    }

    #[tokio::test]
    async fn reset_moves_to_insertion_point_and_bumps_sync_id() {
        let town = Location::town(0, 1);
        let mut world = MockWorldDirectory::new();
        world
            .expect_resolve()
            .returning(|loc| Ok(Some(resolved(loc, ScreenPoint::new(120, 80)))));
        let resolver = InsertionPointResolver::new(Arc::new(world));

        let mut state = PlayerState::new(town, ScreenPoint::new(3, 3), 1.0);
        let before = state.sync_id;

        let placement = resolver.reset(&mut state).await;

        assert_eq!(placement.location, town);
        assert_eq!(placement.position, ScreenPoint::new(120, 80));
        assert_eq!(placement.orientation, 1.0);
        assert_eq!(placement.sync_id, before.next());
    }
}
