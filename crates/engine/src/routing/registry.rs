//! Registry of live membership routers, keyed by scope.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use shardline_domain::{Location, PlayerKey};
use shardline_shared::{Occupant, ServerMessage};

use super::membership_router::{deliver, MembershipRouter};
use crate::infrastructure::ports::ResolvedMap;
use crate::session::PlayerHandle;

/// Which members of a scope's neighbourhood receive a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastGroup {
    /// Members of the scope itself
    Local,
    /// The scope and its near scopes
    Extended,
    /// Near scopes only
    NearOnly,
}

#[derive(Debug, Default)]
pub struct RouterRegistry {
    routers: DashMap<Location, Arc<MembershipRouter>>,
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router of a resolved map, created on first use.
    pub fn router_for(&self, map: &ResolvedMap) -> Arc<MembershipRouter> {
        self.routers
            .entry(map.location)
            .or_insert_with(|| {
                tracing::debug!(scope = %map.location, "Creating membership router");
                Arc::new(MembershipRouter::new(map.location, map.near_scopes.clone()))
            })
            .value()
            .clone()
    }

    /// Router of a scope, if anyone ever entered it.
    pub fn get(&self, scope: &Location) -> Option<Arc<MembershipRouter>> {
        self.routers.get(scope).map(|r| Arc::clone(r.value()))
    }

    /// Remove a player from a scope's router. No router means no-op.
    pub fn remove_player(&self, scope: &Location, primary_key: &PlayerKey) -> Option<PlayerHandle> {
        self.get(scope)?.remove(primary_key)
    }

    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    fn group_scopes(&self, scope: &Location, group: BroadcastGroup) -> Vec<Location> {
        let near = self
            .get(scope)
            .map(|r| r.near_scopes().to_vec())
            .unwrap_or_default();
        match group {
            BroadcastGroup::Local => vec![*scope],
            BroadcastGroup::NearOnly => near,
            BroadcastGroup::Extended => std::iter::once(*scope).chain(near).collect(),
        }
    }

    /// Members of the given group around each of `scopes`, each player once.
    pub fn recipients(&self, scopes: &[Location], group: BroadcastGroup) -> Vec<PlayerHandle> {
        let mut seen_scopes = HashSet::new();
        let mut seen_players = HashSet::new();
        let mut recipients = Vec::new();

        for scope in scopes {
            for target in self.group_scopes(scope, group) {
                if !seen_scopes.insert(target) {
                    continue;
                }
                let Some(router) = self.get(&target) else {
                    continue;
                };
                for handle in router.members() {
                    if seen_players.insert(handle.primary_key.clone()) {
                        recipients.push(handle);
                    }
                }
            }
        }
        recipients
    }

    /// Everyone in `scope` and its near scopes except `newcomer`, for the
    /// newcomer's first view of the scope.
    pub fn scope_occupants(&self, scope: &Location, newcomer: &PlayerKey) -> ServerMessage {
        let mut seen = HashSet::new();
        let mut players = Vec::new();
        for target in self.group_scopes(scope, BroadcastGroup::Extended) {
            let Some(router) = self.get(&target) else {
                continue;
            };
            for handle in router.members() {
                if handle.primary_key == *newcomer || !seen.insert(handle.primary_key.clone()) {
                    continue;
                }
                let presence = handle.presence();
                players.push(Occupant {
                    primary_key: handle.primary_key,
                    location: target,
                    x: presence.position.x,
                    y: presence.position.y,
                    orientation: presence.orientation,
                });
            }
        }
        players.sort_by(|a, b| a.primary_key.as_str().cmp(b.primary_key.as_str()));
        ServerMessage::ScopeOccupants {
            location: *scope,
            players,
        }
    }

    /// Broadcast to a scope's group. Returns the number of deliveries.
    pub fn broadcast(
        &self,
        scope: &Location,
        group: BroadcastGroup,
        message: &ServerMessage,
        excluding: Option<&PlayerKey>,
    ) -> usize {
        self.broadcast_many(std::slice::from_ref(scope), group, message, excluding)
    }

    /// Broadcast to the union of several scopes' groups without duplicates.
    pub fn broadcast_many(
        &self,
        scopes: &[Location],
        group: BroadcastGroup,
        message: &ServerMessage,
        excluding: Option<&PlayerKey>,
    ) -> usize {
        deliver(self.recipients(scopes, group), message, excluding)
    }
}
