//! World directory port: resolves locations to map objects.

use async_trait::async_trait;
use shardline_domain::{
    Location, MapExit, MapView, ScopeClass, ScreenPoint, ServerId, SpawnPoint,
};

use super::error::RepoError;

/// Owned view of a resolved map, as needed by the transition logic.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMap {
    pub location: Location,
    pub class: ScopeClass,
    pub name: String,
    pub exits: Vec<MapExit>,
    pub insertion_point: ScreenPoint,
    /// `None` when every server hosts the scope
    pub owning_server: Option<ServerId>,
    /// Linked rooms receiving extended-group broadcasts
    pub near_scopes: Vec<Location>,
}

impl ResolvedMap {
    /// The owning server, when it is some server other than `local`.
    pub fn remote_owner(&self, local: ServerId) -> Option<ServerId> {
        match self.owning_server {
            Some(owner) if owner != local => Some(owner),
            _ => None,
        }
    }
}

impl From<MapView<'_>> for ResolvedMap {
    fn from(view: MapView<'_>) -> Self {
        Self {
            location: view.location,
            class: view.class(),
            name: view.name().to_string(),
            exits: view.exits().to_vec(),
            insertion_point: view.insertion_point(),
            owning_server: view.owning_server(),
            near_scopes: view.near_scopes(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldDirectory: Send + Sync {
    /// Resolve a location to its map. `Ok(None)` when no map has that address.
    async fn resolve(&self, location: Location) -> Result<Option<ResolvedMap>, RepoError>;

    /// Where new players are placed.
    async fn spawn_point(&self) -> Result<SpawnPoint, RepoError>;
}
