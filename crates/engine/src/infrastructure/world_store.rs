//! In-memory world directory loaded from a JSON world file.

use std::path::Path;

use async_trait::async_trait;
use shardline_domain::{lint_world, Location, SpawnPoint, WorldData};

use crate::infrastructure::ports::{RepoError, ResolvedMap, WorldDirectory};

/// Static world graph held in memory for the lifetime of the process.
pub struct InMemoryWorldDirectory {
    data: WorldData,
}

impl InMemoryWorldDirectory {
    /// Wrap already-parsed world data. Lint findings are logged, not fatal.
    pub fn new(data: WorldData) -> Self {
        let findings = lint_world(&data);
        for finding in &findings {
            tracing::warn!(finding = %finding, "World data lint finding");
        }
        tracing::info!(
            worlds = data.worlds.len(),
            findings = findings.len(),
            "World directory loaded"
        );
        Self { data }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepoError::storage("load_world", format!("{}: {e}", path.display())))?;
        let data: WorldData = serde_json::from_str(&raw).map_err(RepoError::serialization)?;
        Ok(Self::new(data))
    }

    pub fn data(&self) -> &WorldData {
        &self.data
    }
}

#[async_trait]
impl WorldDirectory for InMemoryWorldDirectory {
    async fn resolve(&self, location: Location) -> Result<Option<ResolvedMap>, RepoError> {
        Ok(self.data.resolve(&location).map(ResolvedMap::from))
    }

    async fn spawn_point(&self) -> Result<SpawnPoint, RepoError> {
        self.data.spawn_point().map_err(|e| match e {
            shardline_domain::DomainError::NotFound { entity_type, location } => {
                RepoError::not_found(entity_type, location)
            }
            other => RepoError::storage("spawn_point", other),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use shardline_domain::{ScopeClass, ScreenPoint, ServerId};

    use super::*;
    use crate::test_fixtures::sample_world;

    #[tokio::test]
    async fn loads_world_file_and_resolves_maps() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let json = serde_json::to_string(&sample_world()).expect("serialize");
        file.write_all(json.as_bytes()).expect("write");

        let directory = InMemoryWorldDirectory::load(file.path()).await.expect("load");

        let hall = directory
            .resolve(Location::room(0, 1, 2, 0, 0))
            .await
            .expect("resolve")
            .expect("hall exists");
        assert_eq!(hall.class, ScopeClass::Room);
        assert_eq!(hall.owning_server, Some(ServerId::new(0)));
        assert_eq!(hall.near_scopes, vec![Location::room(0, 1, 2, 0, 1)]);

        let missing = directory.resolve(Location::town(0, 99)).await.expect("resolve");
        assert!(missing.is_none());

        let spawn = directory.spawn_point().await.expect("spawn");
        assert_eq!(spawn.position, ScreenPoint::new(120, 80));
    }

    #[tokio::test]
    async fn malformed_file_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ not json").expect("write");

        let result = InMemoryWorldDirectory::load(file.path()).await;
        assert!(matches!(result, Err(RepoError::Serialization(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = InMemoryWorldDirectory::load(dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(RepoError::Storage { .. })));
    }

    #[tokio::test]
    async fn missing_spawn_is_not_found() {
        let mut data = sample_world();
        data.spawn = None;
        let directory = InMemoryWorldDirectory::new(data);
        assert!(directory.spawn_point().await.unwrap_err().is_not_found());
    }
}
