//! The Manifest Resolver (C6, §4.6): resolves `(name, version)` against
//! the Registry, with a local read-mostly cache bounded to a 60 s TTL.

use crate::client::{ManifestWithId, RegistryClient, VersionQuery};
use crucible_core::ToolName;
use crucible_error::Error;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// 60 s, per §4.6: "Local caching of resolved manifests is permitted;
/// TTL ≤ 60 s, or invalidation on Registry status-change events."
const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    version: String,
}

/// Resolves tool manifests, caching successful resolutions for up to 60 s.
pub struct ManifestResolver {
    client: Arc<dyn RegistryClient>,
    cache: Cache<CacheKey, ManifestWithId>,
}

impl ManifestResolver {
    #[must_use]
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            cache: Cache::builder().time_to_live(CACHE_TTL).max_capacity(10_000).build(),
        }
    }

    /// `Resolve(name, version) -> Manifest` (§4.6). `version = "latest"`
    /// is forwarded to the Registry, which is authoritative for ordering
    /// published versions; an exact version must match precisely.
    pub async fn resolve(
        &self,
        name: &ToolName,
        version: &VersionQuery,
    ) -> Result<ManifestWithId, Error> {
        let key = CacheKey { name: name.as_str().to_string(), version: version.to_string() };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let resolved = self.client.get_tool(name, version).await?;
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Drop a cached resolution, e.g. on a Registry status-change event.
    pub fn invalidate(&self, name: &ToolName, version: &VersionQuery) {
        let key = CacheKey { name: name.as_str().to_string(), version: version.to_string() };
        self.cache.invalidate(&key);
    }
}
