use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CacheResult;
use crate::store::CacheStore;
use crate::version::{Dimension, VersionRegistry};

/// Cached pages are short-lived; version bumps handle correctness, the TTL
/// only bounds how long orphaned entries occupy memory.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(300);

/// The cache-relevant shape of a paginated list query.
///
/// Filters are pre-rendered to strings so the cache layer stays independent
/// of the domain's filter types.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub project_id: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub sort_field: String,
    pub sort_descending: bool,
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    /// Dimensions this query depends on. An unfiltered query depends only on
    /// the global dimension.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Vec::new();
        if let Some(project_id) = &self.project_id {
            dims.push(Dimension::Project(project_id.clone()));
        }
        if let Some(status) = &self.status {
            dims.push(Dimension::Status(status.clone()));
        }
        if let Some(assignee_id) = &self.assignee_id {
            dims.push(Dimension::Assignee(assignee_id.clone()));
        }
        if dims.is_empty() {
            dims.push(Dimension::Global);
        }
        dims
    }

    fn filter_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(project_id) = &self.project_id {
            tokens.push(format!("p:{project_id}"));
        }
        if let Some(status) = &self.status {
            tokens.push(format!("s:{status}"));
        }
        if let Some(assignee_id) = &self.assignee_id {
            tokens.push(format!("a:{assignee_id}"));
        }
        tokens
    }
}

/// Read-through cache for paginated list results.
///
/// `key_for` embeds the current version of every dimension the query touches,
/// so a bump on any of them moves readers to a brand-new key and the old
/// entry simply ages out.
pub struct QueryCache<S: CacheStore> {
    store: Arc<S>,
    versions: VersionRegistry<S>,
    entry_ttl: Duration,
}

impl<S: CacheStore> QueryCache<S> {
    pub fn new(store: Arc<S>, versions: VersionRegistry<S>) -> Self {
        Self {
            store,
            versions,
            entry_ttl: DEFAULT_ENTRY_TTL,
        }
    }

    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Build the versioned cache key for a query, e.g.
    /// `tasks:pv3:sv1:p:123:s:todo:sort:duedate:a:pg:1:20`.
    pub async fn key_for(&self, query: &ListQuery) -> CacheResult<String> {
        let mut parts = vec![self.versions.family().to_string()];

        for dim in query.dimensions() {
            let version = self.versions.get_or_init(&dim).await?;
            parts.push(format!("{}{}", dim.token_prefix(), version));
        }

        parts.extend(query.filter_tokens());

        let direction = if query.sort_descending { "d" } else { "a" };
        parts.push(format!("sort:{}:{}", query.sort_field, direction));
        parts.push(format!("pg:{}:{}", query.page, query.page_size));

        Ok(parts.join(":"))
    }

    /// Fetch a cached result. Store errors and undecodable entries are
    /// treated as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Cached entry is undecodable, treating as miss");
                None
            }
        }
    }

    /// Store a result under a key produced by [`key_for`]. Failures are
    /// logged and swallowed; the caller already has the fresh value.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &bytes, self.entry_ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCacheStore;

    fn cache() -> QueryCache<InMemoryCacheStore> {
        let store = Arc::new(InMemoryCacheStore::new());
        let versions = VersionRegistry::new(store.clone(), "tasks");
        QueryCache::new(store, versions)
    }

    fn filtered_query() -> ListQuery {
        ListQuery {
            project_id: Some("123".to_string()),
            status: Some("todo".to_string()),
            assignee_id: None,
            sort_field: "duedate".to_string(),
            sort_descending: false,
            page: 1,
            page_size: 20,
        }
    }

    #[tokio::test]
    async fn test_key_shape_for_filtered_query() {
        let cache = cache();
        let key = cache.key_for(&filtered_query()).await.unwrap();
        assert_eq!(key, "tasks:pv1:sv1:p:123:s:todo:sort:duedate:a:pg:1:20");
    }

    #[tokio::test]
    async fn test_key_shape_for_unfiltered_query() {
        let cache = cache();
        let query = ListQuery {
            sort_field: "createdat".to_string(),
            sort_descending: true,
            page: 2,
            page_size: 10,
            ..Default::default()
        };
        let key = cache.key_for(&query).await.unwrap();
        assert_eq!(key, "tasks:gv1:sort:createdat:d:pg:2:10");
    }

    #[tokio::test]
    async fn test_same_query_yields_same_key() {
        let cache = cache();
        let first = cache.key_for(&filtered_query()).await.unwrap();
        let second = cache.key_for(&filtered_query()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_bump_changes_only_affected_keys() {
        let store = Arc::new(InMemoryCacheStore::new());
        let versions = VersionRegistry::new(store.clone(), "tasks");
        let cache = QueryCache::new(store.clone(), versions);

        let project_query = filtered_query();
        let other_project = ListQuery {
            project_id: Some("999".to_string()),
            ..filtered_query()
        };

        let before = cache.key_for(&project_query).await.unwrap();
        let other_before = cache.key_for(&other_project).await.unwrap();

        VersionRegistry::new(store, "tasks")
            .bump(&Dimension::Project("123".into()))
            .await
            .unwrap();

        let after = cache.key_for(&project_query).await.unwrap();
        let other_after = cache.key_for(&other_project).await.unwrap();

        assert_ne!(before, after);
        assert_eq!(other_before, other_after);
    }

    #[tokio::test]
    async fn test_get_and_put_roundtrip() {
        let cache = cache();
        let key = cache.key_for(&filtered_query()).await.unwrap();

        assert_eq!(cache.get::<Vec<String>>(&key).await, None);

        let value = vec!["a".to_string(), "b".to_string()];
        cache.put(&key, &value).await;

        assert_eq!(cache.get::<Vec<String>>(&key).await, Some(value));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = cache();
        cache
            .store
            .set("bad", b"not-json", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get::<Vec<String>>("bad").await, None);
    }
}
