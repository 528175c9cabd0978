//! Breadth-first schema discovery.
//!
//! [`SchemaWalker`] walks the schema tree wave by wave, recording every
//! node it sees in a [`SchemaCache`]. Only nodes whose type is in the
//! allowed set are expanded; everything else is recorded as a leaf. A
//! failed child fetch skips that node and the walk continues, so one
//! broken subtree does not cost the rest of the schema.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::cache::{children_via, SchemaCache};
use crate::error::Result;
use crate::schema::{NodeType, SchemaNode};
use crate::transport::Transport;

/// Counters describing one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Nodes newly recorded in the cache.
    pub nodes_recorded: usize,
    /// Nodes whose children were asked for.
    pub nodes_expanded: usize,
    /// Child fetches that failed and were skipped.
    pub fetch_failures: usize,
    /// Expansions answered from the cache instead of the service.
    pub cache_hits: usize,
    /// Breadth-first waves processed.
    pub waves: usize,
}

/// Breadth-first walker over the schema tree.
#[derive(Debug, Clone)]
pub struct SchemaWalker {
    allowed_types: HashSet<NodeType>,
    persist_path: Option<PathBuf>,
    read_cache: bool,
}

impl Default for SchemaWalker {
    fn default() -> Self {
        Self {
            allowed_types: Self::default_allowed_types(),
            persist_path: None,
            read_cache: false,
        }
    }
}

impl SchemaWalker {
    /// Create a walker with the default allowed types, no persistence, and
    /// cache reads disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The types expanded by default: folders, databases, measures, and
    /// fields. Value sets and values are recorded but left unexpanded;
    /// enumerating every categorical value would dwarf the rest of the
    /// schema.
    #[must_use]
    pub fn default_allowed_types() -> HashSet<NodeType> {
        [
            NodeType::Folder,
            NodeType::Database,
            NodeType::Measure,
            NodeType::Field,
        ]
        .into_iter()
        .collect()
    }

    /// Replace the set of node types the walker expands.
    #[must_use]
    pub fn with_allowed_types(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.allowed_types = types.into_iter().collect();
        self
    }

    /// Write the cache to `path` after every wave, so an interrupted walk
    /// leaves a usable partial cache behind.
    #[must_use]
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    /// Answer expansions from the cache when it already holds children for
    /// a node, instead of refetching. Lets a walk resume over a previously
    /// persisted cache.
    #[must_use]
    pub fn with_read_cache(mut self, read_cache: bool) -> Self {
        self.read_cache = read_cache;
        self
    }

    /// Walk the schema tree starting at `root_url`, recording every node
    /// into `cache`.
    ///
    /// Each wave expands the previous wave's children whose type is
    /// allowed. A node is expanded at most once even if the tree links to
    /// it from several places, so walks over cyclic schemas terminate.
    /// Child fetch failures are logged and skipped; the failed node's
    /// subtree is simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the root fetch fails or the cache cannot be
    /// persisted. Everything past the root is non-fatal.
    pub async fn discover<T>(
        &self,
        transport: &T,
        root_url: &str,
        cache: &mut SchemaCache,
    ) -> Result<WalkStats>
    where
        T: Transport + ?Sized,
    {
        let mut stats = WalkStats::default();

        let root = transport.fetch_schema(root_url).await?;
        let mut root_node = root.to_node(None);
        if root_node.location.is_empty() {
            // The root document may not state its own URL.
            root_node.location = root_url.to_string();
        }
        if cache.insert(root_node.clone()) {
            stats.nodes_recorded += 1;
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier = vec![root_node];

        while !frontier.is_empty() {
            let mut next: Vec<SchemaNode> = Vec::new();

            for node in &frontier {
                if !self.allowed_types.contains(&node.node_type) {
                    continue;
                }
                if !visited.insert(node.id.clone()) {
                    continue;
                }
                stats.nodes_expanded += 1;

                match children_via(transport, cache, node, self.read_cache).await {
                    Ok(fetched) => {
                        if fetched.from_cache {
                            stats.cache_hits += 1;
                        }
                        stats.nodes_recorded += fetched.newly_recorded;
                        next.extend(
                            fetched
                                .children
                                .into_iter()
                                .filter(|child| self.allowed_types.contains(&child.node_type)),
                        );
                    }
                    Err(err) => {
                        stats.fetch_failures += 1;
                        tracing::warn!(
                            url = %node.location,
                            error = %err,
                            "child fetch failed, skipping node"
                        );
                    }
                }
            }

            stats.waves += 1;
            if let Some(path) = &self.persist_path {
                cache.save(path)?;
            }
            frontier = next;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{ChildEntry, SchemaResponse};
    use crate::transport::StaticTransport;

    fn url(id: &str) -> String {
        format!("mem:/schema/{id}")
    }

    fn child(id: &str, node_type: NodeType) -> ChildEntry {
        ChildEntry {
            id: id.to_string(),
            node_type,
            label: format!("label {id}"),
            location: url(id),
        }
    }

    fn doc(id: &str, node_type: NodeType, children: Vec<ChildEntry>) -> SchemaResponse {
        SchemaResponse {
            id: id.to_string(),
            node_type,
            label: format!("label {id}"),
            location: url(id),
            children,
        }
    }

    /// root -> f1 (folder) -> m1 (measure, leaf)
    ///      -> db1 (database) -> fld1 (field) -> val1 (value)
    ///                        -> vs1 (value set, never expanded)
    fn sample_tree() -> StaticTransport {
        let mut transport = StaticTransport::new();
        transport.insert(
            url("root"),
            doc(
                "root",
                NodeType::Folder,
                vec![child("f1", NodeType::Folder), child("db1", NodeType::Database)],
            ),
        );
        transport.insert(
            url("f1"),
            doc("f1", NodeType::Folder, vec![child("m1", NodeType::Measure)]),
        );
        transport.insert(url("m1"), doc("m1", NodeType::Measure, vec![]));
        transport.insert(
            url("db1"),
            doc(
                "db1",
                NodeType::Database,
                vec![
                    child("fld1", NodeType::Field),
                    child("vs1", NodeType::ValueSet),
                ],
            ),
        );
        transport.insert(
            url("fld1"),
            doc("fld1", NodeType::Field, vec![child("val1", NodeType::Value)]),
        );
        transport
    }

    #[tokio::test]
    async fn walk_records_every_reachable_node_with_its_parent() {
        let transport = sample_tree();
        let mut cache = SchemaCache::new();

        let stats = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        assert_eq!(stats.nodes_recorded, 7);
        assert_eq!(cache.len(), 7);
        assert_eq!(stats.fetch_failures, 0);
        assert_eq!(stats.cache_hits, 0);
        assert!(cache.get("root").unwrap().parent_id.is_none());
        assert_eq!(cache.get("m1").unwrap().parent_id.as_deref(), Some("f1"));
        assert_eq!(
            cache.get("val1").unwrap().parent_id.as_deref(),
            Some("fld1")
        );
    }

    #[tokio::test]
    async fn disallowed_types_are_recorded_but_not_expanded() {
        let transport = sample_tree();
        let mut cache = SchemaCache::new();

        let stats = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        // vs1 and val1 are in the cache but their URLs were never fetched.
        assert!(cache.get("vs1").is_some());
        assert!(cache.get("val1").is_some());
        let fetched = transport.fetched_urls();
        assert!(!fetched.contains(&url("vs1")));
        assert!(!fetched.contains(&url("val1")));
        assert_eq!(stats.nodes_expanded, 5);
    }

    #[tokio::test]
    async fn cyclic_schema_terminates() {
        let mut transport = StaticTransport::new();
        transport.insert(
            url("root"),
            doc("root", NodeType::Folder, vec![child("f1", NodeType::Folder)]),
        );
        // f1 points back at the root.
        transport.insert(
            url("f1"),
            doc("f1", NodeType::Folder, vec![child("root", NodeType::Folder)]),
        );

        let mut cache = SchemaCache::new();
        let stats = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(stats.nodes_expanded, 2);
        // The root is fetched once to identify it and once to expand it;
        // the cycle back to it is never followed.
        assert_eq!(
            transport.fetched_urls(),
            vec![url("root"), url("root"), url("f1")]
        );
    }

    #[tokio::test]
    async fn failed_child_fetch_skips_the_subtree_and_continues() {
        let mut transport = sample_tree();
        transport.fail(&url("f1"));

        let mut cache = SchemaCache::new();
        let stats = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        assert_eq!(stats.fetch_failures, 1);
        // f1 is recorded as a child of root, but its subtree is absent.
        assert!(cache.get("f1").is_some());
        assert!(cache.get("m1").is_none());
        // The sibling subtree is intact.
        assert!(cache.get("fld1").is_some());
        assert!(cache.get("val1").is_some());
    }

    #[tokio::test]
    async fn root_fetch_failure_is_fatal() {
        let transport = StaticTransport::new();
        let mut cache = SchemaCache::new();

        let err = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn duplicate_child_ids_keep_their_first_parent() {
        let mut transport = StaticTransport::new();
        transport.insert(
            url("root"),
            doc(
                "root",
                NodeType::Folder,
                vec![child("a", NodeType::Folder), child("b", NodeType::Folder)],
            ),
        );
        // Both folders list the same database.
        transport.insert(
            url("a"),
            doc("a", NodeType::Folder, vec![child("shared", NodeType::Database)]),
        );
        transport.insert(
            url("b"),
            doc("b", NodeType::Folder, vec![child("shared", NodeType::Database)]),
        );
        transport.insert(url("shared"), doc("shared", NodeType::Database, vec![]));

        let mut cache = SchemaCache::new();
        let stats = SchemaWalker::new()
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("shared").unwrap().parent_id.as_deref(), Some("a"));
        // The shared database is expanded once, not twice.
        let shared_fetches = transport
            .fetched_urls()
            .iter()
            .filter(|fetched| **fetched == url("shared"))
            .count();
        assert_eq!(shared_fetches, 1);
        assert_eq!(stats.nodes_expanded, 4);
    }

    #[tokio::test]
    async fn persisted_cache_is_loadable_after_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.csv");

        let transport = sample_tree();
        let mut cache = SchemaCache::new();
        SchemaWalker::new()
            .with_persist_path(&path)
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        let loaded = SchemaCache::load(&path).unwrap();
        assert_eq!(loaded.len(), cache.len());
        assert_eq!(loaded.nodes(), cache.nodes());
    }

    #[tokio::test]
    async fn warm_cache_walk_expands_from_cached_children() {
        // First walk against the full tree, persisting the cache.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.csv");
        let transport = sample_tree();
        let mut cache = SchemaCache::new();
        SchemaWalker::new()
            .with_persist_path(&path)
            .discover(&transport, &url("root"), &mut cache)
            .await
            .unwrap();

        // Second walk over the loaded cache against a transport that only
        // knows the root. Cached children answer every other expansion.
        let mut offline = StaticTransport::new();
        offline.insert(url("root"), doc("root", NodeType::Folder, vec![]));

        let mut warm = SchemaCache::load(&path).unwrap();
        let stats = SchemaWalker::new()
            .with_read_cache(true)
            .discover(&offline, &url("root"), &mut warm)
            .await
            .unwrap();

        // m1 has no cached children, so it alone falls through to a live
        // fetch, which the offline transport answers with 404.
        assert_eq!(stats.cache_hits, 4);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.nodes_recorded, 0);
        assert_eq!(warm.len(), 7);
    }
}
