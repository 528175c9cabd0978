//! On-disk schema cache.
//!
//! Discovered nodes live in memory in discovery order and persist to a
//! single CSV file with the columns `id,type,label,location,parent_id`.
//! Ids are unique; re-inserting an id is a no-op, so the first discovery
//! of a node wins.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::{SchemaNode, SchemaResponse};
use crate::transport::Transport;

/// All schema nodes discovered so far, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    nodes: Vec<SchemaNode>,
    index: HashMap<String, usize>,
}

impl SchemaCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache from a CSV file written by [`SchemaCache::save`].
    ///
    /// Rows with an id already seen are skipped, keeping the first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the file cannot be read or a row does
    /// not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| Error::cache(format!("could not read {}: {e}", path.display())))?;
        let mut cache = Self::new();
        for row in reader.deserialize::<SchemaNode>() {
            let node =
                row.map_err(|e| Error::cache(format!("bad row in {}: {e}", path.display())))?;
            cache.insert(node);
        }
        Ok(cache)
    }

    /// Write the cache to a CSV file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::cache(format!("could not create {}: {e}", parent.display()))
                })?;
            }
        }
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| Error::cache(format!("could not open {}: {e}", path.display())))?;
        for node in &self.nodes {
            writer
                .serialize(node)
                .map_err(|e| Error::cache(format!("could not write {}: {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| Error::cache(format!("could not write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Record a node. Returns `true` if the node was new, `false` if its id
    /// was already present (the existing record is kept).
    pub fn insert(&mut self, node: SchemaNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// The node with the given id, if recorded.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SchemaNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// The node whose schema document lives at `location`, if recorded.
    #[must_use]
    pub fn node_for_location(&self, location: &str) -> Option<&SchemaNode> {
        self.nodes.iter().find(|node| node.location == location)
    }

    /// All nodes recorded under the given parent id, in discovery order.
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> Vec<&SchemaNode> {
        self.nodes
            .iter()
            .filter(|node| node.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// All recorded nodes in discovery order.
    #[must_use]
    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// Number of recorded nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Children of one node, read through the cache.
#[derive(Debug, Clone)]
pub struct FetchedChildren {
    /// The node's children, each tagged with the node's id.
    pub children: Vec<SchemaNode>,
    /// Whether the children came from the cache rather than a live fetch.
    pub from_cache: bool,
    /// How many of the children were not previously recorded.
    pub newly_recorded: usize,
}

/// The children of `parent`, from the cache when possible, otherwise
/// fetched live and recorded.
///
/// The cache answers only when `read_cache` is set, a node is recorded at
/// the parent's location, and at least one child is recorded under it. A
/// node with no cached children cannot be told apart from one that was
/// never expanded, so it falls through to a live fetch.
///
/// Children of a live fetch are tagged with the id the response declares,
/// not the id the caller navigated by.
///
/// # Errors
///
/// Returns an error if the live fetch fails.
pub async fn children_via<T>(
    transport: &T,
    cache: &mut SchemaCache,
    parent: &SchemaNode,
    read_cache: bool,
) -> Result<FetchedChildren>
where
    T: Transport + ?Sized,
{
    if read_cache {
        if let Some(recorded) = cache.node_for_location(&parent.location) {
            let children: Vec<SchemaNode> = cache
                .children_of(&recorded.id)
                .into_iter()
                .cloned()
                .collect();
            if !children.is_empty() {
                return Ok(FetchedChildren {
                    children,
                    from_cache: true,
                    newly_recorded: 0,
                });
            }
        }
    }

    let response = transport.fetch_schema(&parent.location).await?;
    let SchemaResponse { id, children, .. } = response;
    let children: Vec<SchemaNode> = children
        .into_iter()
        .map(|child| child.into_node(&id))
        .collect();

    let mut newly_recorded = 0;
    for child in &children {
        if cache.insert(child.clone()) {
            newly_recorded += 1;
        }
    }
    Ok(FetchedChildren {
        children,
        from_cache: false,
        newly_recorded,
    })
}
