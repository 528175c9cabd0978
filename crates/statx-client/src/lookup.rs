//! Label-to-id resolution against the schema cache.
//!
//! Table requests speak machine ids, people speak labels. The lookup
//! resolves label chains like database -> geography folder -> geography
//! field -> level into the ids a request needs, reading children through
//! the cache and fetching live only where the cache has none.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::cache::{children_via, SchemaCache};
use crate::error::{Error, Result};
use crate::schema::{NodeType, SchemaNode};
use crate::table::Recode;
use crate::transport::Transport;

/// Default geography folder label in DWP databases.
pub const DEFAULT_GEOGRAPHY_FOLDER: &str = "Geography (residence-based)";
/// Default geography field label in DWP databases.
pub const DEFAULT_GEOGRAPHY_FIELD: &str = "National - Regional - LA - OAs";
/// Default geography level label in DWP databases.
pub const DEFAULT_GEOGRAPHY_LEVEL: &str = "Local Authority";

/// Labels naming one geography breakdown: a folder under the database, a
/// field under the folder, and a level (value set) under the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeographySelection {
    /// Label of the geography folder under the database.
    pub folder_label: String,
    /// Label of the geography field under the folder.
    pub field_label: String,
    /// Label of the level whose values the data is broken down by.
    pub level_label: String,
}

impl Default for GeographySelection {
    fn default() -> Self {
        Self {
            folder_label: DEFAULT_GEOGRAPHY_FOLDER.to_string(),
            field_label: DEFAULT_GEOGRAPHY_FIELD.to_string(),
            level_label: DEFAULT_GEOGRAPHY_LEVEL.to_string(),
        }
    }
}

/// Resolver for label chains, backed by a transport and the cache.
///
/// Every live fetch made while resolving is recorded in the cache, so
/// lookups warm the cache as a side effect.
pub struct SchemaLookup<'a, T: Transport + ?Sized> {
    transport: &'a T,
    cache: &'a mut SchemaCache,
    read_cache: bool,
}

impl<'a, T: Transport + ?Sized> SchemaLookup<'a, T> {
    /// Create a lookup that prefers cached children over live fetches.
    #[must_use]
    pub fn new(transport: &'a T, cache: &'a mut SchemaCache) -> Self {
        Self {
            transport,
            cache,
            read_cache: true,
        }
    }

    /// Control whether cached children are used. Disabling forces a live
    /// fetch for every step.
    #[must_use]
    pub fn with_read_cache(mut self, read_cache: bool) -> Self {
        self.read_cache = read_cache;
        self
    }

    /// Resolve a geography selection under a database into a recode: the
    /// geography field's id plus the ids of every value under the chosen
    /// level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the database id is not in the cache
    /// or any label in the chain matches zero or several children, and any
    /// transport error from live fetches along the chain.
    pub async fn geography_recode(
        &mut self,
        database_id: &str,
        selection: &GeographySelection,
    ) -> Result<Recode> {
        let database = self.cached_node(database_id)?;
        let folder = self
            .resolve_child(&database, &selection.folder_label, "geography folder")
            .await?;
        let field = self
            .resolve_child(&folder, &selection.field_label, "geography field")
            .await?;
        let level = self
            .resolve_child(&field, &selection.level_label, "geography level")
            .await?;
        let values = self
            .children(&level)
            .await?
            .into_iter()
            .map(|value| value.id)
            .collect();
        Ok(Recode {
            field_id: field.id,
            values,
        })
    }

    /// Every field of a database, as a label-to-id map sorted by label.
    ///
    /// Fields may sit directly under the database or be grouped into
    /// folders and groups; containers are descended, other node types are
    /// not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the database id is not in the cache,
    /// and any transport error from live fetches.
    pub async fn database_fields(&mut self, database_id: &str) -> Result<BTreeMap<String, String>> {
        let database = self.cached_node(database_id)?;
        let mut fields = BTreeMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([database]);

        while let Some(container) = queue.pop_front() {
            if !seen.insert(container.id.clone()) {
                continue;
            }
            for node in self.children(&container).await? {
                match node.node_type {
                    NodeType::Field => {
                        fields.insert(node.label.clone(), node.id);
                    }
                    NodeType::Folder | NodeType::Group | NodeType::Database => {
                        queue.push_back(node);
                    }
                    _ => {}
                }
            }
        }
        Ok(fields)
    }

    /// The single child of `parent` labelled `label`.
    async fn resolve_child(
        &mut self,
        parent: &SchemaNode,
        label: &str,
        step: &str,
    ) -> Result<SchemaNode> {
        let children = self.children(parent).await?;
        let mut matches: Vec<SchemaNode> = children
            .into_iter()
            .filter(|child| child.label == label)
            .collect();
        match matches.len() {
            0 => Err(Error::no_match(
                label,
                format!("{step} under '{}'", parent.label),
            )),
            1 => Ok(matches.remove(0)),
            count => Err(Error::ambiguous(
                label,
                format!("{step} under '{}'", parent.label),
                count,
            )),
        }
    }

    async fn children(&mut self, parent: &SchemaNode) -> Result<Vec<SchemaNode>> {
        let fetched = children_via(self.transport, self.cache, parent, self.read_cache).await?;
        Ok(fetched.children)
    }

    fn cached_node(&self, id: &str) -> Result<SchemaNode> {
        self.cache
            .get(id)
            .cloned()
            .ok_or_else(|| Error::no_match(id, "id in the schema cache"))
    }
}
