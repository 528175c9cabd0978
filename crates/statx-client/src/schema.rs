//! Schema node model and the schema endpoint wire format.
//!
//! The service exposes its datasets as a tree: folders contain databases,
//! databases contain measures and fields, fields contain value sets and
//! values. Each node is addressed by a URL and describes itself plus its
//! immediate children.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Node types the service reports in its schema tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Grouping node containing databases or further folders.
    Folder,
    /// A queryable dataset.
    Database,
    /// A statistic that can be tabulated.
    Measure,
    /// A categorical dimension of a database.
    Field,
    /// A named list of values within a field.
    ValueSet,
    /// A grouping of values or fields.
    Group,
    /// A single categorical value.
    Value,
    /// Any type this client does not recognize. Recorded but never expanded.
    #[serde(other)]
    Unknown,
}

impl NodeType {
    /// The wire name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::Database => "DATABASE",
            Self::Measure => "MEASURE",
            Self::Field => "FIELD",
            Self::ValueSet => "VALUE_SET",
            Self::Group => "GROUP",
            Self::Value => "VALUE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse from a wire name, for command-line validation.
///
/// Unlike deserialization, which folds unrecognized names into
/// [`NodeType::Unknown`], parsing rejects them so that typos surface
/// instead of silently matching nothing.
impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "FOLDER" => Ok(Self::Folder),
            "DATABASE" => Ok(Self::Database),
            "MEASURE" => Ok(Self::Measure),
            "FIELD" => Ok(Self::Field),
            "VALUE_SET" => Ok(Self::ValueSet),
            "GROUP" => Ok(Self::Group),
            "VALUE" => Ok(Self::Value),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unrecognized node type '{other}'")),
        }
    }
}

/// One schema tree node as recorded in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Globally unique node id, e.g. `str:database:UC_Monthly`.
    pub id: String,
    /// Node type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Human-readable label.
    pub label: String,
    /// URL the node's own schema document lives at.
    pub location: String,
    /// Id of the node this one was discovered under. `None` for the root.
    pub parent_id: Option<String>,
}

/// Wire shape of one schema endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    /// Id of the fetched node.
    pub id: String,
    /// Type of the fetched node.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Label of the fetched node.
    pub label: String,
    /// URL of the fetched node. The root document may omit it.
    #[serde(default)]
    pub location: String,
    /// Immediate children. Leaf documents omit the key.
    #[serde(default)]
    pub children: Vec<ChildEntry>,
}

impl SchemaResponse {
    /// The fetched node itself as a cache record, children stripped.
    #[must_use]
    pub fn to_node(&self, parent_id: Option<String>) -> SchemaNode {
        SchemaNode {
            id: self.id.clone(),
            node_type: self.node_type,
            label: self.label.clone(),
            location: self.location.clone(),
            parent_id,
        }
    }
}

/// Wire shape of one child entry in a schema response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildEntry {
    /// Child id.
    pub id: String,
    /// Child type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Child label.
    pub label: String,
    /// Child URL.
    #[serde(default)]
    pub location: String,
}

impl ChildEntry {
    /// The child as a cache record tagged with the id of the response it
    /// arrived in.
    #[must_use]
    pub fn into_node(self, parent_id: &str) -> SchemaNode {
        SchemaNode {
            id: self.id,
            node_type: self.node_type,
            label: self.label,
            location: self.location,
            parent_id: Some(parent_id.to_string()),
        }
    }
}
