//! # statx-client
//!
//! Client for the Stat-Xplore statistical-data API: schema discovery, an
//! on-disk schema cache, label-to-id lookup, table requests, and cube
//! unpacking into flat rows.
//!
//! The pipeline, end to end:
//!
//! 1. [`SchemaWalker`] walks the schema tree breadth-first through a
//!    [`Transport`], recording every node in a [`SchemaCache`] and
//!    persisting it to CSV after every wave.
//! 2. [`SchemaLookup`] resolves human-readable labels against the cache
//!    into the machine ids a request needs, fetching live only where the
//!    cache has no children.
//! 3. [`build_table_request`] assembles a [`TableRequest`] for one
//!    measure; [`fetch_measure_table`] submits it and unpacks the
//!    response.
//! 4. [`cube::unpack`] flattens the three-field response cube into
//!    [`DataTable`] rows.
//!
//! All remote access is sequential: one request is issued and fully
//! awaited before the next. Requests carry exactly one measure and one
//! geography recode, and responses must declare exactly three fields;
//! other shapes are rejected rather than generalized.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cache;
pub mod credentials;
pub mod cube;
pub mod error;
pub mod lookup;
pub mod schema;
pub mod table;
pub mod transport;
pub mod walker;

pub use cache::{children_via, FetchedChildren, SchemaCache};
pub use credentials::{Credentials, Endpoints, DEFAULT_BASE_URL};
pub use cube::{coordinates, unpack, DataTable, TableRow};
pub use error::{Error, Result};
pub use lookup::{
    GeographySelection, SchemaLookup, DEFAULT_GEOGRAPHY_FIELD, DEFAULT_GEOGRAPHY_FOLDER,
    DEFAULT_GEOGRAPHY_LEVEL,
};
pub use schema::{ChildEntry, NodeType, SchemaNode, SchemaResponse};
pub use table::{
    build_table_request, database_id_for_measure, fetch_measure_table, CubeValues, FieldItem,
    MeasureRef, Recode, RecodeSpec, RequestOptions, TableField, TableRequest, TableResponse,
};
pub use transport::{HttpTransport, StaticTransport, Transport, API_KEY_HEADER};
pub use walker::{SchemaWalker, WalkStats};
