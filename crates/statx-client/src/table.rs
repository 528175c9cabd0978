//! Table request construction and the table endpoint wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::SchemaCache;
use crate::cube::{self, DataTable};
use crate::error::{Error, Result};
use crate::lookup::{GeographySelection, SchemaLookup};
use crate::transport::Transport;

const DATABASE_ID_PREFIX: &str = "str:database:";

/// The id of the database a measure belongs to.
///
/// Measure ids are colon-delimited with the database name as the
/// second-to-last segment, e.g. `str:measure:UC_Monthly:V_F_UC` belongs to
/// `str:database:UC_Monthly`.
///
/// # Errors
///
/// Returns [`Error::InvalidMeasureId`] if the id has fewer than two
/// segments.
pub fn database_id_for_measure(measure_id: &str) -> Result<String> {
    let segments: Vec<&str> = measure_id.split(':').collect();
    if segments.len() < 2 {
        return Err(Error::InvalidMeasureId {
            id: measure_id.to_string(),
        });
    }
    let database_name = segments[segments.len() - 2];
    Ok(format!("{DATABASE_ID_PREFIX}{database_name}"))
}

/// A resolved geography selection: the field to recode and the value ids
/// to restrict it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recode {
    /// Id of the geography field.
    pub field_id: String,
    /// Ids of the values at the chosen level.
    pub values: Vec<String>,
}

/// Wire shape of one recode in a table request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecodeSpec {
    /// Requested value ids, each wrapped as a singleton group.
    pub map: Vec<Vec<String>>,
    /// Whether the response should include a total across all values.
    pub total: bool,
}

impl RecodeSpec {
    /// Build a recode spec from a flat list of value ids.
    #[must_use]
    pub fn from_values(values: &[String], include_total: bool) -> Self {
        Self {
            map: values.iter().map(|value| vec![value.clone()]).collect(),
            total: include_total,
        }
    }
}

/// Wire shape of a table request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    /// Id of the database the measure lives in.
    pub database: String,
    /// Measure ids to tabulate. This client always sends exactly one.
    pub measures: Vec<String>,
    /// Field ids to break the data down by, each a singleton group.
    pub dimensions: Vec<Vec<String>>,
    /// Value restrictions keyed by field id.
    pub recodes: BTreeMap<String, RecodeSpec>,
}

/// Wire shape of one field in a table response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableField {
    /// Field label.
    pub label: String,
    /// One item per position along this axis.
    #[serde(default)]
    pub items: Vec<FieldItem>,
}

/// Wire shape of one item on a response axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldItem {
    /// Labels for this item. The first is the display label.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Ids backing this item.
    #[serde(default)]
    pub uris: Vec<String>,
}

/// Wire shape of one measure reference in a table response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureRef {
    /// Id of the measure, keying into the response cubes.
    pub uri: String,
    /// Measure label.
    #[serde(default)]
    pub label: String,
}

/// Wire shape of one cube in a table response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeValues {
    /// Nested arrays of numbers, one nesting level per field.
    pub values: serde_json::Value,
}

/// Wire shape of a table response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResponse {
    /// Axes of the cube, in nesting order.
    #[serde(default)]
    pub fields: Vec<TableField>,
    /// Measures the response carries cubes for.
    #[serde(default)]
    pub measures: Vec<MeasureRef>,
    /// Cubes keyed by measure uri.
    #[serde(default)]
    pub cubes: BTreeMap<String, CubeValues>,
}

/// Choices for building a table request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Geography breakdown to resolve and recode.
    pub geography: GeographySelection,
    /// Whether the recode asks for a total across all values.
    pub include_total: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            geography: GeographySelection::default(),
            include_total: true,
        }
    }
}

/// Build a table request for one measure.
///
/// Dimensions default to every field of the measure's database; an
/// explicit `field_ids` list restricts them, silently dropping ids the
/// database does not have. The geography selection is resolved to a
/// recode, and the recoded field is added as a dimension if it is not one
/// already, so every recode key is also a dimension.
///
/// # Errors
///
/// Returns an error if the measure id is malformed, the database is not
/// in the cache, or the geography labels do not resolve.
pub async fn build_table_request<T>(
    lookup: &mut SchemaLookup<'_, T>,
    measure_id: &str,
    field_ids: Option<&[String]>,
    options: &RequestOptions,
) -> Result<TableRequest>
where
    T: Transport + ?Sized,
{
    let database_id = database_id_for_measure(measure_id)?;
    let known_fields = lookup.database_fields(&database_id).await?;

    let mut dimensions: Vec<Vec<String>> = match field_ids {
        Some(ids) => ids
            .iter()
            .filter(|id| known_fields.values().any(|known| known == *id))
            .map(|id| vec![id.clone()])
            .collect(),
        None => known_fields.values().map(|id| vec![id.clone()]).collect(),
    };

    let recode = lookup
        .geography_recode(&database_id, &options.geography)
        .await?;
    let recode_dimension = vec![recode.field_id.clone()];
    if !dimensions.contains(&recode_dimension) {
        dimensions.push(recode_dimension);
    }

    let mut recodes = BTreeMap::new();
    recodes.insert(
        recode.field_id,
        RecodeSpec::from_values(&recode.values, options.include_total),
    );

    Ok(TableRequest {
        database: database_id,
        measures: vec![measure_id.to_string()],
        dimensions,
        recodes,
    })
}

/// Fetch one measure as a flat table: build the request, submit it, and
/// unpack the response cube.
///
/// # Errors
///
/// Returns any error from [`build_table_request`], a failed submission,
/// or a response whose shape [`cube::unpack`] rejects.
pub async fn fetch_measure_table<T>(
    transport: &T,
    cache: &mut SchemaCache,
    measure_id: &str,
    field_ids: Option<&[String]>,
    options: &RequestOptions,
) -> Result<DataTable>
where
    T: Transport + ?Sized,
{
    let request = {
        let mut lookup = SchemaLookup::new(transport, cache);
        build_table_request(&mut lookup, measure_id, field_ids, options).await?
    };
    let response = transport.submit_table(&request).await?;
    cube::unpack(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChildEntry, NodeType, SchemaNode, SchemaResponse};
    use crate::transport::StaticTransport;

    const MEASURE_ID: &str = "str:measure:UC_Monthly:people";
    const DB_ID: &str = "str:database:UC_Monthly";

    #[test]
    fn database_id_uses_the_second_to_last_segment() {
        assert_eq!(database_id_for_measure(MEASURE_ID).unwrap(), DB_ID);
        assert_eq!(
            database_id_for_measure("str:count:HB:V_F_HB").unwrap(),
            "str:database:HB"
        );
    }

    #[test]
    fn measure_id_without_segments_is_invalid() {
        let err = database_id_for_measure("people").unwrap_err();
        assert!(matches!(err, Error::InvalidMeasureId { .. }));
    }

    #[test]
    fn recode_spec_wraps_each_value_as_a_singleton_group() {
        let values = vec!["a".to_string(), "b".to_string()];
        let spec = RecodeSpec::from_values(&values, true);
        assert_eq!(spec.map, vec![vec!["a".to_string()], vec!["b".to_string()]]);
        assert!(spec.total);
    }

    #[test]
    fn recode_spec_serializes_to_the_wire_shape() {
        let spec = RecodeSpec::from_values(&["v1".to_string()], false);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"map": [["v1"]], "total": false})
        );
    }

    fn url(id: &str) -> String {
        format!("mem:/schema/{id}")
    }

    fn child(id: &str, node_type: NodeType, label: &str) -> ChildEntry {
        ChildEntry {
            id: id.to_string(),
            node_type,
            label: label.to_string(),
            location: url(id),
        }
    }

    fn doc(id: &str, node_type: NodeType, label: &str, children: Vec<ChildEntry>) -> SchemaResponse {
        SchemaResponse {
            id: id.to_string(),
            node_type,
            label: label.to_string(),
            location: url(id),
            children,
        }
    }

    /// Database with a month field and a geography folder holding one
    /// field with one level of two values.
    fn fixture() -> (StaticTransport, SchemaCache) {
        let mut transport = StaticTransport::new();
        transport.insert(
            url("db"),
            doc(
                DB_ID,
                NodeType::Database,
                "UC Monthly",
                vec![
                    child("fld:month", NodeType::Field, "Month"),
                    child("folder:geo", NodeType::Folder, "Geography (residence-based)"),
                ],
            ),
        );
        transport.insert(url("fld:month"), doc("fld:month", NodeType::Field, "Month", vec![]));
        transport.insert(
            url("folder:geo"),
            doc(
                "folder:geo",
                NodeType::Folder,
                "Geography (residence-based)",
                vec![child("fld:geo", NodeType::Field, "National - Regional - LA - OAs")],
            ),
        );
        transport.insert(
            url("fld:geo"),
            doc(
                "fld:geo",
                NodeType::Field,
                "National - Regional - LA - OAs",
                vec![child("vs:la", NodeType::ValueSet, "Local Authority")],
            ),
        );
        transport.insert(
            url("vs:la"),
            doc(
                "vs:la",
                NodeType::ValueSet,
                "Local Authority",
                vec![
                    child("val:1", NodeType::Value, "Hartlepool"),
                    child("val:2", NodeType::Value, "Middlesbrough"),
                ],
            ),
        );

        let mut cache = SchemaCache::new();
        cache.insert(SchemaNode {
            id: DB_ID.to_string(),
            node_type: NodeType::Database,
            label: "UC Monthly".to_string(),
            location: url("db"),
            parent_id: None,
        });
        (transport, cache)
    }

    #[tokio::test]
    async fn dimensions_default_to_every_database_field() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);

        let request = build_table_request(&mut lookup, MEASURE_ID, None, &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(request.database, DB_ID);
        assert_eq!(request.measures, vec![MEASURE_ID.to_string()]);
        // Both fields, no duplicate for the recoded geography field.
        assert_eq!(
            request.dimensions,
            vec![vec!["fld:month".to_string()], vec!["fld:geo".to_string()]]
        );
        let spec = request.recodes.get("fld:geo").unwrap();
        assert_eq!(
            spec.map,
            vec![vec!["val:1".to_string()], vec!["val:2".to_string()]]
        );
        assert!(spec.total);
    }

    #[tokio::test]
    async fn explicit_field_ids_drop_unknown_ids() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);

        let fields = vec!["fld:month".to_string(), "fld:bogus".to_string()];
        let request = build_table_request(
            &mut lookup,
            MEASURE_ID,
            Some(&fields),
            &RequestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            request.dimensions,
            vec![vec!["fld:month".to_string()], vec!["fld:geo".to_string()]]
        );
    }

    #[tokio::test]
    async fn recode_field_is_not_added_twice() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);

        let fields = vec!["fld:geo".to_string()];
        let request = build_table_request(
            &mut lookup,
            MEASURE_ID,
            Some(&fields),
            &RequestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(request.dimensions, vec![vec!["fld:geo".to_string()]]);
    }

    #[tokio::test]
    async fn every_recode_key_is_also_a_dimension() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);

        let request = build_table_request(&mut lookup, MEASURE_ID, None, &RequestOptions::default())
            .await
            .unwrap();

        for field_id in request.recodes.keys() {
            assert!(request.dimensions.contains(&vec![field_id.clone()]));
        }
    }

    #[tokio::test]
    async fn include_total_flag_reaches_the_recode() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);

        let options = RequestOptions {
            include_total: false,
            ..RequestOptions::default()
        };
        let request = build_table_request(&mut lookup, MEASURE_ID, None, &options)
            .await
            .unwrap();

        assert!(!request.recodes.get("fld:geo").unwrap().total);
    }

    #[tokio::test]
    async fn fetch_measure_table_unpacks_the_response() {
        let (mut transport, mut cache) = fixture();
        transport.set_table(
            serde_json::from_value(serde_json::json!({
                "fields": [
                    {"label": "Month", "items": [
                        {"labels": ["Jan-24"]}, {"labels": ["Feb-24"]}
                    ]},
                    {"label": "National - Regional - LA - OAs", "items": [
                        {"labels": ["Hartlepool"]}, {"labels": ["Middlesbrough"]}
                    ]},
                    {"label": "Measure", "items": [{"labels": ["People"]}]}
                ],
                "measures": [{"uri": MEASURE_ID, "label": "People"}],
                "cubes": {
                    (MEASURE_ID): {"values": [[[10.0], [20.0]], [[30.0], [40.0]]]}
                }
            }))
            .unwrap(),
        );

        let table = fetch_measure_table(
            &transport,
            &mut cache,
            MEASURE_ID,
            None,
            &RequestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(table.rows.len(), 4);
        assert_eq!(
            table.rows[0].labels,
            vec!["Jan-24", "Hartlepool", "People"]
        );
        assert!((table.rows[3].value - 40.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn request_round_trips_through_json() {
        let (transport, mut cache) = fixture();
        let mut lookup = SchemaLookup::new(&transport, &mut cache);
        let request = build_table_request(&mut lookup, MEASURE_ID, None, &RequestOptions::default())
            .await
            .unwrap();

        let json = serde_json::to_string(&request).unwrap();
        let back: TableRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
