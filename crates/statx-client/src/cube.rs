//! Unpacking response cubes into flat rows.
//!
//! The table endpoint answers with an N-dimensional cube of values nested
//! one array level per field. This module flattens the three-field cube
//! this client requests into one row per cell, pairing each value with
//! the labels of its coordinate.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::table::TableResponse;

const SUPPORTED_FIELD_COUNT: usize = 3;
const DECODE_CONTEXT: &str = "table response";

/// A flattened cube: one row per cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    /// Labels of the three fields, in response order.
    pub dimensions: Vec<String>,
    /// One row per cube cell, in row-major order.
    pub rows: Vec<TableRow>,
}

/// One cube cell: the item labels of its coordinate plus its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Item labels along each field, in field order.
    pub labels: Vec<String>,
    /// The cell value.
    pub value: f64,
}

/// Flatten a table response into rows.
///
/// Rows come out in row-major order: the last field varies fastest. Each
/// axis position is labelled with the first label of its item. The cube
/// read is the one keyed by the first declared measure.
///
/// # Errors
///
/// Returns [`Error::UnsupportedShape`] unless the response declares
/// exactly three fields, and [`Error::Decode`] if an item has no labels,
/// no measure is declared, the first measure has no cube, or the cube
/// does not hold a number at some coordinate.
pub fn unpack(response: &TableResponse) -> Result<DataTable> {
    if response.fields.len() != SUPPORTED_FIELD_COUNT {
        return Err(Error::UnsupportedShape {
            field_count: response.fields.len(),
        });
    }

    let mut axes: Vec<Vec<String>> = Vec::with_capacity(response.fields.len());
    for field in &response.fields {
        let mut labels = Vec::with_capacity(field.items.len());
        for (position, item) in field.items.iter().enumerate() {
            let label = item.labels.first().ok_or_else(|| {
                Error::decode(
                    DECODE_CONTEXT,
                    format!("item {position} of field '{}' has no labels", field.label),
                )
            })?;
            labels.push(label.clone());
        }
        axes.push(labels);
    }

    let measure = response
        .measures
        .first()
        .ok_or_else(|| Error::decode(DECODE_CONTEXT, "no measures declared"))?;
    let cube = response.cubes.get(&measure.uri).ok_or_else(|| {
        Error::decode(
            DECODE_CONTEXT,
            format!("no cube for measure uri '{}'", measure.uri),
        )
    })?;

    let lengths: Vec<usize> = axes.iter().map(Vec::len).collect();
    let mut rows = Vec::new();
    for coordinate in coordinates(&lengths) {
        let labels = coordinate
            .iter()
            .zip(&axes)
            .map(|(&position, axis)| axis[position].clone())
            .collect();
        let value = value_at(&cube.values, &coordinate)?;
        rows.push(TableRow { labels, value });
    }

    Ok(DataTable {
        dimensions: response.fields.iter().map(|field| field.label.clone()).collect(),
        rows,
    })
}

/// All coordinates of a cube with the given axis lengths, in row-major
/// order: the rightmost axis varies fastest.
///
/// An empty `lengths` yields the single empty coordinate (a cube with no
/// axes has one cell); any zero length yields nothing.
#[must_use]
pub fn coordinates(lengths: &[usize]) -> impl Iterator<Item = Vec<usize>> + '_ {
    let total: usize = lengths.iter().product();
    let mut current: Option<Vec<usize>> = if total == 0 {
        None
    } else {
        Some(vec![0; lengths.len()])
    };

    std::iter::from_fn(move || {
        let coordinate = current.clone()?;
        // Advance like an odometer, rightmost digit first.
        let mut next = coordinate.clone();
        let mut position = lengths.len();
        loop {
            if position == 0 {
                current = None;
                break;
            }
            position -= 1;
            next[position] += 1;
            if next[position] < lengths[position] {
                current = Some(next);
                break;
            }
            next[position] = 0;
        }
        Some(coordinate)
    })
}

fn value_at(values: &Value, coordinate: &[usize]) -> Result<f64> {
    let mut current = values;
    for (axis, &position) in coordinate.iter().enumerate() {
        current = current
            .as_array()
            .and_then(|level| level.get(position))
            .ok_or_else(|| {
                Error::decode(
                    DECODE_CONTEXT,
                    format!("cube has no entry at position {position} on axis {axis}"),
                )
            })?;
    }
    current.as_f64().ok_or_else(|| {
        Error::decode(
            DECODE_CONTEXT,
            format!("cube value at {coordinate:?} is not a number"),
        )
    })
}
