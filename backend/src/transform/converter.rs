//! Turn flat CSV rows into HIP-412 metadata objects.
//!
//! ```text
//! name,image,type,color,power,url          {
//! NFT 1,ipfs://1.png,image/png,red,9,  →     "name": "NFT 1", "image": ..., "type": "image/png",
//!                                            "attributes": [{"trait_type":"color","value":"red"},
//!                                                           {"trait_type":"power","value":"9"}]
//!                                          }
//! ```
//!
//! Which columns are attributes and which are properties is configuration
//! ([`HeaderLayout`]), not something discovered from the file.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::HeaderLayout;
use crate::models::{Attribute, MetadataObject, HIP412_FORMAT};
use crate::parser::CsvRow;
use crate::validation::{MissingAttributeError, MissingCause};

/// A row that could not be shaped into a metadata object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// 1-based source line.
    pub line: u64,
    pub message: String,
}

/// Output of [`convert`].
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    /// Converted objects, in row order.
    pub objects: Vec<MetadataObject>,
    /// Source line of each object in `objects`.
    pub source_lines: Vec<u64>,
    /// Declared attribute columns missing entirely from a row, keyed by
    /// object index.
    pub absent_attributes: Vec<MissingAttributeError>,
    /// Rows that failed to convert; the other rows are unaffected.
    pub failures: Vec<RowFailure>,
}

/// Convert every row. A failing row is recorded and skipped.
pub fn convert(rows: &[CsvRow], layout: &HeaderLayout) -> Conversion {
    let mut conversion = Conversion::default();

    for row in rows {
        match convert_row(row, layout) {
            Ok(object) => {
                let index = conversion.objects.len();
                conversion.absent_attributes.extend(
                    layout
                        .attributes
                        .iter()
                        .filter(|header| !row.contains(header))
                        .map(|header| MissingAttributeError {
                            index,
                            trait_type: header.clone(),
                            cause: MissingCause::ColumnAbsent,
                        }),
                );
                conversion.objects.push(object);
                conversion.source_lines.push(row.line);
            }
            Err(message) => conversion.failures.push(RowFailure {
                line: row.line,
                message,
            }),
        }
    }

    conversion
}

/// Convert one row.
pub fn convert_row(row: &CsvRow, layout: &HeaderLayout) -> Result<MetadataObject, String> {
    let text = |header: &str| row.value(header).map(|v| Value::String(v.to_string()));

    let attributes: Vec<Value> = layout
        .attributes
        .iter()
        .filter_map(|header| row.value(header).map(|value| Attribute::text(header, value)))
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())?;

    let mut properties = Map::new();
    for header in &layout.properties {
        if let Some(value) = row.value(header) {
            properties.insert(header.clone(), property_value(header, value)?);
        }
    }

    Ok(MetadataObject {
        name: text("name"),
        creator: text("creator"),
        description: text("description"),
        image: text("image"),
        mime_type: text("type"),
        format: Some(Value::String(HIP412_FORMAT.to_string())),
        properties: (!properties.is_empty()).then_some(Value::Object(properties)),
        attributes: (!attributes.is_empty()).then_some(Value::Array(attributes)),
        extra: Map::new(),
    })
}

/// A property cell is a plain string unless it holds a JSON object.
fn property_value(header: &str, raw: &str) -> Result<Value, String> {
    if !raw.starts_with('{') {
        return Ok(Value::String(raw.to_string()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) | Err(_) => Err(format!(
            "Property '{}' is not a valid JSON object: {}",
            header, raw
        )),
    }
}
