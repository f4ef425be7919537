//! Decoding of table artifact payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    /// Column name.
    pub name: String,
    /// Column type as reported by the producer (e.g. `integer`, `string`).
    #[serde(rename = "type", default)]
    pub field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
struct TablePayload {
    schema: TableSchema,
    #[serde(default)]
    data: Value,
}

/// A decoded table: schema plus rows keyed by column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    /// Columns in schema order.
    pub fields: Vec<TableField>,
    /// Row objects.
    pub rows: Vec<Map<String, Value>>,
}

impl TableData {
    /// Parses `{"schema": {"fields": [...]}, "data": ...}`.
    ///
    /// `data` may be a row array or a string holding the JSON encoding of
    /// that array.
    pub fn parse(content: &str) -> Result<Self> {
        let payload: TablePayload = serde_json::from_str(content)?;

        let rows = match payload.data {
            Value::Null => Vec::new(),
            Value::String(encoded) => serde_json::from_str(&encoded)?,
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(map) => Ok(map),
                    other => Err(Error::serialization()
                        .with_message(format!("table row is not an object: {other}"))),
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(Error::serialization()
                    .with_message(format!("unexpected table data: {other}")));
            }
        };

        Ok(Self {
            fields: payload.schema.fields,
            rows,
        })
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the column names in schema order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
