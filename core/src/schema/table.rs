//! Value tables and labels

use std::fmt;

use hashbrown::HashMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use statecast_shared::TableDocument;
use statecast_shared::schema::parse_number;

use super::SchemaError;

/// Semantic label for a raw value
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// Plain name, e.g. a species or move
    Name(String),
    /// Structured descriptor, e.g. a tileset record
    Record(Value),
    /// Raw value with no table entry
    Unknown(u32),
}

impl Label {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::String(name) => Label::Name(name.clone()),
            other => Label::Record(other.clone()),
        }
    }

    /// The plain name, if this is one
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Name(name) => f.write_str(name),
            Label::Record(record) => match record.get("name").and_then(Value::as_str) {
                Some(name) => f.write_str(name),
                None => write!(f, "{}", record),
            },
            Label::Unknown(raw) => write!(f, "Unknown(0x{:02X})", raw),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Label::Name(name) => serializer.serialize_str(name),
            Label::Record(record) => record.serialize(serializer),
            Label::Unknown(_) => serializer.collect_str(self),
        }
    }
}

/// Named raw-key → label mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    name: String,
    entries: HashMap<u32, Label>,
}

impl ValueTable {
    /// Build a table from its document form.
    pub fn from_document(name: &str, doc: &TableDocument) -> Result<Self, SchemaError> {
        let mut entries = HashMap::new();
        match doc {
            TableDocument::Keyed(keyed) => {
                for (key, value) in keyed {
                    let raw = parse_number(key).ok_or_else(|| SchemaError::InvalidKey {
                        table: name.to_string(),
                        key: key.clone(),
                    })?;
                    if entries.insert(raw, Label::from_json(value)).is_some() {
                        return Err(SchemaError::DuplicateKey {
                            table: name.to_string(),
                            key: raw,
                        });
                    }
                }
            }
            TableDocument::Indexed(values) => {
                for (index, value) in values.iter().enumerate() {
                    if !value.is_null() {
                        entries.insert(index as u32, Label::from_json(value));
                    }
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, raw: u32) -> Option<&Label> {
        self.entries.get(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
