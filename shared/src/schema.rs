//! Schema document shapes
//!
//! Two JSON documents drive decoding:
//!
//! - the **address document** maps a dotted field name to where and how the
//!   field lives in memory:
//!
//! ```json
//! {
//!   "player.x":      { "address": "0xD362", "kind": "scalar", "width": 1 },
//!   "player.badges": { "address": "0xD356", "kind": "bitflags", "valueTable": "badges" },
//!   "team.species":  { "address": "0xD16B", "kind": "array", "count": 6, "stride": 44,
//!                      "valueTable": "species" }
//! }
//! ```
//!
//! - the **value document** maps a table name to its raw-key → label entries,
//!   either as an object keyed by decimal or `0x` hex strings, or as an array
//!   indexed from zero:
//!
//! ```json
//! {
//!   "badges": { "0": "Boulder Badge", "1": "Cascade Badge" },
//!   "facing": { "0x04": "Down", "0x08": "Up" }
//! }
//! ```
//!
//! These types only describe the shape; validation happens when the
//! registry is built.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Address-definition document: field name → field description.
///
/// Deserialization rejects documents that declare a name twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AddressDocument {
    pub fields: BTreeMap<String, FieldDocument>,
}

impl<'de> Deserialize<'de> for AddressDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = AddressDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field name to field description")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields = BTreeMap::new();
                while let Some((name, field)) = map.next_entry::<String, FieldDocument>()? {
                    if fields.contains_key(&name) {
                        return Err(de::Error::custom(format_args!(
                            "duplicate field name '{}'",
                            name
                        )));
                    }
                    fields.insert(name, field);
                }
                Ok(AddressDocument { fields })
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Value-translation document: table name → table entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueDocument {
    pub tables: BTreeMap<String, TableDocument>,
}

/// Entries of one value table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableDocument {
    /// `{ "<key>": label }`
    Keyed(BTreeMap<String, serde_json::Value>),
    /// `[label, ...]`, keyed by position
    Indexed(Vec<serde_json::Value>),
}

/// Encoding kind as spelled in the address document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KindName {
    Scalar,
    Bcd,
    Bitflags,
    Array,
    PointerIndex,
    TileGrid,
    Text,
}

impl fmt::Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KindName::Scalar => "scalar",
            KindName::Bcd => "bcd",
            KindName::Bitflags => "bitflags",
            KindName::Array => "array",
            KindName::PointerIndex => "pointer-index",
            KindName::TileGrid => "tile-grid",
            KindName::Text => "text",
        })
    }
}

/// Byte order of multi-byte integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// One entry of the address document.
///
/// Which attributes are required depends on `kind`; see the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldDocument {
    pub address: Address,
    pub kind: KindName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_stride: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminator: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endian: Option<Endian>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle: Option<u32>,
}

impl FieldDocument {
    /// Minimal description with only address and kind set
    pub fn new(address: u32, kind: KindName) -> Self {
        Self {
            address: Address(address),
            kind,
            width: None,
            height: None,
            count: None,
            stride: None,
            lanes: None,
            row_stride: None,
            length: None,
            terminator: None,
            scale: None,
            endian: None,
            bits: None,
            value_table: None,
            idle: None,
        }
    }
}

/// Memory address, written in documents as a number or a `"0x…"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr", into = "AddressRepr")]
pub struct Address(pub u32);

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<AddressRepr> for Address {
    type Error = String;

    fn try_from(repr: AddressRepr) -> Result<Self, Self::Error> {
        match repr {
            AddressRepr::Number(n) => Ok(Address(n)),
            AddressRepr::Text(s) => parse_number(&s)
                .map(Address)
                .ok_or_else(|| format!("invalid address '{}'", s)),
        }
    }
}

impl From<Address> for AddressRepr {
    fn from(address: Address) -> Self {
        AddressRepr::Text(format!("0x{:04X}", address.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
pub fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
