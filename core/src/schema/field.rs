//! Validated field descriptions

use std::fmt;
use std::str::FromStr;

use statecast_shared::{Endian, FieldDocument, KindName};

use super::SchemaError;

/// Default terminator of in-game strings
pub const TEXT_TERMINATOR: u8 = 0x50;

/// Largest `bitflags` width in bytes
pub const MAX_BITFLAGS_WIDTH: u32 = 32;

/// Largest `bcd` width in bytes (eight digits fit a `u32`)
pub const MAX_BCD_WIDTH: u32 = 4;

/// Snapshot section a field feeds, taken from the name prefix.
///
/// Declaration order is composition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Flags,
    Map,
    Player,
    Team,
    Battle,
    Viewport,
    Text,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Flags,
        Category::Map,
        Category::Player,
        Category::Team,
        Category::Battle,
        Category::Viewport,
        Category::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Flags => "flags",
            Category::Map => "map",
            Category::Player => "player",
            Category::Team => "team",
            Category::Battle => "battle",
            Category::Viewport => "viewport",
            Category::Text => "text",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or(())
    }
}

/// Integer width in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    One,
    Two,
    Four,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::One => 1,
            Width::Two => 2,
            Width::Four => 4,
        }
    }

    fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            1 => Some(Width::One),
            2 => Some(Width::Two),
            4 => Some(Width::Four),
            _ => None,
        }
    }
}

/// How a field's bytes are interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar {
        width: Width,
        endian: Endian,
        scale: u32,
    },
    Bcd {
        width: u32,
    },
    Bitflags {
        width: u32,
        bits: Vec<u16>,
    },
    Array {
        count: u32,
        stride: u32,
        width: Width,
        lanes: u32,
        endian: Endian,
    },
    PointerIndex {
        width: Width,
        endian: Endian,
    },
    TileGrid {
        width: u32,
        height: u32,
        row_stride: u32,
    },
    Text {
        length: u32,
        count: u32,
        stride: u32,
        terminator: u8,
    },
}

impl FieldKind {
    /// Bytes spanned from the start address to the last byte read
    pub fn extent(&self) -> usize {
        fn span(count: u32, stride: u32, last: usize) -> usize {
            match count {
                0 => 0,
                n => (n as usize - 1) * stride as usize + last,
            }
        }

        match self {
            FieldKind::Scalar { width, .. } | FieldKind::PointerIndex { width, .. } => {
                width.bytes()
            }
            FieldKind::Bcd { width } | FieldKind::Bitflags { width, .. } => *width as usize,
            FieldKind::Array {
                count,
                stride,
                width,
                lanes,
                ..
            } => span(*count, *stride, width.bytes() * *lanes as usize),
            FieldKind::TileGrid {
                width,
                height,
                row_stride,
            } => span(*height, *row_stride, *width as usize),
            FieldKind::Text {
                length,
                count,
                stride,
                ..
            } => span(*count, *stride, *length as usize),
        }
    }

    pub fn name(&self) -> KindName {
        match self {
            FieldKind::Scalar { .. } => KindName::Scalar,
            FieldKind::Bcd { .. } => KindName::Bcd,
            FieldKind::Bitflags { .. } => KindName::Bitflags,
            FieldKind::Array { .. } => KindName::Array,
            FieldKind::PointerIndex { .. } => KindName::PointerIndex,
            FieldKind::TileGrid { .. } => KindName::TileGrid,
            FieldKind::Text { .. } => KindName::Text,
        }
    }
}

/// One declared memory field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Full dotted name, e.g. `player.x`
    pub name: String,
    pub category: Category,
    /// Name without the category prefix; the JSON key it feeds
    pub key: String,
    pub address: u32,
    pub kind: FieldKind,
    pub value_table: Option<String>,
    /// Raw value that means "inactive" when the field is a state flag
    pub idle: u32,
}

impl FieldSpec {
    /// Validate one address-document entry.
    ///
    /// Bounds and table references are checked by the registry, which knows
    /// the memory size and the loaded tables.
    pub fn from_document(name: &str, doc: &FieldDocument) -> Result<Self, SchemaError> {
        let (prefix, key) = name
            .split_once('.')
            .filter(|(prefix, key)| !prefix.is_empty() && !key.is_empty())
            .ok_or_else(|| SchemaError::MissingCategory(name.to_string()))?;
        let category = prefix
            .parse::<Category>()
            .map_err(|_| SchemaError::UnknownCategory {
                field: name.to_string(),
                category: prefix.to_string(),
            })?;

        let check = AttributeCheck { name, doc };
        let kind = match doc.kind {
            KindName::Scalar => FieldKind::Scalar {
                width: check.width(1)?,
                endian: doc.endian.unwrap_or_default(),
                scale: check.positive("scale", doc.scale.unwrap_or(1))?,
            },
            KindName::Bcd => FieldKind::Bcd {
                width: check.bounded("width", doc.width.unwrap_or(1), MAX_BCD_WIDTH)?,
            },
            KindName::Bitflags => {
                let width = check.bounded("width", doc.width.unwrap_or(1), MAX_BITFLAGS_WIDTH)?;
                let bits = match &doc.bits {
                    Some(bits) => {
                        for &bit in bits {
                            if u32::from(bit) >= width * 8 {
                                return Err(check.invalid(
                                    "bit",
                                    u64::from(bit),
                                    "beyond the field width",
                                ));
                            }
                        }
                        bits.clone()
                    }
                    None => (0..(width * 8) as u16).collect(),
                };
                FieldKind::Bitflags { width, bits }
            }
            KindName::Array => {
                let width = check.width(1)?;
                let lanes = check.positive("lanes", doc.lanes.unwrap_or(1))?;
                let count = check.positive("count", check.required("count", doc.count)?)?;
                let stride = doc.stride.unwrap_or(width.bytes() as u32 * lanes);
                FieldKind::Array {
                    count,
                    stride: check.positive("stride", stride)?,
                    width,
                    lanes,
                    endian: doc.endian.unwrap_or_default(),
                }
            }
            KindName::PointerIndex => {
                check.required("valueTable", doc.value_table.as_ref())?;
                FieldKind::PointerIndex {
                    width: check.width(1)?,
                    endian: doc.endian.unwrap_or_default(),
                }
            }
            KindName::TileGrid => {
                let width = check.positive("width", check.required("width", doc.width)?)?;
                let height = check.positive("height", check.required("height", doc.height)?)?;
                let row_stride = doc.row_stride.unwrap_or(width);
                if row_stride < width {
                    return Err(check.invalid(
                        "rowStride",
                        u64::from(row_stride),
                        "rows would overlap",
                    ));
                }
                FieldKind::TileGrid {
                    width,
                    height,
                    row_stride,
                }
            }
            KindName::Text => {
                check.required("valueTable", doc.value_table.as_ref())?;
                let length = check.positive("length", check.required("length", doc.length)?)?;
                let count = check.positive("count", doc.count.unwrap_or(1))?;
                FieldKind::Text {
                    length,
                    count,
                    stride: check.positive("stride", doc.stride.unwrap_or(length))?,
                    terminator: doc.terminator.unwrap_or(TEXT_TERMINATOR),
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            category,
            key: key.to_string(),
            address: doc.address.0,
            kind,
            value_table: doc.value_table.clone(),
            idle: doc.idle.unwrap_or(0),
        })
    }

    /// Bytes spanned by the field
    pub fn extent(&self) -> usize {
        self.kind.extent()
    }
}

/// Attribute validation helpers bound to one entry
struct AttributeCheck<'a> {
    name: &'a str,
    doc: &'a FieldDocument,
}

impl AttributeCheck<'_> {
    fn required<T>(&self, attribute: &'static str, value: Option<T>) -> Result<T, SchemaError> {
        value.ok_or_else(|| SchemaError::MissingAttribute {
            field: self.name.to_string(),
            kind: self.doc.kind,
            attribute,
        })
    }

    fn invalid(&self, attribute: &'static str, value: u64, reason: &'static str) -> SchemaError {
        SchemaError::InvalidAttribute {
            field: self.name.to_string(),
            attribute,
            value,
            reason,
        }
    }

    fn width(&self, default: u32) -> Result<Width, SchemaError> {
        let bytes = self.doc.width.unwrap_or(default);
        Width::from_bytes(bytes)
            .ok_or_else(|| self.invalid("width", u64::from(bytes), "must be 1, 2 or 4"))
    }

    fn positive(&self, attribute: &'static str, value: u32) -> Result<u32, SchemaError> {
        if value == 0 {
            return Err(self.invalid(attribute, 0, "must be at least 1"));
        }
        Ok(value)
    }

    fn bounded(&self, attribute: &'static str, value: u32, max: u32) -> Result<u32, SchemaError> {
        if value == 0 || value > max {
            return Err(self.invalid(attribute, u64::from(value), "out of the supported range"));
        }
        Ok(value)
    }
}
