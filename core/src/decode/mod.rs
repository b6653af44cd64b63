//! Memory decoder
//!
//! Resolves one [`FieldSpec`] to a typed raw value. Every kind is handled by
//! the single [`decode`] entry point; translation is a separate pass.


use statecast_shared::Endian;

use crate::emulator::{EmulatorFault, MemoryReader};
use crate::schema::{FieldKind, FieldSpec, Label, Width};

/// Untranslated value of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Integer from `scalar`, `bcd` or `pointer-index` fields
    Scalar(u32),
    /// Declared bit positions with their state, in declared order
    Flags(Vec<(u16, bool)>),
    /// One entry per element, each holding `lanes` values
    Array(Vec<Vec<u32>>),
    /// Tile IDs, row-major
    Grid(Vec<Vec<u8>>),
    /// Encoded strings, cut at the terminator
    Text(Vec<Vec<u8>>),
    /// The field lies outside readable memory
    Unavailable,
}

impl RawValue {
    /// Integer value of a scalar field
    pub fn as_scalar(&self) -> Option<u32> {
        match self {
            RawValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    /// Single-lane array elements, flattened
    pub fn as_column(&self) -> Option<Vec<u32>> {
        match self {
            RawValue::Array(elements) => {
                Some(elements.iter().filter_map(|e| e.first().copied()).collect())
            }
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RawValue::Unavailable)
    }
}

/// Translated form of a field, shaped like its raw value
#[derive(Debug, Clone, PartialEq)]
pub enum Translated {
    /// `scalar`, `bcd` and `pointer-index`
    Label(Label),
    /// Active `bitflags` bits, or single-lane `array` elements
    Labels(Vec<Label>),
    /// Multi-lane `array` elements or `tile-grid` rows
    Rows(Vec<Vec<Label>>),
    /// `text` strings
    Text(Vec<String>),
}

/// One decoded field. Produced fresh each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: String,
    pub raw: RawValue,
    pub translated: Option<Translated>,
}

impl DecodedField {
    fn new(field: &FieldSpec, raw: RawValue) -> Self {
        Self {
            name: field.name.clone(),
            raw,
            translated: None,
        }
    }
}

/// Read and interpret `field` from `memory`.
///
/// A field whose range does not fit the reader's address space decodes to
/// [`RawValue::Unavailable`]. Reader failures propagate.
pub fn decode(
    field: &FieldSpec,
    memory: &impl MemoryReader,
) -> Result<DecodedField, EmulatorFault> {
    let extent = field.extent();
    let fits = (field.address as usize)
        .checked_add(extent)
        .is_some_and(|end| end <= memory.memory_size());
    if !fits {
        tracing::warn!(
            field = %field.name,
            address = field.address,
            extent,
            memory_size = memory.memory_size(),
            "field outside readable memory"
        );
        return Ok(DecodedField::new(field, RawValue::Unavailable));
    }

    let mut bytes = vec![0u8; extent];
    memory.read_memory(field.address, &mut bytes)?;

    let raw = match &field.kind {
        FieldKind::Scalar {
            width,
            endian,
            scale,
        } => RawValue::Scalar(read_uint(&bytes, *width, *endian).saturating_mul(*scale)),
        FieldKind::Bcd { .. } => RawValue::Scalar(read_bcd(&bytes)),
        FieldKind::PointerIndex { width, endian } => {
            RawValue::Scalar(read_uint(&bytes, *width, *endian))
        }
        FieldKind::Bitflags { bits, .. } => RawValue::Flags(
            bits.iter()
                .map(|&bit| {
                    let byte = bytes[usize::from(bit / 8)];
                    (bit, byte & (1 << (bit % 8)) != 0)
                })
                .collect(),
        ),
        FieldKind::Array {
            count,
            stride,
            width,
            lanes,
            endian,
        } => RawValue::Array(
            (0..*count as usize)
                .map(|i| {
                    let start = i * *stride as usize;
                    (0..*lanes as usize)
                        .map(|lane| {
                            let offset = start + lane * width.bytes();
                            read_uint(&bytes[offset..], *width, *endian)
                        })
                        .collect()
                })
                .collect(),
        ),
        FieldKind::TileGrid {
            width,
            height,
            row_stride,
        } => RawValue::Grid(
            (0..*height as usize)
                .map(|row| {
                    let start = row * *row_stride as usize;
                    bytes[start..start + *width as usize].to_vec()
                })
                .collect(),
        ),
        FieldKind::Text {
            length,
            count,
            stride,
            terminator,
        } => RawValue::Text(
            (0..*count as usize)
                .map(|i| {
                    let start = i * *stride as usize;
                    let slot = &bytes[start..start + *length as usize];
                    let end = slot
                        .iter()
                        .position(|b| b == terminator)
                        .unwrap_or(slot.len());
                    slot[..end].to_vec()
                })
                .collect(),
        ),
    };

    Ok(DecodedField::new(field, raw))
}

/// Unsigned integer of `width` bytes from the front of `bytes`
fn read_uint(bytes: &[u8], width: Width, endian: Endian) -> u32 {
    let bytes = &bytes[..width.bytes()];
    let fold = |acc: u32, b: &u8| (acc << 8) | u32::from(*b);
    match endian {
        Endian::Big => bytes.iter().fold(0, fold),
        Endian::Little => bytes.iter().rev().fold(0, fold),
    }
}

/// Packed BCD, most significant byte first. Invalid nibbles saturate at 9.
fn read_bcd(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, b| {
        let high = u32::from(b >> 4).min(9);
        let low = u32::from(b & 0x0F).min(9);
        acc * 100 + high * 10 + low
    })
}
