//! Value translator
//!
//! Maps raw values to labels through the registry's value tables. A missing
//! key is data, not an error: it becomes [`Label::Unknown`].

use crate::decode::{DecodedField, RawValue, Translated};
use crate::schema::{Label, Registry};

/// Label of the string terminator in character tables
const TERMINATOR_LABEL: &str = "@";

/// Table-driven translation over a loaded registry
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    registry: &'a Registry,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Entry for `raw` in `table`, if both exist
    pub fn lookup(&self, raw: u32, table: &str) -> Option<&'a Label> {
        self.registry.table(table)?.get(raw)
    }

    /// Label for `raw`, falling back to [`Label::Unknown`]
    pub fn translate(&self, raw: u32, table: &str) -> Label {
        self.lookup(raw, table)
            .cloned()
            .unwrap_or(Label::Unknown(raw))
    }

    /// Decode an in-game string with a character table.
    ///
    /// `@` ends the string, `<…>` control labels render as a space and
    /// bytes without an entry render as `?`.
    pub fn text(&self, bytes: &[u8], table: &str) -> String {
        let mut out = String::with_capacity(bytes.len());
        for &byte in bytes {
            match self.lookup(u32::from(byte), table) {
                Some(Label::Name(glyph)) if glyph == TERMINATOR_LABEL => break,
                Some(Label::Name(glyph)) if glyph.starts_with('<') && glyph.ends_with('>') => {
                    out.push(' ')
                }
                Some(Label::Name(glyph)) => out.push_str(glyph),
                _ => out.push('?'),
            }
        }
        out
    }

    /// Render one row of screen tiles as text.
    ///
    /// Unlike [`Translator::text`], `@` renders as nothing and tiles without
    /// an entry render as a space, since most of the screen is not text.
    /// Trailing blanks are trimmed.
    pub fn screen_row(&self, tiles: &[u8], table: &str) -> String {
        let mut out = String::with_capacity(tiles.len());
        for &tile in tiles {
            match self.lookup(u32::from(tile), table) {
                Some(Label::Name(glyph)) if glyph == TERMINATOR_LABEL => {}
                Some(Label::Name(glyph)) if glyph.starts_with('<') && glyph.ends_with('>') => {
                    out.push(' ')
                }
                Some(Label::Name(glyph)) => out.push_str(glyph),
                _ => out.push(' '),
            }
        }
        out.truncate(out.trim_end().len());
        out
    }

    /// Fill in the translated slot of a decoded field.
    ///
    /// Fields without a value table, and unavailable fields, pass through
    /// unchanged.
    pub fn translate_field(&self, mut decoded: DecodedField) -> DecodedField {
        let Some(table) = self
            .registry
            .field(&decoded.name)
            .and_then(|field| field.value_table.as_deref())
        else {
            return decoded;
        };

        decoded.translated = match &decoded.raw {
            RawValue::Scalar(raw) => Some(Translated::Label(self.translate(*raw, table))),
            RawValue::Flags(bits) => Some(Translated::Labels(
                bits.iter()
                    .filter(|(_, set)| *set)
                    .map(|(bit, _)| self.translate(u32::from(*bit), table))
                    .collect(),
            )),
            RawValue::Array(elements) if elements.iter().all(|e| e.len() == 1) => {
                Some(Translated::Labels(
                    elements
                        .iter()
                        .map(|e| self.translate(e[0], table))
                        .collect(),
                ))
            }
            RawValue::Array(elements) => Some(Translated::Rows(
                elements
                    .iter()
                    .map(|lanes| lanes.iter().map(|&raw| self.translate(raw, table)).collect())
                    .collect(),
            )),
            RawValue::Grid(rows) => Some(Translated::Rows(
                rows.iter()
                    .map(|row| {
                        row.iter()
                            .map(|&tile| self.translate(u32::from(tile), table))
                            .collect()
                    })
                    .collect(),
            )),
            RawValue::Text(strings) => Some(Translated::Text(
                strings.iter().map(|s| self.text(s, table)).collect(),
            )),
            RawValue::Unavailable => None,
        };
        decoded
    }
}
