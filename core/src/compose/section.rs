//! Decoded fields of one category, consumed key by key

use std::collections::BTreeMap;

use serde_json::Value;

use crate::decode::{DecodedField, RawValue, Translated, decode};
use crate::emulator::{EmulatorFault, MemoryReader};
use crate::schema::{Category, FieldSpec, Label, Registry};
use crate::translate::Translator;

/// A decoded and translated field with its spec
pub(crate) struct Entry<'a> {
    pub spec: &'a FieldSpec,
    pub field: DecodedField,
}

/// Raw value of a state flag
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Flag {
    pub raw: u32,
    pub active: bool,
    pub label: Option<Label>,
}

/// Array field viewed element by element
pub(crate) struct Column {
    raw: Vec<Vec<u32>>,
    labels: Option<Vec<Vec<Label>>>,
}

impl Column {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// First lane of element `i`
    pub fn raw(&self, i: usize) -> Option<u32> {
        self.raw.get(i)?.first().copied()
    }

    /// All lanes of element `i`
    pub fn lanes(&self, i: usize) -> &[u32] {
        self.raw.get(i).map(Vec::as_slice).unwrap_or_default()
    }

    /// Translated first lane of element `i`, if the field has a table
    pub fn label(&self, i: usize) -> Option<Label> {
        self.labels.as_ref()?.get(i)?.first().cloned()
    }

    /// Translated first lane of element `i`, or `Unknown(raw)` without a table
    pub fn label_or_unknown(&self, i: usize) -> Option<Label> {
        self.label(i).or_else(|| self.raw(i).map(Label::Unknown))
    }

    /// Translated lanes of element `i` paired with their raw values
    pub fn labelled_lanes(&self, i: usize) -> Vec<(u32, Label)> {
        let labels = self.labels.as_ref().and_then(|rows| rows.get(i));
        self.lanes(i)
            .iter()
            .enumerate()
            .map(|(lane, &raw)| {
                let label = labels
                    .and_then(|row| row.get(lane).cloned())
                    .unwrap_or(Label::Unknown(raw));
                (raw, label)
            })
            .collect()
    }

    /// Element `i` as emitted for unconsumed per-element fields
    pub fn json(&self, i: usize) -> Value {
        let labels = self.labels.as_ref().and_then(|rows| rows.get(i));
        match (labels, self.raw.get(i)) {
            (Some(row), _) if row.len() == 1 => label_json(&row[0]),
            (Some(row), _) => Value::Array(row.iter().map(label_json).collect()),
            (None, Some(lanes)) if lanes.len() == 1 => Value::from(lanes[0]),
            (None, Some(lanes)) => Value::from(lanes.clone()),
            (None, None) => Value::Null,
        }
    }
}

/// One category's fields, keyed by field key.
///
/// Builders take the keys they understand; whatever is left is emitted
/// flattened under its key by [`Section::into_extra`].
pub(crate) struct Section<'a> {
    translator: Translator<'a>,
    entries: BTreeMap<&'a str, Entry<'a>>,
}

impl<'a> Section<'a> {
    /// Decode and translate every field of `category`.
    ///
    /// Unavailable fields are recorded in `unavailable` and left out.
    pub fn load(
        registry: &'a Registry,
        category: Category,
        memory: &impl MemoryReader,
        unavailable: &mut Vec<String>,
    ) -> Result<Self, EmulatorFault> {
        let translator = Translator::new(registry);
        let mut entries = BTreeMap::new();
        for spec in registry.fields_by_category(category) {
            let field = decode(spec, memory)?;
            if field.raw.is_unavailable() {
                unavailable.push(field.name);
                continue;
            }
            let field = translator.translate_field(field);
            entries.insert(spec.key.as_str(), Entry { spec, field });
        }
        Ok(Self {
            translator,
            entries,
        })
    }

    pub fn translator(&self) -> Translator<'a> {
        self.translator
    }

    pub fn take(&mut self, key: &str) -> Option<Entry<'a>> {
        self.entries.remove(key)
    }

    pub fn scalar(&mut self, key: &str) -> Option<u32> {
        self.take(key)?.field.raw.as_scalar()
    }

    /// Translated label of a scalar field, or `Unknown(raw)` without a table
    pub fn label(&mut self, key: &str) -> Option<Label> {
        let entry = self.take(key)?;
        match entry.field.translated {
            Some(Translated::Label(label)) => Some(label),
            _ => entry.field.raw.as_scalar().map(Label::Unknown),
        }
    }

    /// Labels of the set bits of a bitflags field
    pub fn labels(&mut self, key: &str) -> Option<Vec<Label>> {
        let entry = self.take(key)?;
        match (entry.field.translated, entry.field.raw) {
            (Some(Translated::Labels(labels)), _) => Some(labels),
            (_, RawValue::Flags(bits)) => Some(
                bits.into_iter()
                    .filter(|(_, set)| *set)
                    .map(|(bit, _)| Label::Unknown(u32::from(bit)))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Number of set bits of a bitflags field
    pub fn count_set(&mut self, key: &str) -> Option<u32> {
        match self.take(key)?.field.raw {
            RawValue::Flags(bits) => Some(bits.iter().filter(|(_, set)| *set).count() as u32),
            RawValue::Scalar(value) => Some(value.count_ones()),
            _ => None,
        }
    }

    pub fn column(&mut self, key: &str) -> Option<Column> {
        let entry = self.take(key)?;
        let RawValue::Array(raw) = entry.field.raw else {
            return None;
        };
        let labels = match entry.field.translated {
            Some(Translated::Labels(labels)) => {
                Some(labels.into_iter().map(|label| vec![label]).collect())
            }
            Some(Translated::Rows(rows)) => Some(rows),
            _ => None,
        };
        Some(Column { raw, labels })
    }

    /// Decoded strings of a text field
    pub fn strings(&mut self, key: &str) -> Option<Vec<String>> {
        match self.take(key)?.field.translated {
            Some(Translated::Text(strings)) => Some(strings),
            _ => None,
        }
    }

    /// First string of a text field
    pub fn string(&mut self, key: &str) -> Option<String> {
        self.strings(key)?.into_iter().next()
    }

    /// Raw state of a flag field; active when it differs from its idle value
    pub fn flag(&mut self, key: &str) -> Option<Flag> {
        let entry = self.take(key)?;
        let raw = entry.field.raw.as_scalar()?;
        let label = match entry.field.translated {
            Some(Translated::Label(label)) => Some(label),
            _ => None,
        };
        Some(Flag {
            raw,
            active: raw != entry.spec.idle,
            label,
        })
    }

    /// Keys of the remaining array fields, in order
    pub fn array_keys(&self) -> Vec<&'a str> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry.field.raw, RawValue::Array(_)))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Remaining fields as JSON, keyed by field key
    pub fn into_extra(self) -> BTreeMap<String, Value> {
        self.entries
            .into_iter()
            .map(|(key, entry)| (key.to_string(), field_json(entry.field)))
            .collect()
    }
}

/// JSON form of a label
pub(crate) fn label_json(label: &Label) -> Value {
    match label {
        Label::Name(name) => Value::String(name.clone()),
        Label::Record(record) => record.clone(),
        Label::Unknown(_) => Value::String(label.to_string()),
    }
}

/// JSON form of a field nobody consumed: translated if possible, raw otherwise
fn field_json(field: DecodedField) -> Value {
    let rows = |rows: &[Vec<Label>]| {
        Value::Array(
            rows.iter()
                .map(|row| Value::Array(row.iter().map(label_json).collect()))
                .collect(),
        )
    };

    match (&field.translated, field.raw) {
        (Some(Translated::Label(label)), _) => label_json(label),
        (Some(Translated::Labels(labels)), _) => {
            Value::Array(labels.iter().map(label_json).collect())
        }
        (Some(Translated::Rows(r)), _) => rows(r),
        (Some(Translated::Text(strings)), _) if strings.len() == 1 => {
            Value::String(strings[0].clone())
        }
        (Some(Translated::Text(strings)), _) => Value::from(strings.clone()),
        (None, RawValue::Scalar(value)) => Value::from(value),
        (None, RawValue::Flags(bits)) => Value::from(
            bits.into_iter()
                .filter(|(_, set)| *set)
                .map(|(bit, _)| bit)
                .collect::<Vec<_>>(),
        ),
        (None, RawValue::Array(elements)) if elements.iter().all(|e| e.len() == 1) => {
            Value::from(elements.into_iter().map(|e| e[0]).collect::<Vec<_>>())
        }
        (None, RawValue::Array(elements)) => Value::from(elements),
        (None, RawValue::Grid(grid)) => Value::from(grid),
        (None, RawValue::Text(strings)) => Value::from(strings),
        (None, RawValue::Unavailable) => Value::Null,
    }
}
