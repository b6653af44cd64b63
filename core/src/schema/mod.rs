//! Schema registry
//!
//! Parses the address and value documents into validated lookup structures.
//! Everything is checked once at load; the registry is read-only afterwards
//! and shared behind an `Arc`.

mod error;
mod field;
mod table;

pub use error::SchemaError;
pub use field::{
    Category, FieldKind, FieldSpec, MAX_BCD_WIDTH, MAX_BITFLAGS_WIDTH, TEXT_TERMINATOR, Width,
};
pub use table::{Label, ValueTable};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use statecast_shared::{AddressDocument, ValueDocument};

/// The two parsed schema documents
#[derive(Debug, Clone, Default)]
pub struct RegistryDocuments {
    pub addresses: AddressDocument,
    pub values: ValueDocument,
}

impl RegistryDocuments {
    pub fn new(addresses: AddressDocument, values: ValueDocument) -> Self {
        Self { addresses, values }
    }

    /// Read both documents from JSON files.
    pub fn from_files(addresses: &Path, values: &Path) -> Result<Self, SchemaError> {
        Ok(Self {
            addresses: read_json(addresses)?,
            values: read_json(values)?,
        })
    }

    /// Parse both documents from JSON text.
    pub fn from_json_str(addresses: &str, values: &str) -> Result<Self, SchemaError> {
        fn parse<T: DeserializeOwned>(label: &str, text: &str) -> Result<T, SchemaError> {
            serde_json::from_str(text).map_err(|source| SchemaError::Json {
                path: PathBuf::from(label),
                source,
            })
        }

        Ok(Self {
            addresses: parse("<addresses>", addresses)?,
            values: parse("<values>", values)?,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SchemaError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Validated fields grouped by category, plus the value tables
#[derive(Debug, Clone)]
pub struct Registry {
    /// Fields per category, ordered by name
    fields: BTreeMap<Category, Vec<FieldSpec>>,
    /// Field name → (category, position)
    index: HashMap<String, (Category, usize)>,
    tables: HashMap<String, ValueTable>,
    memory_size: usize,
}

impl Registry {
    /// Validate `docs` against an address space of `memory_size` bytes.
    pub fn load(docs: &RegistryDocuments, memory_size: usize) -> Result<Self, SchemaError> {
        let mut tables = HashMap::new();
        for (name, doc) in &docs.values.tables {
            tables.insert(name.clone(), ValueTable::from_document(name, doc)?);
        }

        let mut fields: BTreeMap<Category, Vec<FieldSpec>> = BTreeMap::new();
        // Document order is name order, so each category list ends up sorted
        for (name, doc) in &docs.addresses.fields {
            let spec = FieldSpec::from_document(name, doc)?;

            let extent = spec.extent();
            let fits = (spec.address as usize)
                .checked_add(extent)
                .is_some_and(|end| end <= memory_size);
            if !fits {
                return Err(SchemaError::OutOfRange {
                    field: spec.name,
                    address: spec.address,
                    extent,
                    memory_size,
                });
            }

            if let Some(table) = &spec.value_table
                && !tables.contains_key(table)
            {
                return Err(SchemaError::UnknownTable {
                    field: spec.name,
                    table: table.clone(),
                });
            }

            fields.entry(spec.category).or_default().push(spec);
        }

        let mut index = HashMap::new();
        for (category, specs) in &fields {
            for (position, spec) in specs.iter().enumerate() {
                index.insert(spec.name.clone(), (*category, position));
            }
        }

        tracing::info!(
            fields = index.len(),
            tables = tables.len(),
            memory_size,
            "schema registry loaded"
        );

        Ok(Self {
            fields,
            index,
            tables,
            memory_size,
        })
    }

    /// Fields of `category`, ordered by name
    pub fn fields_by_category(&self, category: Category) -> &[FieldSpec] {
        self.fields
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Categories with at least one field, in composition order
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.fields.keys().copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        let (category, position) = self.index.get(name)?;
        self.fields.get(category)?.get(*position)
    }

    pub fn table(&self, name: &str) -> Option<&ValueTable> {
        self.tables.get(name)
    }

    /// Address-space size the registry was validated against
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
