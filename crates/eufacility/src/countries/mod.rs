//! Built-in country overrides and the registry they are probed from.
//!
//! A country needing more than the generic pipeline registers a
//! [`CountryOverride`] for its (category, code) pair. Probing a pair with no
//! override yields [`Extension::Default`].

mod at;
mod cz;
mod it;
mod lt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FacilityError, Result};
use crate::facility::{CountryOverride, Extension};
use crate::input::DataTable;
use crate::metadata::OutputIndex;
use crate::reference;
use crate::schema::{FacilityCategory, FieldType};

pub use at::split_at_address;
pub use lt::split_lt_address;

/// Overrides keyed by category and country code.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    overrides: IndexMap<(FacilityCategory, String), CountryOverride>,
}

impl ExtensionRegistry {
    /// Registry without any override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the overrides shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FacilityCategory::Healthcare, at::healthcare());
        registry.register(FacilityCategory::Healthcare, cz::healthcare());
        registry.register(FacilityCategory::Healthcare, it::healthcare());
        registry.register(FacilityCategory::Healthcare, lt::healthcare());
        registry
    }

    /// Register (or replace) an override.
    pub fn register(&mut self, category: FacilityCategory, country: CountryOverride) {
        let code = reference::normalize_country(&country.code);
        self.overrides.insert((category, code), country);
    }

    /// Override of a pair, if any.
    pub fn get(&self, category: FacilityCategory, country: &str) -> Option<&CountryOverride> {
        self.overrides
            .get(&(category, reference::normalize_country(country)))
    }

    /// Behaviour to run a pair with.
    pub fn probe(&self, category: FacilityCategory, country: &str) -> Extension {
        match self.get(category, country) {
            Some(found) => Extension::CountryOverride(found.clone()),
            None => Extension::Default,
        }
    }

    /// Countries with an override in a category.
    pub fn countries(&self, category: FacilityCategory) -> Vec<&str> {
        self.overrides
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, code)| code.as_str())
            .collect()
    }
}

/// Source column named by the `column` prepare argument, or a default.
fn source_column<'a>(table: &DataTable, args: &'a IndexMap<String, Value>, default: &'a str) -> Result<&'a str> {
    let column = args.get("column").and_then(Value::as_str).unwrap_or(default);
    if table.has_column(column) {
        Ok(column)
    } else {
        Err(FacilityError::NotFound(format!("column '{}'", column)))
    }
}

/// Address parts parsed out of one free-text cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub number: String,
    pub postcode: String,
    pub city: String,
}

/// Split an address column into street, number, postcode and city columns
/// and declare them in the output index.
fn split_address_column(
    table: &mut DataTable,
    index: &mut OutputIndex,
    column: &str,
    split: fn(&str) -> AddressParts,
) {
    let parts: Vec<AddressParts> = table
        .column_by_name(column)
        .unwrap_or_default()
        .into_iter()
        .map(split)
        .collect();

    let columns = [
        ("street", parts.iter().map(|p| p.street.clone()).collect::<Vec<_>>()),
        ("number", parts.iter().map(|p| p.number.clone()).collect()),
        ("postcode", parts.iter().map(|p| p.postcode.clone()).collect()),
        ("city", parts.iter().map(|p| p.city.clone()).collect()),
    ];
    for (name, values) in columns {
        table.put_column(name, values, FieldType::String);
        index.insert(name.to_string(), Some(name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe() {
        let registry = ExtensionRegistry::builtin();
        assert!(matches!(
            registry.probe(FacilityCategory::Healthcare, "at"),
            Extension::CountryOverride(_)
        ));
        assert!(matches!(
            registry.probe(FacilityCategory::Healthcare, "FR"),
            Extension::Default
        ));
        assert!(matches!(
            registry.probe(FacilityCategory::Education, "AT"),
            Extension::Default
        ));
        assert_eq!(registry.countries(FacilityCategory::Healthcare).len(), 4);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ExtensionRegistry::builtin();
        registry.register(FacilityCategory::Healthcare, CountryOverride::new("at"));
        let found = registry.get(FacilityCategory::Healthcare, "AT").unwrap();
        assert!(found.prepare.is_none());
    }
}
