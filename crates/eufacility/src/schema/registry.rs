//! Ordered registry of canonical fields per facility category.

use indexmap::IndexMap;

use crate::error::{FacilityError, Result};
use crate::reference::COUNTRIES;

use super::field::SchemaField;
use super::types::FieldType;

/// Keys whose columns are produced by the location resolver.
pub const LOCATION_KEYS: [&str; 3] = ["lat", "lon", "geo_qual"];

/// Geo-quality code for coordinates read directly from the source.
pub const GEO_QUALITY_GOOD: i32 = 1;

/// Geo-quality code when the quality of the coordinates is not known.
pub const GEO_QUALITY_UNKNOWN: i32 = -1;

/// Read-only ordered table of canonical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRegistry {
    fields: IndexMap<String, SchemaField>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting duplicate keys or output names.
    pub fn new(fields: impl IntoIterator<Item = SchemaField>) -> Result<Self> {
        let mut map: IndexMap<String, SchemaField> = IndexMap::new();
        for field in fields {
            if map.contains_key(&field.key) {
                return Err(FacilityError::Config(format!(
                    "duplicate schema key '{}'",
                    field.key
                )));
            }
            if map.values().any(|f| f.output_name == field.output_name) {
                return Err(FacilityError::Config(format!(
                    "duplicate output column '{}'",
                    field.output_name
                )));
            }
            map.insert(field.key.clone(), field);
        }
        Ok(Self { fields: map })
    }

    /// Healthcare services schema.
    pub fn healthcare() -> Self {
        let mut fields = Self::common_head();
        fields.extend([
            SchemaField::new("beds", FieldType::Integer)
                .with_output_name("cap_beds")
                .with_description("Measure of capacity by number of beds"),
            SchemaField::new("prac", FieldType::Integer)
                .with_output_name("cap_prac")
                .with_description("Measure of capacity by number of practitioners"),
            SchemaField::new("rooms", FieldType::Integer)
                .with_output_name("cap_rooms")
                .with_description("Measure of capacity by number of rooms"),
            SchemaField::new("ER", FieldType::String)
                .with_output_name("emergency")
                .with_description("Whether the site provides emergency medical services")
                .with_values(["yes", "no"]),
            SchemaField::new("type", FieldType::String)
                .with_output_name("facility_type")
                .with_description("Specific type of care provided, e.g. psychiatric hospital"),
            SchemaField::new("PP", FieldType::String)
                .with_output_name("public_private")
                .with_description("Public or private status of the service")
                .with_values(["public", "private"]),
            SchemaField::new("specs", FieldType::String)
                .with_output_name("list_specs")
                .with_description("Medical specialties recognised under Directive 2005/36/EC"),
        ]);
        fields.extend(Self::common_tail());
        Self::assemble(fields)
    }

    /// Education services schema.
    pub fn education() -> Self {
        let mut fields = Self::common_head();
        if let Some(name) = fields.iter_mut().find(|f| f.key == "name") {
            name.output_name = "name".to_string();
            name.description = "Name of the education institution".to_string();
        }
        fields.extend([
            SchemaField::new("students", FieldType::Integer)
                .with_output_name("cap_students")
                .with_description("Measure of capacity by maximum number of students"),
            SchemaField::new("enrolled", FieldType::Integer)
                .with_output_name("cap_students_enrolled")
                .with_description("Measure of capacity by number of enrolled students"),
            SchemaField::new("level", FieldType::Integer)
                .with_description("Education level (ISCED 2011)"),
            SchemaField::new("PP", FieldType::String)
                .with_output_name("public_private")
                .with_description("Public or private status of the service")
                .with_values(["public", "private"]),
            SchemaField::new("fields", FieldType::String)
                .with_description("Field of education and training (ISCED-F 2013)"),
        ]);
        fields.extend(Self::common_tail());
        Self::assemble(fields)
    }

    fn common_head() -> Vec<SchemaField> {
        vec![
            SchemaField::new("id", FieldType::Integer)
                .with_description("Service identifier based on national identification codes"),
            SchemaField::new("name", FieldType::String)
                .with_output_name("hospital_name")
                .with_description("Name of the healthcare institution"),
            SchemaField::new("site", FieldType::String)
                .with_output_name("site_name")
                .with_description("Name of the specific site or branch"),
            SchemaField::new("lat", FieldType::Float).with_description("Latitude (WGS 84)"),
            SchemaField::new("lon", FieldType::Float).with_description("Longitude (WGS 84)"),
            SchemaField::new("geo_qual", FieldType::Integer)
                .with_description("Geolocation quality - 1: good, 2: medium, 3: low, -1: unknown")
                .with_values(["-1", "1", "2", "3"]),
            SchemaField::new("street", FieldType::String).with_description("Street name"),
            SchemaField::new("number", FieldType::String)
                .with_output_name("house_number")
                .with_description("House number"),
            SchemaField::new("postcode", FieldType::String).with_description("Postcode"),
            SchemaField::new("city", FieldType::String)
                .with_description("City name (sometimes a region or municipality)"),
            SchemaField::new("cc", FieldType::String)
                .with_description("Country code (ISO 3166-1 alpha-2)")
                .with_values(COUNTRIES.keys().copied()),
            SchemaField::new("country", FieldType::String).with_description("Country name"),
        ]
    }

    fn common_tail() -> Vec<SchemaField> {
        vec![
            SchemaField::new("tel", FieldType::Integer).with_description("Telephone number"),
            SchemaField::new("email", FieldType::String).with_description("Email address"),
            SchemaField::new("url", FieldType::String)
                .with_description("Link to the institution's website"),
            SchemaField::new("refdate", FieldType::DateTime)
                .with_output_name("ref_date")
                .with_description("Reference date the data refers to"),
            SchemaField::new("pubdate", FieldType::DateTime)
                .with_output_name("pub_date")
                .with_description("Publication date of the harmonised dataset"),
            SchemaField::new("comments", FieldType::String).with_description("Comments"),
        ]
    }

    // Built-in tables are known to be unique; a collision is a programming error
    // caught by the registry tests.
    fn assemble(fields: Vec<SchemaField>) -> Self {
        Self {
            fields: fields.into_iter().map(|f| (f.key.clone(), f)).collect(),
        }
    }

    /// Look up a field by canonical key.
    pub fn lookup(&self, key: &str) -> Result<&SchemaField> {
        self.fields
            .get(key)
            .ok_or_else(|| FacilityError::NotFound(format!("schema key '{}'", key)))
    }

    /// Look up a field by canonical key, without error.
    pub fn get(&self, key: &str) -> Option<&SchemaField> {
        self.fields.get(key)
    }

    /// Find the field that writes a given output column.
    pub fn by_output_name(&self, name: &str) -> Option<&SchemaField> {
        self.fields.values().find(|f| f.output_name == name)
    }

    /// Canonical keys in registry order.
    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Fields in registry order.
    pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.values()
    }

    /// Output column names in registry order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(|f| f.output_name.as_str())
    }

    /// Output column name for a key, if the key is known.
    pub fn output_name(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.output_name.as_str())
    }

    /// Whether the key is part of the schema.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn assert_unique(registry: &SchemaRegistry) {
        let keys: HashSet<_> = registry.all_keys().collect();
        let names: HashSet<_> = registry.output_names().collect();
        assert_eq!(keys.len(), registry.len());
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn test_builtin_registries_are_unique() {
        assert_unique(&SchemaRegistry::healthcare());
        assert_unique(&SchemaRegistry::education());
    }

    #[test]
    fn test_healthcare_order_and_names() {
        let registry = SchemaRegistry::healthcare();
        let keys: Vec<_> = registry.all_keys().take(6).collect();
        assert_eq!(keys, vec!["id", "name", "site", "lat", "lon", "geo_qual"]);
        assert_eq!(registry.output_name("beds"), Some("cap_beds"));
        assert_eq!(registry.output_name("name"), Some("hospital_name"));
        assert_eq!(registry.lookup("refdate").unwrap().field_type, FieldType::DateTime);
    }

    #[test]
    fn test_education_specific_fields() {
        let registry = SchemaRegistry::education();
        assert_eq!(registry.output_name("name"), Some("name"));
        assert!(registry.contains("students"));
        assert!(!registry.contains("beds"));
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let registry = SchemaRegistry::healthcare();
        assert!(matches!(registry.lookup("altitude"), Err(FacilityError::NotFound(_))));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = SchemaRegistry::new([
            SchemaField::new("a", FieldType::String),
            SchemaField::new("b", FieldType::String).with_output_name("a"),
        ]);
        assert!(result.is_err());
    }
}
