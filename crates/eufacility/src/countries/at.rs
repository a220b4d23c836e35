//! Austria.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::facility::CountryOverride;

use super::{AddressParts, source_column, split_address_column};

static COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Healthcare: the address comes as one `Adresse` column.
pub(super) fn healthcare() -> CountryOverride {
    CountryOverride::new("AT").with_prepare(|table, index, args| {
        let column = source_column(table, args, "Adresse")?.to_string();
        split_address_column(table, index, &column, split_at_address);
        Ok(())
    })
}

/// Split `"St. Veiter-Straße 46, 5621 St. Veit im Pongau"`.
pub fn split_at_address(value: &str) -> AddressParts {
    let value = WHITESPACE.replace_all(value.trim(), " ");
    let mut pieces = COMMA.split(&value);
    let left = pieces.next().unwrap_or_default().trim();
    let right = pieces.collect::<Vec<_>>().join(" ");
    let right = right.trim();

    let mut parts = AddressParts::default();
    match left.rsplit_once(' ') {
        Some((street, number)) if number.starts_with(|c: char| c.is_ascii_digit()) => {
            parts.street = street.to_string();
            parts.number = number.to_string();
        }
        _ => parts.street = left.to_string(),
    }

    match right.split_once(' ') {
        Some((postcode, city)) if postcode.chars().all(|c| c.is_ascii_digit()) => {
            parts.postcode = postcode.to_string();
            parts.city = city.to_string();
        }
        None if !right.is_empty() && right.chars().all(|c| c.is_ascii_digit()) => {
            parts.postcode = right.to_string();
        }
        _ => parts.city = right.to_string(),
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DataTable;
    use crate::metadata::OutputIndex;
    use indexmap::IndexMap;

    #[test]
    fn test_split_full_address() {
        let parts = split_at_address("St. Veiter-Straße 46, 5621 St. Veit im Pongau");
        assert_eq!(parts.street, "St. Veiter-Straße");
        assert_eq!(parts.number, "46");
        assert_eq!(parts.postcode, "5621");
        assert_eq!(parts.city, "St. Veit im Pongau");
    }

    #[test]
    fn test_split_partial_address() {
        let parts = split_at_address("Hauptplatz");
        assert_eq!(parts.street, "Hauptplatz");
        assert!(parts.city.is_empty());

        let parts = split_at_address("Spitalgasse 23,  Wien");
        assert_eq!(parts.number, "23");
        assert_eq!(parts.city, "Wien");
        assert!(parts.postcode.is_empty());
    }

    #[test]
    fn test_prepare_registers_columns() {
        let mut table = DataTable::from_rows(
            &["Name", "Adresse"],
            &[&["LKH", "Spitalgasse 23, 1090 Wien"]],
        );
        let mut index = OutputIndex::new();
        let hook = healthcare().prepare.unwrap();
        hook(&mut table, &mut index, &IndexMap::new()).unwrap();

        assert_eq!(table.column_by_name("postcode").unwrap(), vec!["1090"]);
        assert_eq!(index.get("number"), Some(&Some("number".to_string())));
    }
}
