//! Lithuania.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::facility::CountryOverride;

use super::{AddressParts, source_column, split_address_column};

static COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));

/// Healthcare: the address comes as one `Adress` column.
pub(super) fn healthcare() -> CountryOverride {
    CountryOverride::new("LT").with_prepare(|table, index, args| {
        let column = source_column(table, args, "Adress")?.to_string();
        split_address_column(table, index, &column, split_lt_address);
        Ok(())
    })
}

/// Split `"Vilniaus g. 12, LT-01100 Vilnius"`.
///
/// Tokens are classified rather than positioned: postcodes end with a digit,
/// house numbers start with one.
pub fn split_lt_address(value: &str) -> AddressParts {
    let mut pieces = COMMA.splitn(value.trim(), 2);
    let left = pieces.next().unwrap_or_default();
    let right = pieces.next().unwrap_or_default();

    let mut street = Vec::new();
    let mut number = Vec::new();
    for token in left.split_whitespace() {
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            number.push(token);
        } else {
            street.push(token);
        }
    }

    let mut postcode = Vec::new();
    let mut city = Vec::new();
    for token in right.split_whitespace() {
        if token.ends_with(|c: char| c.is_ascii_digit()) {
            postcode.push(token);
        } else {
            city.push(token);
        }
    }

    AddressParts {
        street: street.join(" "),
        number: number.join(" "),
        postcode: postcode.join(" "),
        city: city.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_address() {
        let parts = split_lt_address("Vilniaus g. 12, LT-01100 Vilnius");
        assert_eq!(
            parts,
            AddressParts {
                street: "Vilniaus g.".into(),
                number: "12".into(),
                postcode: "LT-01100".into(),
                city: "Vilnius".into(),
            }
        );
    }

    #[test]
    fn test_split_without_comma() {
        let parts = split_lt_address("Santariškių g. 2");
        assert_eq!(parts.street, "Santariškių g.");
        assert_eq!(parts.number, "2");
        assert!(parts.city.is_empty());
    }
}
