//! Italy.

use indexmap::IndexMap;

use crate::error::{FacilityError, Result};
use crate::facility::CountryOverride;
use crate::input::DataTable;
use crate::metadata::OutputIndex;
use crate::schema::FieldType;
use crate::transform::parse_float;

const ID_PARTS: [&str; 3] = ["Codice Azienda", "Codice struttura", "Subcodice"];
const BEDS: &str = "Totale posti letto";

/// Healthcare: one row per ward, identified by three code columns.
pub(super) fn healthcare() -> CountryOverride {
    CountryOverride::new("IT").with_prepare(|table, index, _| compose_sites(table, index))
}

/// Compose `id` from the code columns and sum beds per id, keeping the
/// first row of each id.
fn compose_sites(table: &mut DataTable, index: &mut OutputIndex) -> Result<()> {
    let parts: Vec<usize> = ID_PARTS
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| FacilityError::NotFound(format!("column '{}'", name)))
        })
        .collect::<Result<_>>()?;
    let beds_idx = table.column_index(BEDS);

    let ids: Vec<String> = table
        .rows
        .iter()
        .map(|row| {
            parts
                .iter()
                .map(|&i| row[i].trim())
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect();

    // id -> (first row, total beds)
    let mut sites: IndexMap<&str, (usize, f64)> = IndexMap::new();
    for (row_idx, id) in ids.iter().enumerate() {
        let beds = beds_idx
            .and_then(|i| table.get(row_idx, i))
            .and_then(parse_float)
            .unwrap_or(0.0);
        sites
            .entry(id.as_str())
            .and_modify(|(_, total)| *total += beds)
            .or_insert((row_idx, beds));
    }

    let rows: Vec<Vec<String>> = sites
        .values()
        .map(|(row_idx, _)| table.rows[*row_idx].clone())
        .collect();
    let ids_kept: Vec<String> = sites.keys().map(|id| id.to_string()).collect();
    let beds: Vec<String> = sites
        .values()
        .map(|(_, total)| format!("{}", total.round() as i64))
        .collect();
    let has_beds = beds_idx.is_some();

    table.rows = rows;
    table.put_column("id", ids_kept, FieldType::String);
    index.insert("id".to_string(), Some("id".to_string()));
    if has_beds {
        table.put_column("beds", beds, FieldType::String);
        index.insert("beds".to_string(), Some("beds".to_string()));
    }
    Ok(())
}
