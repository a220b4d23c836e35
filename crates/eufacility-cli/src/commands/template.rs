//! Template command - emit a skeleton metadata sidecar.

use std::path::PathBuf;

use colored::Colorize;
use eufacility::{FacilityCategory, MetadataRecord};

pub fn run(
    country: Option<String>,
    category: FacilityCategory,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let template = MetadataRecord::template(category, country.as_deref());

    match output {
        Some(path) => {
            template.save(&path)?;
            println!(
                "{} {}",
                "Template written to".green(),
                path.display().to_string().white()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&template)?),
    }
    Ok(())
}
