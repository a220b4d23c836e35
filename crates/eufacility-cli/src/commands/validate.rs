//! Validate command - check a harmonised CSV against the schema.

use std::path::PathBuf;

use colored::Colorize;
use eufacility::validation::{ensure_valid, validate_file};
use eufacility::{LoadOptions, OutputFormat, Severity};

use crate::cli::CategoryArgs;

pub fn run(
    country: String,
    category: CategoryArgs,
    file: Option<PathBuf>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&category)?;
    let path = file.unwrap_or_else(|| config.output_file(&country, OutputFormat::Csv));

    if !path.exists() {
        return Err(format!(
            "Harmonised file not found: {}\nRun 'eufacility harmonise {}' first.",
            path.display(),
            country
        )
        .into());
    }

    let mut options = LoadOptions::default()
        .with_separator(config.options.separator.clone())
        .with_encoding(config.options.encoding.clone());
    options.date_format = Some(config.options.date_format.clone());
    let observations = validate_file(&path, &config.registry, &options)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&observations)?);
    } else {
        println!(
            "{} {}",
            "Validation of".cyan().bold(),
            path.display().to_string().white()
        );
        println!();

        if observations.is_empty() {
            println!("  {}", "no issues found".green());
        }
        for observation in &observations {
            let severity = match observation.severity {
                Severity::Error => observation.severity.label().red(),
                Severity::Warning => observation.severity.label().yellow(),
            };
            println!(
                "  [{}] {} {}: {}",
                severity,
                observation.check.label().dimmed(),
                observation.column.white(),
                observation.message
            );
            for offender in &observation.samples {
                println!(
                    "      {} {}",
                    format!("row {}", offender.row).dimmed(),
                    offender.value
                );
            }
            if observation.count > observation.samples.len() {
                println!(
                    "      {}",
                    format!("... {} more", observation.count - observation.samples.len()).dimmed()
                );
            }
        }
        println!();
    }

    ensure_valid(observations)?;
    println!("{}", "OK".green().bold());
    Ok(())
}
