//! Harmonise command - run the pipeline for one or more countries.

use std::path::PathBuf;

use colored::Colorize;
use eufacility::services::NominatimGeocoder;
use eufacility::{Harmoniser, OutputFormat, Services};

use crate::cli::{CategoryArgs, GeocoderChoice};

pub struct HarmoniseArgs {
    pub countries: Vec<String>,
    pub category: CategoryArgs,
    pub metadata_dir: PathBuf,
    pub geocoder: Option<GeocoderChoice>,
    pub geokey: Option<String>,
    pub formats: Vec<OutputFormat>,
    pub dump_metadata: bool,
    pub json: bool,
}

pub fn run(args: HarmoniseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args.category)?;

    let mut services = Services::none();
    if let Some(GeocoderChoice::Nominatim) = args.geocoder {
        let mut geocoder = NominatimGeocoder::new()?;
        if let Some(key) = args.geokey {
            geocoder = geocoder.with_key(key);
        }
        services = services.with_geocoder(geocoder);
    }

    let harmoniser = Harmoniser::new(config)
        .with_metadata_dir(&args.metadata_dir)
        .with_services(services)
        .with_formats(args.formats)
        .with_metadata_dump(args.dump_metadata);

    let report = harmoniser.harmonise_countries(&args.countries);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {} ({})",
            "Harmonised".cyan().bold(),
            report.category.to_string().white(),
            report.category.code()
        );
        println!();

        for run in &report.succeeded {
            let strategy = run
                .location
                .as_ref()
                .map_or("none", |l| l.strategy.label());
            println!(
                "  {} {}  {} rows, location: {}",
                "✓".green(),
                run.country.white().bold(),
                run.rows,
                strategy
            );
            for path in &run.written {
                println!("      {}", path.display().to_string().dimmed());
            }
            for cast in &run.cast_fallbacks {
                println!(
                    "      {} column {} kept as text ({} values not {})",
                    "!".yellow(),
                    cast.column,
                    cast.failures,
                    cast.target
                );
            }
            for warning in &run.warnings {
                println!("      {} {}", "!".yellow(), warning);
            }
        }
        for (country, error) in &report.failed {
            println!("  {} {}  {}", "✗".red(), country.white().bold(), error.red());
        }
        println!();
        println!(
            "{} succeeded, {} failed",
            report.succeeded.len().to_string().green(),
            report.failed.len().to_string().red()
        );
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(format!("{} of {} countries failed", report.failed.len(), report.len()).into())
    }
}
