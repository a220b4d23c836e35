//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use eufacility::{FacilityCategory, OutputFormat};
use std::path::PathBuf;

/// eufacility: harmonise national facility datasets
#[derive(Parser)]
#[command(name = "eufacility")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harmonise the datasets of one or more countries
    Harmonise {
        /// Country codes, or ALL for every known country
        #[arg(value_name = "COUNTRY", required = true)]
        countries: Vec<String>,

        #[command(flatten)]
        category: CategoryArgs,

        /// Directory holding <cat>/<CC><cat>.json metadata sidecars
        #[arg(short, long, default_value = "metadata")]
        metadata_dir: PathBuf,

        /// Geocoder used when a dataset carries no coordinates
        #[arg(short = 'c', long, value_enum)]
        geocoder: Option<GeocoderChoice>,

        /// API key for the geocoder
        #[arg(short = 'k', long)]
        geokey: Option<String>,

        /// Output formats, overriding the sidecar options
        #[arg(short, long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        /// Write the final metadata next to the outputs
        #[arg(long)]
        dump_metadata: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a harmonised CSV output
    Validate {
        /// Country code of the harmonised dataset
        #[arg(value_name = "COUNTRY")]
        country: String,

        #[command(flatten)]
        category: CategoryArgs,

        /// Validate this file instead of the default output location
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a skeleton metadata sidecar
    Template {
        /// Country code
        #[arg(value_name = "COUNTRY")]
        country: Option<String>,

        /// Facility category (hcs or edu)
        #[arg(long, default_value = "hcs")]
        category: FacilityCategory,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options selecting and locating a category configuration.
#[derive(Args, Clone, Debug)]
pub struct CategoryArgs {
    /// Facility category (hcs or edu)
    #[arg(long, default_value = "hcs")]
    pub category: FacilityCategory,

    /// Category configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory, overriding the configuration
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GeocoderChoice {
    /// OpenStreetMap Nominatim search API
    Nominatim,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
