//! eufacility CLI - harmonisation of national facility datasets.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use logging::LogConfig;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format));

    let result = match cli.command {
        Commands::Harmonise {
            countries,
            category,
            metadata_dir,
            geocoder,
            geokey,
            formats,
            dump_metadata,
            json,
        } => commands::harmonise::run(commands::harmonise::HarmoniseArgs {
            countries,
            category,
            metadata_dir,
            geocoder,
            geokey,
            formats,
            dump_metadata,
            json,
        }),

        Commands::Validate {
            country,
            category,
            file,
            json,
        } => commands::validate::run(country, category, file, json),

        Commands::Template {
            country,
            category,
            output,
        } => commands::template::run(country, category, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
