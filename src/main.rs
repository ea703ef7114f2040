use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use wgs_coverage::cli::{Args, Commands};
use wgs_coverage::commands::wgs_metrics::{self, Overrides, Paths};
use wgs_coverage::config::Config;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");

    match args.command {
        Commands::WgsMetrics {
            input,
            output,
            reference,
            min_mapping_quality,
            min_base_quality,
            coverage_cap,
            stop_after,
            include_bq_histogram,
            threads,
            max_in_flight,
            json,
        } => {
            let overrides = Overrides {
                min_mapping_quality,
                min_base_quality,
                coverage_cap,
                stop_after,
                include_bq_histogram,
                threads,
                max_in_flight,
            };
            let options = wgs_metrics::resolve_options(&config, &overrides);
            let paths = Paths {
                input,
                output,
                reference,
                json,
            };
            wgs_metrics::run(paths, options, args.quiet, &command_line)?;
        }
        Commands::InitConfig => {
            let path = config.save()?;
            info!("Configuration written to {}", path.display());
        }
    }
    Ok(())
}
