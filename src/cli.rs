use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Alternate configuration file (defaults to the per-user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress the progress spinner
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect whole-genome depth-of-coverage metrics from a coordinate-sorted BAM/CRAM
    WgsMetrics {
        /// Input BAM or CRAM file
        #[arg(short = 'I', long = "input")]
        input: PathBuf,

        /// Output metrics file
        #[arg(short = 'O', long = "output")]
        output: PathBuf,

        /// Indexed reference FASTA
        #[arg(short = 'R', long = "reference")]
        reference: PathBuf,

        /// Minimum mapping quality for a read to contribute coverage (default: 20)
        #[arg(short = 'M', long = "min-mapping-quality")]
        min_mapping_quality: Option<u8>,

        /// Minimum base quality for a base to contribute coverage (default: 20)
        #[arg(short = 'Q', long = "min-base-quality")]
        min_base_quality: Option<u8>,

        /// Treat positions with coverage exceeding this value as having it (default: 250)
        #[arg(long = "coverage-cap")]
        coverage_cap: Option<usize>,

        /// Stop after processing this many loci
        #[arg(long = "stop-after")]
        stop_after: Option<u64>,

        /// Emit the base quality histogram next to the coverage histogram
        #[arg(long = "include-bq-histogram")]
        include_bq_histogram: bool,

        /// Number of worker threads
        #[arg(short = 't', long = "threads")]
        threads: Option<usize>,

        /// Maximum number of packs being processed at once
        #[arg(long = "max-in-flight")]
        max_in_flight: Option<usize>,

        /// Also write the metrics and histograms as JSON
        #[arg(long = "json")]
        json: Option<PathBuf>,
    },

    /// Write the default tuning configuration to the per-user config file
    InitConfig,
}
