pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod utils;
pub mod wgs_metrics;

pub use error::{Result, WgsError};
pub use wgs_metrics::{
    collect_coverage, collect_wgs_metrics, CancellationToken, MetricsReport, WgsMetrics,
    WgsOptions,
};
