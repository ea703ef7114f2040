pub mod wgs_metrics;
