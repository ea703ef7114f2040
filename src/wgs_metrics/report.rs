use super::stats::{Histogram, WgsMetrics};
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Everything handed to the output side once the run has drained.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub metrics: WgsMetrics,
    pub depth_histogram: Histogram,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_quality_histogram: Option<Histogram>,
}

/// Writes the metrics row and histograms as a tab-separated metrics file.
pub fn write_metrics_file(
    path: &Path,
    report: &MetricsReport,
    command_line: &str,
) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_metrics(&mut writer, report, command_line)?;
    writer.flush()
}

pub fn write_metrics<W: Write>(
    writer: &mut W,
    report: &MetricsReport,
    command_line: &str,
) -> std::io::Result<()> {
    writeln!(writer, "## StringHeader")?;
    writeln!(writer, "# {}", command_line)?;
    writeln!(writer, "## StringHeader")?;
    writeln!(writer, "# Started on: {}", Local::now().format("%a %b %d %H:%M:%S %Z %Y"))?;
    writeln!(writer)?;

    let columns = report.metrics.columns();
    writeln!(writer, "## METRICS CLASS\tWgsMetrics")?;
    writeln!(
        writer,
        "{}",
        columns.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join("\t")
    )?;
    writeln!(
        writer,
        "{}",
        columns.iter().map(|(_, value)| value.as_str()).collect::<Vec<_>>().join("\t")
    )?;
    writeln!(writer)?;

    writeln!(writer, "## HISTOGRAM\tjava.lang.Integer")?;
    let depth = &report.depth_histogram;
    match &report.base_quality_histogram {
        Some(baseq) => {
            writeln!(writer, "coverage\tcount\tbaseq_count")?;
            let rows = depth.counts().len().max(baseq.counts().len());
            for value in 0..rows {
                writeln!(writer, "{}\t{}\t{}", value, depth.get(value), baseq.get(value))?;
            }
        }
        None => {
            writeln!(writer, "coverage\tcount")?;
            for (value, count) in depth.counts().iter().enumerate() {
                writeln!(writer, "{}\t{}", value, count)?;
            }
        }
    }
    writeln!(writer)?;
    Ok(())
}

pub fn write_json(path: &Path, report: &MetricsReport) -> std::io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
