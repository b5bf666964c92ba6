//! JSON export of a run report

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use osbench_core::{AggregateReport, RunConfig};
use serde_json::json;

/// Write the configuration, the report and its flat metrics as pretty JSON
pub fn export_json(report: &AggregateReport, config: &RunConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let output = json!({
        "config": config,
        "metrics": report.metrics(),
        "report": report,
    });

    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &output).context("Failed to write report")?;

    Ok(())
}
