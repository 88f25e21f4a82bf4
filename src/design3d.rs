//! FINE/Design3D post-processing: per-design quantity tables and statistical moments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::*;
use crate::parser::fine_design::his::HisParser;
use crate::parser::fine_design::results::ResultsParser;
use crate::structs_and_impls::QuantityRecord;
use crate::writer::dat_writer::{DatWriter, MomentsSummary};


/// Outcome of one `<quantity>_global.dat` table.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitySummary {
    pub quantity: String,
    pub output: PathBuf,
    pub records: usize,
    pub skipped: usize,
}

/// Walks `root` for every quantity and writes `<output_dir>/<quantity>_global.dat`.
pub fn extract_results(
    root: &Path,
    quantities: &[String],
    marker: &str,
    output_dir: &Path,
    sort: bool,
) -> Result<Vec<QuantitySummary>> {
    if quantities.is_empty() {
        return Err(Error::Validation("no quantity requested".to_string()));
    }

    let scans = ResultsParser::scan(root, quantities, marker)?;

    // Every table is assembled before the first one is written
    let tables: Vec<(QuantitySummary, Vec<QuantityRecord>)> = scans
        .into_par_iter()
        .map(|mut scan| {
            warn_duplicate_designs(&scan.quantity, &scan.records);
            if sort {
                scan.records.sort_by_key(|r| r.design_id);
            }
            let summary = QuantitySummary {
                output: output_dir.join(format!("{}_global.dat", scan.quantity)),
                records: scan.records.len(),
                skipped: scan.skipped.len(),
                quantity: scan.quantity,
            };
            (summary, scan.records)
        })
        .collect();

    for (summary, records) in &tables {
        DatWriter::write_quantity(records, &summary.output)?;
        info!("{}: {} record(s) written to {}", summary.quantity, summary.records, summary.output.display());
    }
    Ok(tables.into_iter().map(|(summary, _)| summary).collect())
}

// Two files of one quantity resolving to the same design id both end up in the table
fn warn_duplicate_designs(quantity: &str, records: &[QuantityRecord]) {
    let mut seen: HashMap<u64, &Path> = HashMap::new();
    for record in records {
        if let Some(first) = seen.insert(record.design_id, record.source.as_path()) {
            warn!(
                "{}: design {} found in {} and {}",
                quantity,
                record.design_id,
                first.display(),
                record.source.display()
            );
        }
    }
}

/// Moments table of the samples whose simulation path contains `marker`.
pub fn extract_moments(his_file: &Path, marker: &str, output: &Path) -> Result<MomentsSummary> {
    let history = HisParser::parse_file(his_file)?;
    info!(
        "{} statistic(s), {} design sample(s) in {}",
        history.statistic_names.len(),
        history.samples.len(),
        his_file.display()
    );
    let summary = DatWriter::write_moments(&history, marker, output)?;
    info!("{} line(s) written to {}", summary.written, output.display());
    Ok(summary)
}
