use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::WriterError;
use crate::structs_and_impls::*;


/// Lines written for the moments table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MomentsSummary {
    pub written: usize,
    pub skipped: usize,
}

pub struct DatWriter;  // Plain whitespace-separated .dat tables

impl DatWriter {
    /// Header of statistic names, then one line per sample whose path contains `marker`.
    pub fn moments_text(history: &HistoryData, marker: &str) -> (String, MomentsSummary) {
        let mut text = history.statistic_names.join(" ");
        text.push('\n');
        let mut summary = MomentsSummary::default();

        for sample in history.samples_matching(marker) {
            if sample.values.len() != history.statistic_names.len() {
                warn!(
                    "design sample at {} has {} values for {} statistics",
                    sample.simulation_path.as_deref().unwrap_or_default(),
                    sample.values.len(),
                    history.statistic_names.len()
                );
            }
            text.push_str(&sample.values.join(" "));
            text.push('\n');
            summary.written += 1;
        }

        summary.skipped = history.samples.len() - summary.written;
        if summary.skipped > 0 {
            debug!("{} design sample(s) without '{}' in their simulation path, skipped", summary.skipped, marker);
        }
        (text, summary)
    }

    pub fn write_moments(history: &HistoryData, marker: &str, output: &Path) -> Result<MomentsSummary, WriterError> {
        let (text, summary) = Self::moments_text(history, marker);
        fs::write(output, text)?;
        Ok(summary)
    }

    /// `"<id> <value>"` per record.
    pub fn quantity_text(records: &[QuantityRecord]) -> String {
        records.iter().map(|r| format!("{} {}\n", r.design_id, r.value)).collect()
    }

    pub fn write_quantity(records: &[QuantityRecord], output: &Path) -> Result<(), WriterError> {
        fs::write(output, Self::quantity_text(records))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_marked_samples_are_written() {
        let history = HistoryData {
            statistic_names: vec!["MEAN".to_string(), "STDDEV".to_string()],
            samples: vec![
                DesignSample {
                    values: vec!["0.9".to_string(), "0.01".to_string()],
                    simulation_path: Some("/w/opt_design_42/a.run".to_string()),
                },
                DesignSample {
                    values: vec!["0.8".to_string(), "0.02".to_string()],
                    simulation_path: Some("/w/db_flow_7/a.run".to_string()),
                },
                DesignSample { values: vec!["1".to_string()], simulation_path: None },
            ],
        };
        let (text, summary) = DatWriter::moments_text(&history, "_design_");
        assert_eq!(text, "MEAN STDDEV\n0.9 0.01\n");
        assert_eq!(summary, MomentsSummary { written: 1, skipped: 2 });
    }

    #[test]
    fn short_sample_is_still_written() {
        let history = HistoryData {
            statistic_names: vec!["MEAN".to_string(), "STDDEV".to_string(), "SKEW".to_string()],
            samples: vec![DesignSample {
                values: vec!["0.9".to_string(), "0.01".to_string()],
                simulation_path: Some("/w/opt_design_3/a.run".to_string()),
            }],
        };
        let (text, summary) = DatWriter::moments_text(&history, "_design_");
        assert_eq!(text, "MEAN STDDEV SKEW\n0.9 0.01\n");
        assert_eq!(summary, MomentsSummary { written: 1, skipped: 0 });
    }

    #[test]
    fn quantity_lines() {
        let records = vec![
            QuantityRecord { design_id: 3, value: "0.5".to_string(), source: PathBuf::from("a") },
            QuantityRecord { design_id: 1, value: "0.7".to_string(), source: PathBuf::from("b") },
        ];
        assert_eq!(DatWriter::quantity_text(&records), "3 0.5\n1 0.7\n");
    }
}
