use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::parser::keyed_block::{BlockStack, KeyedLine};
use crate::structs_and_impls::*;


// Where the reader currently is inside the history file
enum HisState {
    Outside,                        // Between blocks, or inside blocks we do not read
    InNames,                        // Inside STATISTICS_NAMES
    InSample(DesignSample),         // Inside DESIGN_SAMPLE, collecting its entries
}

pub struct HisParser;  // Reader for FINE/Design3D statistics history (.his) files

impl HisParser {
    pub fn parse_file(filename: &Path) -> Result<HistoryData, ParseError> {
        require_file(filename)?;                        // Missing history is reported by path
        let his_file = File::open(filename)?;           // Open the file from disk
        Self::parse_his(BufReader::new(his_file))       // Buffered line-by-line read
    }

    pub fn parse_his<R: Read>(reader: BufReader<R>) -> Result<HistoryData, ParseError> {
        let mut history = HistoryData::default();       // Names and samples in file order
        let mut blocks = BlockStack::new();             // Nesting check for NI_BEGIN/NI_END
        let mut state = HisState::Outside;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;                      // 1-based for error messages

            match KeyedLine::classify(&line) {
                KeyedLine::Begin(kind) => {
                    blocks.open(kind, line_no)?;
                    match kind {
                        "STATISTICS_NAMES" => state = HisState::InNames,
                        "DESIGN_SAMPLE" => state = HisState::InSample(DesignSample::default()),
                        _ => {}
                    }
                }
                KeyedLine::End(kind) => {
                    blocks.close(kind, line_no)?;
                    match (kind, std::mem::replace(&mut state, HisState::Outside)) {
                        ("DESIGN_SAMPLE", HisState::InSample(sample)) => history.samples.push(sample),
                        ("STATISTICS_NAMES", HisState::InNames) => {
                            debug!("found {} statistic names", history.statistic_names.len());
                        }
                        (_, previous) => state = previous,  // inner block closed, keep the enclosing state
                    }
                }
                KeyedLine::Entry { key, values } => match &mut state {
                    HisState::InNames if key == "STATISTICS" => {
                        history.statistic_names.push(values[0].to_string());
                    }
                    HisState::InSample(sample) if key.contains("DESIGN_STATISTICS") => {
                        sample.values = values.iter().map(|v| v.to_string()).collect();
                    }
                    HisState::InSample(sample) if key == "SIMULATION_PATH" => {
                        sample.simulation_path = Some(values.join(" "));    // paths may contain spaces
                    }
                    _ => {}
                },
                KeyedLine::Other => {}
            }
        }

        blocks.finish()?;

        if history.statistic_names.is_empty() {
            warn!("no STATISTICS_NAMES entries found in history file");
        }
        Ok(history)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<HistoryData, ParseError> {
        HisParser::parse_his(BufReader::new(text.as_bytes()))
    }

    #[test]
    fn reads_names_and_samples() {
        let text = "\
NI_BEGIN\tSTATISTICS_NAMES
   STATISTICS\tMEAN
   STATISTICS\tSTDDEV
NI_END\tSTATISTICS_NAMES
NI_BEGIN\tDESIGN_SAMPLE
   ITERATION\t1
   EFF_DESIGN_STATISTICS\t0.91 0.02
   SIMULATION_PATH\t/work/run_design_42/run.run
NI_END\tDESIGN_SAMPLE
NI_BEGIN\tDESIGN_SAMPLE
   EFF_DESIGN_STATISTICS\t0.88 0.03
NI_END\tDESIGN_SAMPLE
";
        let history = parse(text).unwrap();
        assert_eq!(history.statistic_names, vec!["MEAN", "STDDEV"]);
        assert_eq!(history.samples.len(), 2);
        assert_eq!(history.samples[0].values, vec!["0.91", "0.02"]);
        assert_eq!(history.samples[0].simulation_path.as_deref(), Some("/work/run_design_42/run.run"));
        assert_eq!(history.samples[1].simulation_path, None);
    }

    #[test]
    fn inner_blocks_keep_sample_state() {
        let text = "\
NI_BEGIN DESIGN_SAMPLE
NI_BEGIN OBJECTIVES
   OBJ 1.0
NI_END OBJECTIVES
   DESIGN_STATISTICS 5 6
   SIMULATION_PATH a_design_1
NI_END DESIGN_SAMPLE
";
        let history = parse(text).unwrap();
        assert_eq!(history.samples[0].values, vec!["5", "6"]);
        assert_eq!(history.samples[0].simulation_path.as_deref(), Some("a_design_1"));
    }

    #[test]
    fn unclosed_sample_is_format_error() {
        let result = parse("NI_BEGIN DESIGN_SAMPLE\n   DESIGN_STATISTICS 1\n");
        assert!(matches!(result, Err(ParseError::FormatError(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = HisParser::parse_file(&dir.path().join("sample.his"));
        assert!(matches!(result, Err(ParseError::MissingInputFile(_))));
    }
}
