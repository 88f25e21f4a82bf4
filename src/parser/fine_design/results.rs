use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ParseError;
use crate::structs_and_impls::*;


/// Records found for one quantity plus the files that had to be left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantityScan {
    pub quantity: String,
    pub records: Vec<QuantityRecord>,
    pub skipped: Vec<PathBuf>,
}

pub struct ResultsParser;  // Reader for per-design quantity files in a Design3D results tree

impl ResultsParser {
    /// Last `VALUE <number>` of a quantity file, `None` when the file has none.
    pub fn parse_file(filename: &Path) -> Result<Option<String>, ParseError> {
        let quantity_file = File::open(filename)?;      // Open the quantity file
        Self::parse_value(BufReader::new(quantity_file))    // Scan it for VALUE lines
    }

    pub fn parse_value<R: Read>(reader: BufReader<R>) -> Result<Option<String>, ParseError> {
        let mut value = None;                           // Stays None when no numeric VALUE is found
        for line in reader.lines() {
            let line = line?;
            let mut words = line.split_whitespace();
            if let (Some("VALUE"), Some(token)) = (words.next(), words.next()) {
                if token.parse::<f64>().is_ok() {
                    value = Some(token.to_string());            // later lines win
                } else {
                    debug!("ignoring non-numeric VALUE '{}'", token);
                }
            }
        }
        Ok(value)
    }

    /// Design number taken from the deepest directory whose name contains `marker`:
    /// the digits right after the marker's last occurrence (`run_design_42` gives 42).
    pub fn design_id(path: &Path, marker: &str) -> Option<u64> {
        let parent = path.parent()?;                    // The file name itself never counts
        parent
            .components()
            .rev()                                      // deepest directory first
            .filter_map(|c| c.as_os_str().to_str())
            .find(|name| name.contains(marker))
            .and_then(|name| {
                let start = name.rfind(marker)? + marker.len();
                let digits: String = name[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
    }

    /// Walks `root` once (sorted by file name) and extracts every quantity in parallel.
    pub fn scan(root: &Path, quantities: &[String], marker: &str) -> Result<Vec<QuantityScan>, ParseError> {
        if !root.is_dir() {
            return Err(ParseError::MissingInputFile(root.to_path_buf()));
        }

        let mut files = Vec::new();                     // Every regular file under root, in walk order
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| ParseError::FormatError(format!("walking {}: {}", root.display(), e)))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        debug!("{} files under {}", files.len(), root.display());

        quantities
            .par_iter()                                 // one task per quantity, each with its own records
            .map(|quantity| Self::scan_quantity(&files, quantity, marker))
            .collect()
    }

    fn scan_quantity(files: &[PathBuf], quantity: &str, marker: &str) -> Result<QuantityScan, ParseError> {
        let mut scan = QuantityScan { quantity: quantity.to_string(), ..Default::default() };

        for path in files.iter().filter(|p| p.file_stem().and_then(|s| s.to_str()) == Some(quantity)) {
            let design_id = match Self::design_id(path, marker) {
                Some(id) => id,
                None => {
                    warn!("{}: no '{}' directory above it, skipped", path.display(), marker);
                    scan.skipped.push(path.clone());
                    continue;
                }
            };
            match Self::parse_file(path)? {
                Some(value) => scan.records.push(QuantityRecord { design_id, value, source: path.clone() }),
                None => {
                    warn!("{}: no VALUE line, skipped", path.display());
                    scan.skipped.push(path.clone());
                }
            }
        }
        Ok(scan)
    }
}
