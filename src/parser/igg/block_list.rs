use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::*;
use crate::structs_and_impls::require_file;


pub struct BlockListParser;  // Reader for the block name dump produced by the IGG batch script

impl BlockListParser {
    pub fn parse_file(filename: &Path) -> std::result::Result<Vec<String>, ParseError> {
        require_file(filename)?;                        // IGG may have failed to write the dump
        let block_file = File::open(filename)?;
        Self::parse_block_list(BufReader::new(block_file))
    }

    // One block name per line, in IGG block order
    pub fn parse_block_list<R: Read>(reader: BufReader<R>) -> std::result::Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let name = line.trim_end();                 // IGG pads names with trailing blanks
            if !name.is_empty() {                       // Skip blank lines
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// 1-based IGG indices of `requested`, sorted ascending.
    pub fn select_indices(block_names: &[String], requested: &[String]) -> Result<Vec<usize>> {
        let mut unknown = Vec::new();
        let mut indices = Vec::with_capacity(requested.len());

        for name in requested {
            match block_names.iter().position(|b| b == name) {
                Some(pos) => indices.push(pos + 1),     // IGG numbers blocks from 1
                None => unknown.push(name.as_str()),
            }
        }
        if !unknown.is_empty() {
            return Err(Error::Validation(format!("unknown block name(s): {}", unknown.join(", "))));
        }

        indices.sort_unstable();
        Ok(indices)
    }
}
