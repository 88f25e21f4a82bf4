use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::structs_and_impls::*;


pub struct ModeFileParser;  // Reader for FINE/Turbo structure mode shape files

impl ModeFileParser {
    pub fn parse_file(filename: &Path) -> Result<ModeShapeData, ParseError> {
        require_file(filename)?;                        // Fail early with the missing path
        let mode_file = File::open(filename)?;          // Open the structure file from disk
        Self::parse_modes(BufReader::new(mode_file))    // Buffered read of the whole table
    }

    pub fn parse_modes<R: Read>(reader: BufReader<R>) -> Result<ModeShapeData, ParseError> {
        let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;    // Header is positional, keep every line
        let mut i = 1;                                  // line 0 is a free comment

        let dimension = parse_header_number(&lines, &mut i, "number of dimensions")?;
        let num_modes = parse_header_number(&lines, &mut i, "number of modes")?;
        let num_nodes = parse_header_number(&lines, &mut i, "number of nodes")?;
        let deformation_flag = parse_header_number(&lines, &mut i, "initial deformation flag")?;

        if dimension != 2 && dimension != 3 {
            return Err(ParseError::FormatError(format!("unsupported dimension {}", dimension)));
        }
        if num_modes == 0 {
            return Err(ParseError::FormatError("mode file declares no modes".to_string()));
        }

        i += 2;                                         // section title lines
        let mut eigenfrequencies = Vec::with_capacity(num_modes);
        for _ in 0..num_modes {
            let line = lines.get(i).ok_or_else(|| {
                ParseError::FormatError("mode file ends inside the eigenfrequency list".to_string())
            })?;
            let token = line.split_whitespace().next().ok_or_else(|| {
                ParseError::FormatError(format!("line {}: missing eigenfrequency", i + 1))
            })?;
            eigenfrequencies.push(token.parse::<f64>()?);
            i += 1;
        }
        i += 2;                                         // mode shape title lines

        let rows: Vec<(usize, Vec<f64>)> = lines
            .iter()
            .enumerate()
            .skip(i)
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                line.split_whitespace()
                    .map(|t| t.parse::<f64>())
                    .collect::<Result<Vec<f64>, _>>()
                    .map(|row| (idx + 1, row))
                    .map_err(|e| ParseError::NumberParseError(format!("line {}: {}", idx + 1, e)))
            })
            .collect::<Result<_, _>>()?;

        if rows.len() != num_nodes {
            return Err(ParseError::FormatError(format!(
                "header declares {} nodes but {} rows were found",
                num_nodes,
                rows.len()
            )));
        }

        let plain_width = dimension * (1 + num_modes);      // coordinates + mode shapes
        let deformed_width = dimension * (2 + num_modes);   // coordinates + initial deformation + mode shapes
        let mut initial_deformation = deformation_flag != 0;
        if let Some((line_no, row)) = rows.first() {
            let expected = if initial_deformation { deformed_width } else { plain_width };
            if row.len() != expected {
                if row.len() == plain_width || row.len() == deformed_width {
                    warn!(
                        "line {}: row width {} disagrees with the initial deformation flag {}, using the row width",
                        line_no, row.len(), deformation_flag
                    );
                    initial_deformation = row.len() == deformed_width;
                } else {
                    return Err(ParseError::FormatError(format!(
                        "line {}: expected {} columns, found {}",
                        line_no, expected, row.len()
                    )));
                }
            }
        }

        let width = if initial_deformation { deformed_width } else { plain_width };
        let shape_start = if initial_deformation { 2 * dimension } else { dimension };
        let mut coordinates = Vec::with_capacity(num_nodes);
        let mut mode_shapes = Vec::with_capacity(num_nodes);
        for (line_no, row) in rows {
            if row.len() != width {
                return Err(ParseError::FormatError(format!(
                    "line {}: expected {} columns, found {}",
                    line_no, width, row.len()
                )));
            }
            coordinates.push(row[..dimension].to_vec());
            mode_shapes.push(row[shape_start..].to_vec());
        }

        info!(
            "read {} nodes, {} modes, {}D{}",
            num_nodes,
            num_modes,
            dimension,
            if initial_deformation { ", with initial deformation" } else { "" }
        );
        debug!("eigenfrequencies: {:?}", eigenfrequencies);

        Ok(ModeShapeData {
            header: ModeFileHeader { dimension, num_modes, num_nodes, initial_deformation },
            eigenfrequencies,
            coordinates,
            mode_shapes,
        })
    }
}

// First integer token on header line `i`, advancing `i`
fn parse_header_number(lines: &[String], i: &mut usize, context: &str) -> Result<usize, ParseError> {
    let line = lines.get(*i).ok_or_else(|| {
        ParseError::FormatError(format!("mode file header ends before the {}", context))
    })?;
    let number = line
        .split_whitespace()
        .find_map(|w| w.parse::<usize>().ok())
        .ok_or_else(|| ParseError::FormatError(format!("line {}: no {} found", *i + 1, context)))?;
    *i += 1;
    Ok(number)
}
