use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::*;
use crate::parser::keyed_block::{BlockStack, KeyedLine};
use crate::structs_and_impls::*;


/// What the patcher changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub declared_before: Option<i64>,           // NUMBER_OF_PARAMETERS as found
    pub declared_after: Option<i64>,            // NUMBER_OF_PARAMETERS as written
    pub injected: Vec<String>,                  // New parameter blocks, in rule order
    pub patched: Vec<(String, String)>,         // (existing block NAME, driving parameter)
    pub found_user_parameters: bool,
}

// Patcher position in the file
enum ParState<'a> {
    Outside,
    InUserParameters,
    InParameter(PendingBlock<'a>),              // PARAMETER block inside USER_PARAMETERS, buffered until NI_END
}

struct PendingBlock<'a> {
    lines: Vec<&'a str>,                        // Raw lines including NI_BEGIN, excluding NI_END
    depth: usize,                               // Stack depth of the PARAMETER block itself
}

pub struct ParWriter;  // Patches FINE/Design3D parameter (.par) files with uncertainty expressions

impl ParWriter {
    /// `<stem>_new.<ext>` next to the source.
    pub fn default_output_path(source: &Path) -> PathBuf {
        let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("parameters");
        let name = match source.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_new.{}", stem, ext),
            None => format!("{}_new", stem),
        };
        source.with_file_name(name)
    }

    pub fn patch_file(
        source: &Path,
        output: &Path,
        rules: &[SubstitutionRule],
        range: &UncertainRange,
    ) -> Result<PatchReport> {
        require_file(source)?;
        range.validate()?;
        let text = fs::read_to_string(source).map_err(ParseError::from)?;

        let (patched, report) = Self::patch_text(&text, rules, range)?;

        fs::write(output, patched).map_err(WriterError::from)?;
        info!("patched parameter file written to {}", output.display());
        Ok(report)
    }

    pub fn patch_text(
        text: &str,
        rules: &[SubstitutionRule],
        range: &UncertainRange,
    ) -> std::result::Result<(String, PatchReport), ParseError> {
        let default_eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let mut out = String::with_capacity(text.len() + rules.len() * 400);
        let mut report = PatchReport::default();
        let mut blocks = BlockStack::new();
        let mut state = ParState::Outside;
        let mut injected = false;

        for (idx, line) in text.split_inclusive('\n').enumerate() {
            let line_no = idx + 1;
            let keyed = KeyedLine::classify(line);

            match keyed {
                KeyedLine::Begin(kind) => blocks.open(kind, line_no)?,
                KeyedLine::End(kind) => blocks.close(kind, line_no)?,
                _ => {}
            }

            state = match state {
                ParState::Outside => {
                    if keyed == KeyedLine::Begin("USER_PARAMETERS") {
                        report.found_user_parameters = true;
                        out.push_str(line);
                        ParState::InUserParameters
                    } else {
                        out.push_str(line);
                        ParState::Outside
                    }
                }
                ParState::InUserParameters => match keyed {
                    KeyedLine::Begin("PARAMETER") => ParState::InParameter(PendingBlock {
                        lines: vec![line],
                        depth: blocks.depth(),
                    }),
                    KeyedLine::End("USER_PARAMETERS") => {
                        if !injected {
                            warn!("USER_PARAMETERS has no NUMBER_OF_PARAMETERS line, new blocks added at its end");
                            push_new_blocks(&mut out, rules, range, indent_of(line), eol_of(line, default_eol));
                            report.injected = rules.iter().map(|r| r.parameter.clone()).collect();
                            injected = true;
                        }
                        out.push_str(line);
                        ParState::Outside
                    }
                    KeyedLine::Entry { key: "NUMBER_OF_PARAMETERS", ref values } if !injected => {
                        let declared: i64 = values[0].parse().map_err(|_| {
                            ParseError::FormatError(format!(
                                "line {}: NUMBER_OF_PARAMETERS '{}' is not an integer",
                                line_no, values[0]
                            ))
                        })?;
                        let updated = declared + rules.len() as i64;
                        let eol = eol_of(line, default_eol);
                        out.push_str(&format!("{}NUMBER_OF_PARAMETERS\t+{}{}", indent_of(line), updated, eol));
                        push_new_blocks(&mut out, rules, range, indent_of(line), eol);

                        report.declared_before = Some(declared);
                        report.declared_after = Some(updated);
                        report.injected = rules.iter().map(|r| r.parameter.clone()).collect();
                        injected = true;
                        ParState::InUserParameters
                    }
                    _ => {
                        out.push_str(line);
                        ParState::InUserParameters
                    }
                },
                ParState::InParameter(mut block) => {
                    if keyed == KeyedLine::End("PARAMETER") && blocks.depth() + 1 == block.depth {
                        if let Some(patched) = patch_block(&mut out, &block, line, rules, default_eol)? {
                            report.patched.push(patched);
                        }
                        ParState::InUserParameters
                    } else {
                        block.lines.push(line);
                        ParState::InParameter(block)
                    }
                }
            };
        }

        blocks.finish()?;

        if !report.found_user_parameters {
            warn!("no USER_PARAMETERS block found, output is an unmodified copy");
        }
        debug!("{} block(s) injected, {} block(s) patched", report.injected.len(), report.patched.len());
        Ok((out, report))
    }
}

// Emits one buffered PARAMETER block plus its NI_END line, rewritten when a rule drives it
fn patch_block(
    out: &mut String,
    block: &PendingBlock<'_>,
    end_line: &str,
    rules: &[SubstitutionRule],
    default_eol: &str,
) -> std::result::Result<Option<(String, String)>, ParseError> {
    // Only direct entries of the block count, not those of nested blocks
    let mut depth = 0usize;
    let mut own_entries = Vec::with_capacity(block.lines.len());
    for line in block.lines.iter().skip(1) {
        let keyed = KeyedLine::classify(line);
        match keyed {
            KeyedLine::Begin(_) => depth += 1,
            KeyedLine::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        own_entries.push(if depth == 0 { keyed } else { KeyedLine::Other });
    }

    let name = own_entries.iter().find_map(|k| match k {
        KeyedLine::Entry { key: "NAME", values } => Some(values[0]),
        _ => None,
    });

    let mut matching = rules.iter().filter(|r| name.map_or(false, |n| r.matches(n)));
    let rule = match (name, matching.next()) {
        (Some(name), Some(rule)) => {
            for extra in matching {
                warn!("{} also matches rule {}, keeping {}", name, extra.parameter, rule.parameter);
            }
            rule
        }
        _ => {
            for line in &block.lines {
                out.push_str(line);
            }
            out.push_str(end_line);
            return Ok(None);
        }
    };
    let name = name.unwrap_or_default();

    let value = own_entries
        .iter()
        .find_map(|k| match k {
            KeyedLine::Entry { key: "VALUE", values } => Some(values[0]),
            _ => None,
        })
        .ok_or_else(|| ParseError::FormatError(format!("parameter {} has no VALUE", name)))?;

    let expression = |indent: &str, eol: &str| {
        format!("{}EXPRESSION\t \"{}*{}\"{}", indent, value, rule.parameter, eol)
    };

    let mut expression_written = false;
    out.push_str(block.lines[0]);
    for (line, keyed) in block.lines.iter().skip(1).zip(&own_entries) {
        match keyed {
            KeyedLine::Entry { key: "EXPRESSION", .. } => {}        // replaced below
            KeyedLine::Entry { key: "QUANTITY_TYPE", .. } => {
                out.push_str(&format!("{}QUANTITY_TYPE\tEXPRESSION{}", indent_of(line), eol_of(line, default_eol)));
            }
            KeyedLine::Entry { key: "UNCERTAIN", .. } => {
                out.push_str(line);
                let eol = eol_of(line, default_eol);
                if !line.ends_with('\n') {
                    out.push_str(eol);
                }
                out.push_str(&expression(indent_of(line), eol));
                expression_written = true;
            }
            _ => out.push_str(line),
        }
    }
    if !expression_written {
        let indent = block.lines.get(1).map(|l| indent_of(l)).unwrap_or("");
        out.push_str(&expression(indent, eol_of(end_line, default_eol)));
    }
    out.push_str(end_line);

    debug!("{} now driven by {}", name, rule.parameter);
    Ok(Some((name.to_string(), rule.parameter.clone())))
}

fn push_new_blocks(out: &mut String, rules: &[SubstitutionRule], range: &UncertainRange, indent: &str, eol: &str) {
    for rule in rules {
        let fields: [(&str, &str); 11] = [
            ("NAME", rule.parameter.as_str()),
            ("PARAMETRIC_TYPE", " DOUBLE"),
            ("LIMIT_MIN", " -1000000000"),
            ("LIMIT_MAX", " 1000000000"),
            ("VALUE", range.value.as_str()),
            ("VALUE_MIN", range.min.as_str()),
            ("VALUE_MAX", range.max.as_str()),
            ("VALUE_REF", " 1"),
            ("NB_LEVELS", " +2"),
            ("QUANTITY_TYPE", " VALUE"),
            ("UNCERTAIN", " FALSE"),
        ];
        out.push_str(&format!("{}NI_BEGIN\t PARAMETER{}", indent, eol));
        for (key, value) in fields {
            out.push_str(&format!("{}{}\t{}{}", indent, key, value, eol));
        }
        out.push_str(&format!("{}NI_END\t PARAMETER{}", indent, eol));
    }
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn eol_of<'a>(line: &str, default_eol: &'a str) -> &'a str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        default_eol
    }
}
