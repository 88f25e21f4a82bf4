// Tokenizer shared by the vendor keyed-block formats (.par parameter files,
// .his statistics histories). A block looks like
//
//     NI_BEGIN	PARAMETER
//        NAME                           HALF_THICKNESS_ROOT
//        VALUE                          0.02
//     NI_END	PARAMETER
//
// Tokens are separated by tabs and/or spaces.

use crate::error::ParseError;


#[derive(Debug, Clone, PartialEq)]
pub enum KeyedLine<'a> {
    Begin(&'a str),                             // NI_BEGIN <kind>
    End(&'a str),                               // NI_END <kind>
    Entry { key: &'a str, values: Vec<&'a str> },
    Other,                                      // Blank line or lone token
}

impl<'a> KeyedLine<'a> {
    pub fn classify(line: &'a str) -> KeyedLine<'a> {
        let mut words = line.split_whitespace();
        let key = match words.next() {
            Some(key) => key,
            None => return KeyedLine::Other,
        };
        let values: Vec<&str> = words.collect();

        match (key, values.first()) {
            ("NI_BEGIN", Some(kind)) => KeyedLine::Begin(kind),
            ("NI_END", Some(kind)) => KeyedLine::End(kind),
            (_, Some(_)) => KeyedLine::Entry { key, values },
            (_, None) => KeyedLine::Other,
        }
    }
}

/// Open blocks, innermost last, with the line each one was opened on.
#[derive(Debug, Default)]
pub struct BlockStack {
    open: Vec<(String, usize)>,
}

impl BlockStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, kind: &str, line_no: usize) -> Result<(), ParseError> {
        if let Some((_, opened_at)) = self.open.iter().find(|(k, _)| k == kind) {
            return Err(ParseError::FormatError(format!(
                "line {}: block {} opened again before the one from line {} was closed",
                line_no, kind, opened_at
            )));
        }
        self.open.push((kind.to_string(), line_no));
        Ok(())
    }

    pub fn close(&mut self, kind: &str, line_no: usize) -> Result<(), ParseError> {
        match self.open.last() {
            Some((innermost, _)) if innermost == kind => {
                self.open.pop();
                Ok(())
            }
            Some((innermost, opened_at)) => Err(ParseError::FormatError(format!(
                "line {}: NI_END {} does not close {} opened on line {}",
                line_no, kind, innermost, opened_at
            ))),
            None => Err(ParseError::FormatError(format!(
                "line {}: NI_END {} without a matching NI_BEGIN",
                line_no, kind
            ))),
        }
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Every block must be closed once the input is exhausted.
    pub fn finish(&self) -> Result<(), ParseError> {
        match self.open.last() {
            Some((kind, opened_at)) => Err(ParseError::FormatError(format!(
                "block {} opened on line {} is never closed",
                kind, opened_at
            ))),
            None => Ok(()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tab_and_space_separated_lines() {
        assert_eq!(KeyedLine::classify("NI_BEGIN\tPARAMETER\n"), KeyedLine::Begin("PARAMETER"));
        assert_eq!(KeyedLine::classify("  NI_END   PARAMETER"), KeyedLine::End("PARAMETER"));
        assert_eq!(
            KeyedLine::classify("   VALUE                0.02\r\n"),
            KeyedLine::Entry { key: "VALUE", values: vec!["0.02"] }
        );
        assert_eq!(KeyedLine::classify("\n"), KeyedLine::Other);
        assert_eq!(KeyedLine::classify("NI_BEGIN"), KeyedLine::Other);
    }

    #[test]
    fn different_kinds_nest() {
        let mut stack = BlockStack::new();
        stack.open("USER_PARAMETERS", 1).unwrap();
        stack.open("PARAMETER", 2).unwrap();
        assert_eq!(stack.depth(), 2);
        stack.close("PARAMETER", 5).unwrap();
        stack.close("USER_PARAMETERS", 6).unwrap();
        assert!(stack.finish().is_ok());
    }

    #[test]
    fn rejects_same_kind_nesting_and_stray_ends() {
        let mut stack = BlockStack::new();
        stack.open("PARAMETER", 1).unwrap();
        assert!(stack.open("PARAMETER", 2).is_err());
        assert!(stack.close("DESIGN_SAMPLE", 3).is_err());
        assert!(stack.finish().is_err());

        let mut empty = BlockStack::new();
        assert!(matches!(empty.close("PARAMETER", 1), Err(ParseError::FormatError(_))));
    }
}
