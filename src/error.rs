use std::io;                       // Import I/O module for error handling
use std::path::PathBuf;

use thiserror::Error;


#[derive(Debug, Error)]
pub enum ParseError {                                   // Errors raised while reading vendor text files
    #[error("input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),                          // Source file absent, nothing has been written yet
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),                         // File I/O errors (e.g., permission denied)
    #[error("format error: {0}")]
    FormatError(String),                                // Malformed data, unexpected block structure
    #[error("number parse error: {0}")]
    NumberParseError(String),                           // Failed number conversions (invalid float/int strings)
}

// Implement automatic conversion from float parsing errors
// This allows us to use ? when parsing floating point numbers
impl From<std::num::ParseFloatError> for ParseError {
    fn from(err: std::num::ParseFloatError) -> Self {
        ParseError::NumberParseError(format!("Float parse error: {}", err))
    }
}

// Implement automatic conversion from integer parsing errors
// This allows us to use ? when parsing integers
impl From<std::num::ParseIntError> for ParseError {
    fn from(err: std::num::ParseIntError) -> Self {
        ParseError::NumberParseError(format!("Int parse error: {}", err))
    }
}

// Writer errors for output operations
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("VTK error: {0}")]
    VtkError(#[from] vtkio::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Failures of a spawned external program (mesh tool, visualization tool, scheduler).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not start `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("`{tool}` exited with {status}")]
    ExitStatus { tool: String, status: String },
}

// Job-script generation errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(String),                                 // Bad user input (version, cores, package options)
    #[error("computation(s) not found in {}: {}", .project.display(), .names.join(", "))]
    ComputationsNotFound { project: PathBuf, names: Vec<String> },
    #[error("no computation found in {}", .0.display())]
    NoComputations(PathBuf),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Crate-level error, one variant per concern.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Parse(ParseError::IoError(err))
    }
}
