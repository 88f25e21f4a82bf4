use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::*;


// ---------------------------------------------------------------------------
// Parameter patching
// ---------------------------------------------------------------------------

/// New uncertain parameter and the existing parameter names it drives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubstitutionRule {
    pub parameter: String,              // Name of the parameter block to inject (e.g. THICKNESS)
    #[serde(default)]
    pub triggers: Vec<String>,          // Substrings matched against existing NAME fields
}

impl SubstitutionRule {
    pub fn new(parameter: &str, triggers: &[&str]) -> Self {
        Self {
            parameter: parameter.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Parses `NAME=TRIGGER1,TRIGGER2`. An empty right side injects the parameter only.
    pub fn from_cli(spec: &str) -> Result<Self> {
        let (parameter, triggers) = spec.split_once('=').unwrap_or((spec, ""));
        let parameter = parameter.trim();
        if parameter.is_empty() || parameter.contains(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "invalid rule '{}': expected NAME=TRIGGER[,TRIGGER...]",
                spec
            )));
        }
        let triggers = triggers
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { parameter: parameter.to_string(), triggers })
    }

    /// True when one of the triggers occurs inside `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.triggers.iter().any(|t| !t.is_empty() && name.contains(t.as_str()))
    }
}

/// `(value, min, max)` written verbatim into every injected parameter block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UncertainRange {
    pub value: String,
    pub min: String,
    pub max: String,
}

impl Default for UncertainRange {
    fn default() -> Self {
        Self { value: "1".to_string(), min: "0.5".to_string(), max: "1.5".to_string() }
    }
}

impl UncertainRange {
    pub fn validate(&self) -> Result<()> {
        let mut numbers = [0.0f64; 3];
        for (slot, (label, text)) in numbers
            .iter_mut()
            .zip([("value", &self.value), ("min", &self.min), ("max", &self.max)])
        {
            *slot = text.trim().parse::<f64>().map_err(|_| {
                Error::Validation(format!("range {} '{}' is not a number", label, text))
            })?;
        }
        let [value, min, max] = numbers;
        if min > max || value < min || value > max {
            return Err(Error::Validation(format!(
                "range must satisfy min <= value <= max, got value={} min={} max={}",
                self.value, self.min, self.max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statistics history (.his) and results tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignSample {
    pub values: Vec<String>,                // Raw tokens from the DESIGN_STATISTICS line
    pub simulation_path: Option<String>,    // SIMULATION_PATH of the iteration
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryData {
    pub statistic_names: Vec<String>,       // STATISTICS entries in file order
    pub samples: Vec<DesignSample>,         // One entry per DESIGN_SAMPLE block
}

impl HistoryData {
    /// Samples whose simulation path contains `marker`, in file order.
    pub fn samples_matching<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a DesignSample> + 'a {
        self.samples.iter().filter(move |s| {
            s.simulation_path.as_deref().map_or(false, |p| p.contains(marker))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantityRecord {
    pub design_id: u64,                 // Number recovered from the design directory name
    pub value: String,                  // VALUE token as written by the solver
    pub source: PathBuf,                // File the value came from
}

// ---------------------------------------------------------------------------
// Batch jobs
// ---------------------------------------------------------------------------

/// Software packages a job script can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Package {
    #[value(name = "ft")]
    FineTurbo,                          // Structured solver, runfile per computation directory
    #[value(name = "fo")]
    FineOpen,                           // Unstructured solver, runfile per computation directory
    #[value(name = "hh")]
    HexpressHybrid,                     // Mesher, flat .conf files in the project directory
}

impl Package {
    pub fn code(&self) -> &'static str {
        match self {
            Package::FineTurbo => "ft",
            Package::FineOpen => "fo",
            Package::HexpressHybrid => "hh",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Package::FineTurbo => "FINE/Turbo",
            Package::FineOpen => "FINE/Open",
            Package::HexpressHybrid => "Hexpress/Hybrid",
        }
    }

    /// Value of NUMECA_SOFT_VERSION for a given version string.
    pub fn soft_version(&self, version: &str) -> String {
        match self {
            Package::FineTurbo => version.to_string(),
            Package::FineOpen | Package::HexpressHybrid => format!("open{}", version),
        }
    }

    /// First major version using the current installation layout.
    pub fn current_layout_major(&self) -> u32 {
        match self {
            Package::FineTurbo => 12,
            Package::FineOpen | Package::HexpressHybrid => 7,
        }
    }

    /// Hexpress/Hybrid computations are flat .conf files, the solvers use directories.
    pub fn uses_flat_files(&self) -> bool {
        matches!(self, Package::HexpressHybrid)
    }

    pub fn input_extension(&self) -> &'static str {
        match self {
            Package::HexpressHybrid => "conf",
            Package::FineTurbo | Package::FineOpen => "run",
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MpiLibrary {
    #[value(name = "ompi")]
    OpenMpi,
    #[value(name = "impi")]
    IntelMpi,
}

impl fmt::Display for MpiLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpiLibrary::OpenMpi => f.write_str("OpenMPI"),
            MpiLibrary::IntelMpi => f.write_str("IntelMPI"),
        }
    }
}

/// Installation layout generation selected from the major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathGeneration {
    Legacy,
    Current,
}

// <digits><word chars><digits>, e.g. 121b10 or the patch form 112_2.
// The first char after the leading digits must not be a digit, otherwise
// 112rc would split as 1|1|2.
static ALPHA_BETA_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)[A-Za-z_]\w*?([0-9]+)").expect("valid alpha/beta version pattern")
});

// <digits><letters>, e.g. 112rc
static RELEASE_CANDIDATE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)([a-zA-Z]+)").expect("valid release candidate pattern")
});

/// Version string as typed by the user together with its major number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareVersion {
    pub raw: String,
    pub major: u32,
}

impl SoftwareVersion {
    pub fn parse(version: &str) -> std::result::Result<SoftwareVersion, JobError> {
        let raw = version.trim();
        if raw.is_empty() {
            return Err(JobError::Validation("no version entered".to_string()));
        }

        let major = if let Ok(value) = raw.parse::<f64>() {
            if !value.is_finite() || value < 0.0 {
                return Err(JobError::Validation(format!("invalid version '{}'", raw)));
            }
            (value / 10.0) as u32
        } else {
            let captures = ALPHA_BETA_VERSION
                .captures(raw)
                .or_else(|| RELEASE_CANDIDATE_VERSION.captures(raw))
                .ok_or_else(|| JobError::Validation(format!(
                    "unrecognised version '{}' (expected e.g. 112, 121b10 or 112rc)",
                    raw
                )))?;
            let leading: u64 = captures[1]
                .parse()
                .map_err(|_| JobError::Validation(format!("invalid version '{}'", raw)))?;
            u32::try_from(leading / 10)
                .map_err(|_| JobError::Validation(format!("version '{}' is out of range", raw)))?
        };

        Ok(SoftwareVersion { raw: raw.to_string(), major })
    }

    pub fn generation(&self, package: Package) -> PathGeneration {
        if self.major >= package.current_layout_major() {
            PathGeneration::Current
        } else {
            PathGeneration::Legacy
        }
    }
}

/// Fixed integer/real memory sizes passed to the FINE/Turbo partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySettings {
    pub nbint: u64,
    pub nbreal: u64,
}

/// One computation selected for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputationDescriptor {
    pub name: String,                       // Computation directory name, or .conf file name
    pub project_dir: PathBuf,               // Directory the computation was discovered in
    pub input_file: PathBuf,                // Runfile (ft/fo) or .conf file (hh)
    pub cores: u32,                         // Parallel environment size requested from the queue
    pub memory: Option<MemorySettings>,     // FINE/Turbo partitioner memory, None lets the solver decide
    pub parallel_partition: bool,           // FINE/Turbo parallel partitioner (-partition), else -parallel
}

impl ComputationDescriptor {
    /// Directory holding the runfile and steering file.
    pub fn work_dir(&self) -> PathBuf {
        self.project_dir.join(&self.name)
    }

    /// Path prefix shared by the runfile, steering file and log.
    pub fn file_stem_path(&self, package: Package) -> PathBuf {
        if package.uses_flat_files() {
            self.project_dir.join(&self.name)
        } else {
            self.work_dir().join(&self.name)
        }
    }
}

/// A generated scheduler script waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct JobScript {
    pub computation: String,
    pub path: PathBuf,
    pub contents: String,
}

// ---------------------------------------------------------------------------
// Structure mode files and modal displacement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ModeFileHeader {
    pub dimension: usize,               // 2 or 3 spatial components
    pub num_modes: usize,               // Number of mode shapes stored per node
    pub num_nodes: usize,               // Number of structural nodes
    pub initial_deformation: bool,      // Rows carry an initial deformation block after the coordinates
}

#[derive(Debug, Clone)]
pub struct ModeShapeData {
    pub header: ModeFileHeader,
    pub eigenfrequencies: Vec<f64>,
    pub coordinates: Vec<Vec<f64>>,     // One entry per node, `dimension` values
    pub mode_shapes: Vec<Vec<f64>>,     // One entry per node, `dimension * num_modes` values
}

impl ModeShapeData {
    /// Shape components of `mode` at `node`.
    pub fn mode_at(&self, node: usize, mode: usize) -> &[f64] {
        let dim = self.header.dimension;
        &self.mode_shapes[node][mode * dim..(mode + 1) * dim]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDisplacement {
    pub cartesian: [f64; 3],            // dx, dy, dz (dz = 0 in 2D)
    pub radial: f64,
    pub theta: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementMaxima {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,                 // Only reported for 3D files
    pub radial: f64,
    pub theta: f64,
    pub magnitude: f64,
    pub magnitude_node: usize,          // Node index where the magnitude peaks
}

#[derive(Debug, Clone)]
pub struct DisplacementField {
    pub dimension: usize,
    pub nodes: Vec<NodeDisplacement>,
    pub maxima: DisplacementMaxima,
}

// ---------------------------------------------------------------------------
// Interblade phase angles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct IbpaAngle {
    pub radians: f64,
    pub degrees: f64,                   // Rounded to the nearest integer degree
    pub computation_name: Option<String>,
}

/// Returns `path` when it exists as a file, `MissingInputFile` otherwise.
pub fn require_file(path: &Path) -> std::result::Result<&Path, ParseError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ParseError::MissingInputFile(path.to_path_buf()))
    }
}
