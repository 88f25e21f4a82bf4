//! Run configuration: built-in defaults, overridden by an optional TOML file,
//! overridden again by command-line flags in `main`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::structs_and_impls::{SubstitutionRule, UncertainRange};


/// Vendor installation layout written into every job script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub versions_dir: String,           // NI_VERSIONS_DIR
    pub tmp_dir: String,                // TMP_DIR
    pub license_file: String,           // NUMECA_LICENSE_FILE, may reference ${NI_VERSIONS_DIR}
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            versions_dir: "/home/SHARED/numeca_software".to_string(),
            tmp_dir: "~/.numeca/tmp/".to_string(),
            license_file: "${NI_VERSIONS_DIR}/COMMON/license.dat".to_string(),
        }
    }
}

/// MPI installation roots, one per path generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MpiConfig {
    pub intel_root_current: String,
    pub intel_root_legacy: String,
    pub openmpi_home_current: String,
    pub openmpi_home_legacy: String,
    pub intel_fabrics: String,          // ofa = Infiniband, tcp = ethernet
}

impl Default for MpiConfig {
    fn default() -> Self {
        Self {
            intel_root_current: "/XF/Mpi/Intelmpi/2017.3-196/Installed/impi/2017.3.196".to_string(),
            intel_root_legacy: "$NUMECA_BIN/_mpi/_impi5.0.3/intel64".to_string(),
            openmpi_home_current: "/XF/Mpi/Openmpi/1.10.4.gcc-4.8.5/Installed/".to_string(),
            openmpi_home_legacy: "/XF/Mpi/Openmpi/1.6.5/Installed/".to_string(),
            intel_fabrics: "ofa".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub queue: String,
    pub parallel_environment: String,
    pub core_multiple: u32,             // Cores must be a positive multiple of this
    pub hexpress_cores: u32,            // Fixed core count for Hexpress/Hybrid jobs
    pub submit_command: String,
    pub script_dir: String,             // Created inside the project directory
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue: "compute.q".to_string(),
            parallel_environment: "orte".to_string(),
            core_multiple: 24,
            hexpress_cores: 24,
            submit_command: "qsub".to_string(),
            script_dir: "SGE_Scripts".to_string(),
        }
    }
}

/// External executables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub igg: String,
    pub cfview: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { igg: "igg111".to_string(), cfview: "cfview111".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub rules: Vec<SubstitutionRule>,
    pub range: UncertainRange,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                SubstitutionRule::new("THICKNESS", &["HALF_THICKNESS"]),
                SubstitutionRule::new("GAP_UNCERTAINTY", &["SHROUD_GAP_WIDTH"]),
                SubstitutionRule::new("OPERATIONAL_MULTI", &[]),
            ],
            range: UncertainRange::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub marker: String,                 // `_design_` for optimizations, `_flow_` for databases
    pub quantities: Vec<String>,
    pub sort: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            marker: "_design_".to_string(),
            quantities: ["choke_mass_flow", "stall_efficiency", "stall_pressure_ratio", "static.fea_stress_max_vm"]
                .iter()
                .map(|q| q.to_string())
                .collect(),
            sort: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MomentsConfig {
    pub marker: String,
    pub output: PathBuf,
}

impl Default for MomentsConfig {
    fn default() -> Self {
        Self { marker: "_design_".to_string(), output: PathBuf::from("moments_global.dat") }
    }
}

/// Everything a subcommand needs besides its positional inputs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub install: InstallConfig,
    pub mpi: MpiConfig,
    pub scheduler: SchedulerConfig,
    pub tools: ToolsConfig,
    pub patch: PatchConfig,
    pub results: ResultsConfig,
    pub moments: MomentsConfig,
}

impl RunConfig {
    /// Defaults when `path` is `None`, otherwise the TOML file layered over the defaults.
    pub fn load(path: Option<&Path>) -> Result<RunConfig, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!("loaded configuration from {}", path.display());
                RunConfig::from_toml(&text)?
            }
            None => RunConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<RunConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.core_multiple == 0 {
            return Err(ConfigError::Invalid("scheduler.core_multiple must be positive".to_string()));
        }
        if self.scheduler.hexpress_cores == 0 {
            return Err(ConfigError::Invalid("scheduler.hexpress_cores must be positive".to_string()));
        }
        if self.scheduler.submit_command.trim().is_empty() {
            return Err(ConfigError::Invalid("scheduler.submit_command is empty".to_string()));
        }
        if self.results.marker.is_empty() || self.moments.marker.is_empty() {
            return Err(ConfigError::Invalid("design markers must not be empty".to_string()));
        }
        for rule in &self.patch.rules {
            if rule.parameter.trim().is_empty() {
                return Err(ConfigError::Invalid("patch rule with an empty parameter name".to_string()));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cluster_layout() {
        let config = RunConfig::default();
        assert_eq!(config.scheduler.queue, "compute.q");
        assert_eq!(config.scheduler.core_multiple, 24);
        assert_eq!(config.install.versions_dir, "/home/SHARED/numeca_software");
        assert_eq!(config.patch.rules.len(), 3);
        assert_eq!(config.patch.rules[0].parameter, "THICKNESS");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = RunConfig::from_toml(
            r#"
            [scheduler]
            queue = "short.q"

            [[patch.rules]]
            parameter = "TIP_GAP"
            triggers = ["TIP_CLEARANCE", "GAP"]
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.queue, "short.q");
        assert_eq!(config.scheduler.parallel_environment, "orte");
        assert_eq!(config.patch.rules, vec![SubstitutionRule::new("TIP_GAP", &["TIP_CLEARANCE", "GAP"])]);
        assert_eq!(config.patch.range, UncertainRange::default());
        assert_eq!(config.tools.cfview, "cfview111");
    }

    #[test]
    fn zero_core_multiple_is_rejected() {
        let config = RunConfig::from_toml("[scheduler]\ncore_multiple = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
