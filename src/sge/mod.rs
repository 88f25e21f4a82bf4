//! SGE job generation: validate the request, discover computations, render every
//! script in memory, write them, then optionally submit them one by one.

pub mod discovery;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::{JobError, ParseError, WriterError};
use crate::external::run_tool;
use crate::structs_and_impls::*;
use crate::writer::sge_writer::{JobSettings, SgeWriter};


/// User choices for one `sge` run.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub project: PathBuf,
    pub package: Package,
    pub version: String,
    pub cores: Option<u32>,                 // Required for ft/fo, hh uses the configured count
    pub mpi: MpiLibrary,
    pub memory: Option<MemorySettings>,     // FINE/Turbo only
    pub parallel_partition: bool,           // FINE/Turbo only
    pub computations: Vec<String>,          // Empty selects every discovered computation
    pub submit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchSummary {
    pub scripts: Vec<JobScript>,
    pub submitted: usize,
    pub failed_submissions: Vec<String>,
}

/// Cores to request, checked against the configured multiple.
pub fn resolve_cores(package: Package, cores: Option<u32>, config: &RunConfig) -> Result<u32, JobError> {
    let scheduler = &config.scheduler;
    if package == Package::HexpressHybrid {
        if let Some(requested) = cores.filter(|&c| c != scheduler.hexpress_cores) {
            warn!("Hexpress/Hybrid runs on {} cores, ignoring --cores {}", scheduler.hexpress_cores, requested);
        }
        return Ok(scheduler.hexpress_cores);
    }

    let cores = cores.ok_or_else(|| JobError::Validation(format!("{} jobs need a core count", package)))?;
    if cores == 0 || cores % scheduler.core_multiple != 0 {
        return Err(JobError::Validation(format!(
            "number of cores {} is not a positive multiple of {}",
            cores, scheduler.core_multiple
        )));
    }
    Ok(cores)
}

/// Absolute project directory. Script paths must not depend on the job's working directory.
pub fn project_root(project: &Path) -> Result<PathBuf, JobError> {
    fs::canonicalize(project).map_err(|_| JobError::from(ParseError::MissingInputFile(project.to_path_buf())))
}

/// Renders one script per selected computation without touching the disk.
pub fn prepare_scripts(request: &JobRequest, config: &RunConfig) -> Result<Vec<JobScript>, JobError> {
    let project = project_root(&request.project)?;
    let version = SoftwareVersion::parse(&request.version)?;
    let cores = resolve_cores(request.package, request.cores, config)?;

    let mpi = match (request.package, request.mpi) {
        (Package::HexpressHybrid, MpiLibrary::IntelMpi) => {
            warn!("Hexpress/Hybrid always runs with OpenMPI, ignoring IntelMPI");
            MpiLibrary::OpenMpi
        }
        (_, mpi) => mpi,
    };
    if request.package != Package::FineTurbo && (request.memory.is_some() || request.parallel_partition) {
        warn!("memory settings and the parallel partitioner only apply to FINE/Turbo, ignored");
    }

    let computations = discovery::select_computations(
        &project,
        request.package,
        &request.computations,
        cores,
        request.memory,
        request.parallel_partition,
    )?;

    let settings = JobSettings {
        package: request.package,
        mpi,
        version,
        install: &config.install,
        mpi_paths: &config.mpi,
        scheduler: &config.scheduler,
    };
    info!(
        "{} {} (major {}, {:?} layout), {}, {} cores",
        request.package,
        settings.version.raw,
        settings.version.major,
        settings.generation(),
        mpi,
        cores
    );

    let script_dir = project.join(&config.scheduler.script_dir);
    Ok(computations
        .iter()
        .enumerate()
        .map(|(index, computation)| JobScript {
            computation: computation.name.clone(),
            path: script_dir.join(format!("launch_{}.sge", computation.name)),
            contents: SgeWriter::build_script(&settings, computation, index),
        })
        .collect())
}

fn write_scripts(scripts: &[JobScript], script_dir: &Path) -> Result<(), WriterError> {
    if script_dir.is_dir() {
        info!("SGE script directory {} exists", script_dir.display());
    } else {
        info!("creating SGE script directory {}", script_dir.display());
        fs::create_dir_all(script_dir)?;
    }
    for script in scripts {
        fs::write(&script.path, &script.contents)?;
        info!("wrote {}", script.path.display());
    }
    Ok(())
}

/// Whole `sge` subcommand.
pub fn launch(request: &JobRequest, config: &RunConfig) -> Result<LaunchSummary, JobError> {
    let scripts = prepare_scripts(request, config)?;
    let script_dir = project_root(&request.project)?.join(&config.scheduler.script_dir);
    write_scripts(&scripts, &script_dir)?;

    let mut summary = LaunchSummary { scripts, ..Default::default() };
    if !request.submit {
        return Ok(summary);
    }

    let submit = &config.scheduler.submit_command;
    for script in &summary.scripts {
        info!("launching computation {}", script.computation);
        let path = script.path.to_string_lossy();
        match run_tool(submit, &[path.as_ref()], Some(&script_dir)) {
            Ok(()) => summary.submitted += 1,
            Err(err) => {
                warn!("submission of {} failed: {}", script.computation, err);
                summary.failed_submissions.push(script.computation.clone());
            }
        }
    }
    Ok(summary)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cores_must_be_multiple_of_configured_step() {
        let config = RunConfig::default();
        assert_eq!(resolve_cores(Package::FineTurbo, Some(48), &config).unwrap(), 48);
        assert!(resolve_cores(Package::FineTurbo, Some(30), &config).is_err());
        assert!(resolve_cores(Package::FineOpen, Some(0), &config).is_err());
        assert!(resolve_cores(Package::FineOpen, None, &config).is_err());
        assert_eq!(resolve_cores(Package::HexpressHybrid, Some(96), &config).unwrap(), 24);
    }

    #[test]
    fn missing_project_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = project_root(&dir.path().join("absent"));
        assert!(matches!(result, Err(JobError::Parse(ParseError::MissingInputFile(_)))));
    }
}
