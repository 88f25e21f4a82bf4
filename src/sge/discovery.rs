use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{JobError, ParseError};
use crate::structs_and_impls::*;


fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Computations available in `project`, sorted by name.
///
/// FINE/Turbo and FINE/Open: subdirectories holding at least one `.run` file.
/// Hexpress/Hybrid: `.conf` files directly inside the project.
pub fn discover(project: &Path, package: Package) -> Result<Vec<String>, JobError> {
    if !project.is_dir() {
        return Err(ParseError::MissingInputFile(project.to_path_buf()).into());
    }
    let extension = package.input_extension();
    let mut found = Vec::new();

    for entry in WalkDir::new(project).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| JobError::Validation(format!("cannot scan {}: {}", project.display(), e)))?;
        let name = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => continue,
        };

        let is_computation = if package.uses_flat_files() {
            entry.file_type().is_file() && has_extension(entry.path(), extension)
        } else {
            entry.file_type().is_dir()
                && WalkDir::new(entry.path())
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_type().is_file() && has_extension(e.path(), extension))
        };
        if is_computation {
            found.push(name);
        }
    }

    debug!("{} {} computation(s) in {}", found.len(), package, project.display());
    Ok(found)
}

/// Resolves the requested names (all discovered ones when empty) into descriptors.
/// Every missing name is reported at once and nothing is returned in that case.
pub fn select_computations(
    project: &Path,
    package: Package,
    requested: &[String],
    cores: u32,
    memory: Option<MemorySettings>,
    parallel_partition: bool,
) -> Result<Vec<ComputationDescriptor>, JobError> {
    let discovered = discover(project, package)?;

    if package.uses_flat_files() {
        let not_conf: Vec<&str> = requested
            .iter()
            .filter(|n| !n.ends_with(".conf"))
            .map(|n| n.as_str())
            .collect();
        if !not_conf.is_empty() {
            return Err(JobError::Validation(format!(
                "Hexpress/Hybrid computations are given as .conf file names: {}",
                not_conf.join(", ")
            )));
        }
    }

    let names: Vec<String> = if requested.is_empty() { discovered.clone() } else { requested.to_vec() };
    if names.is_empty() {
        return Err(JobError::NoComputations(project.to_path_buf()));
    }

    let mut missing = Vec::new();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let input_file = if package.uses_flat_files() {
            project.join(&name)
        } else {
            project.join(&name).join(format!("{}.run", name))
        };
        if !discovered.contains(&name) || !input_file.is_file() {
            missing.push(name);
            continue;
        }
        selected.push(ComputationDescriptor {
            name,
            project_dir: project.to_path_buf(),
            input_file,
            cores,
            memory: if package == Package::FineTurbo { memory } else { None },
            parallel_partition: package == Package::FineTurbo && parallel_partition,
        });
    }

    if !missing.is_empty() {
        return Err(JobError::ComputationsNotFound { project: project.to_path_buf(), names: missing });
    }
    Ok(selected)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["rotor", "stator"] {
            fs::create_dir(dir.path().join(name)).unwrap();
            fs::write(dir.path().join(name).join(format!("{}.run", name)), "").unwrap();
        }
        fs::create_dir(dir.path().join("_mesh")).unwrap();
        fs::write(dir.path().join("_mesh").join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("blade.conf"), "").unwrap();
        dir
    }

    #[test]
    fn finds_run_directories_and_conf_files() {
        let dir = project();
        assert_eq!(discover(dir.path(), Package::FineTurbo).unwrap(), vec!["rotor", "stator"]);
        assert_eq!(discover(dir.path(), Package::HexpressHybrid).unwrap(), vec!["blade.conf"]);
    }

    #[test]
    fn missing_names_are_all_reported() {
        let dir = project();
        let requested = vec!["rotor".to_string(), "diffuser".to_string(), "_mesh".to_string()];
        match select_computations(dir.path(), Package::FineOpen, &requested, 24, None, false) {
            Err(JobError::ComputationsNotFound { names, .. }) => assert_eq!(names, vec!["diffuser", "_mesh"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn memory_settings_only_reach_turbo() {
        let dir = project();
        let memory = Some(MemorySettings { nbint: 1, nbreal: 2 });
        let turbo = select_computations(dir.path(), Package::FineTurbo, &[], 24, memory, true).unwrap();
        assert_eq!(turbo.len(), 2);
        assert_eq!(turbo[0].memory, memory);
        assert!(turbo[0].parallel_partition);
        let open = select_computations(dir.path(), Package::FineOpen, &[], 24, memory, true).unwrap();
        assert_eq!(open[0].memory, None);
        assert!(!open[0].parallel_partition);
    }

    #[test]
    fn empty_project_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            select_computations(dir.path(), Package::FineTurbo, &[], 24, None, false),
            Err(JobError::NoComputations(_))
        ));
    }
}
