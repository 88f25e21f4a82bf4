use std::fs;
use std::path::Path;

use fineflow::config::RunConfig;
use fineflow::error::JobError;
use fineflow::sge::{launch, prepare_scripts, JobRequest};
use fineflow::structs_and_impls::{MemorySettings, MpiLibrary, Package};

fn solver_project(root: &Path, names: &[&str]) {
    for name in names {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.run", name)), "").unwrap();
    }
}

fn request(project: &Path, package: Package) -> JobRequest {
    JobRequest {
        project: project.to_path_buf(),
        package,
        version: "121".to_string(),
        cores: Some(48),
        mpi: MpiLibrary::OpenMpi,
        memory: None,
        parallel_partition: false,
        computations: Vec::new(),
        submit: false,
    }
}

#[test]
fn one_script_per_computation() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["rotor", "stator"]);

    let summary = launch(&request(dir.path(), Package::FineTurbo), &RunConfig::default()).unwrap();

    assert_eq!(summary.scripts.len(), 2);
    assert_eq!(summary.submitted, 0);
    for (index, name) in ["rotor", "stator"].iter().enumerate() {
        let path = dir.path().join("SGE_Scripts").join(format!("launch_{}.sge", name));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(&format!("#$ -N FT_{}\n", index)));
        assert_eq!(text.matches("mpirun").count(), 1);
        let root = fs::canonicalize(dir.path()).unwrap();
        assert!(text.contains(&format!("RUNFILE={}.run", root.join(name).join(name).display())));
        assert!(text.contains("BIN=${NUMECA_BIN}/euranus/euranusTurbodpx86_64_ompi_icc\n"));
    }
}

#[test]
fn turbo_partitioner_options() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["rotor"]);
    let mut req = request(dir.path(), Package::FineTurbo);
    req.memory = Some(MemorySettings { nbint: 50, nbreal: 80 });

    let scripts = prepare_scripts(&req, &RunConfig::default()).unwrap();
    assert!(scripts[0].contents.contains("-parallel -computation $RUNFILE -nproc $NB_BALANCE -nbint 50 -nbreal 80\n"));
    assert!(scripts[0].contents.contains("NB_BALANCE=`expr $NSLOTS - 1`"));
}

#[test]
fn hexpress_scripts_have_no_mpirun() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blade.conf"), "").unwrap();
    let mut req = request(dir.path(), Package::HexpressHybrid);
    req.version = "71".to_string();
    req.mpi = MpiLibrary::IntelMpi;
    req.cores = None;

    let scripts = prepare_scripts(&req, &RunConfig::default()).unwrap();
    assert_eq!(scripts.len(), 1);
    let text = &scripts[0].contents;
    assert!(!text.contains("mpirun"));
    assert!(text.contains("#$ -pe orte 24\n"));
    assert!(text.contains("OPENMPI Library Settings"));
    assert!(text.contains("NUMECA_SOFT_VERSION=open71\n"));
    assert!(scripts[0].path.ends_with("SGE_Scripts/launch_blade.conf.sge"));
}

#[test]
fn open_scripts_always_have_mpirun() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["duct"]);
    for mpi in [MpiLibrary::OpenMpi, MpiLibrary::IntelMpi] {
        for version in ["62", "71"] {
            let mut req = request(dir.path(), Package::FineOpen);
            req.mpi = mpi;
            req.version = version.to_string();
            let scripts = prepare_scripts(&req, &RunConfig::default()).unwrap();
            assert_eq!(scripts[0].contents.matches("/mpirun -np $NSLOTS").count(), 1);
            assert!(!scripts[0].contents.contains("NB_BALANCE"));
        }
    }
}

#[test]
fn unknown_computation_aborts_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["rotor"]);
    let mut req = request(dir.path(), Package::FineTurbo);
    req.computations = vec!["rotor".to_string(), "stage2".to_string()];

    let result = launch(&req, &RunConfig::default());
    match result {
        Err(JobError::ComputationsNotFound { names, .. }) => assert_eq!(names, vec!["stage2"]),
        other => panic!("unexpected {:?}", other.map(|s| s.scripts.len())),
    }
    assert!(!dir.path().join("SGE_Scripts").exists());
}

#[test]
fn bad_core_count_and_version_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["rotor"]);

    let mut req = request(dir.path(), Package::FineTurbo);
    req.cores = Some(36);
    assert!(matches!(prepare_scripts(&req, &RunConfig::default()), Err(JobError::Validation(_))));

    let mut req = request(dir.path(), Package::FineTurbo);
    req.version = "fine121".to_string();
    assert!(matches!(prepare_scripts(&req, &RunConfig::default()), Err(JobError::Validation(_))));
}

#[cfg(unix)]
#[test]
fn failed_submissions_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    solver_project(dir.path(), &["rotor", "stator"]);
    let mut config = RunConfig::default();
    config.scheduler.submit_command = "false".to_string();
    let mut req = request(dir.path(), Package::FineOpen);
    req.submit = true;

    let summary = launch(&req, &config).unwrap();
    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.failed_submissions, vec!["rotor", "stator"]);
}

#[cfg(unix)]
#[test]
fn relative_project_gives_absolute_script_paths() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let dir = tempfile::tempdir_in(manifest).unwrap();
    solver_project(dir.path(), &["rotor"]);
    let relative = dir.path().strip_prefix(manifest).unwrap().to_path_buf();
    assert!(relative.is_relative());

    let mut config = RunConfig::default();
    config.scheduler.submit_command = "ls".to_string();
    let mut req = request(&relative, Package::FineTurbo);
    req.submit = true;

    let summary = launch(&req, &config).unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let script = &summary.scripts[0];
    assert!(script.path.is_absolute());
    assert!(script.contents.contains(&format!("RUNFILE={}\n", root.join("rotor").join("rotor.run").display())));
    assert!(script.contents.contains(&format!("#$ -o {} -j y\n", root.join("rotor").join("rotor.std").display())));
    assert_eq!(summary.submitted, 1);
    assert!(summary.failed_submissions.is_empty());
}
