use crate::config::{InstallConfig, MpiConfig, SchedulerConfig};
use crate::structs_and_impls::*;


const RULE: &str = "#########################################################################";

// Vendor runtime libraries appended after the MPI library directory
const VENDOR_LIBS: &str = "${NUMECA_BIN}/_lib_sicc15 ${NUMECA_BIN}/_lib_sx86_64 ${NUMECA_BIN}/_lib_sx86_64dtk ${NUMECA_BIN}/install/flex64";

/// Script sections, always emitted in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStage {
    Header,
    MpiSettings,
    LibraryPaths,
    ComputationCommand,
}

impl ScriptStage {
    pub const ORDER: [ScriptStage; 4] = [
        ScriptStage::Header,
        ScriptStage::MpiSettings,
        ScriptStage::LibraryPaths,
        ScriptStage::ComputationCommand,
    ];
}

/// Everything shared by the scripts of one run.
#[derive(Debug, Clone)]
pub struct JobSettings<'a> {
    pub package: Package,
    pub mpi: MpiLibrary,
    pub version: SoftwareVersion,
    pub install: &'a InstallConfig,
    pub mpi_paths: &'a MpiConfig,
    pub scheduler: &'a SchedulerConfig,
}

impl JobSettings<'_> {
    pub fn generation(&self) -> PathGeneration {
        self.version.generation(self.package)
    }
}

pub struct SgeWriter;  // Renders SGE job scripts for FINE/Turbo, FINE/Open and Hexpress/Hybrid

impl SgeWriter {
    /// Full script text for the computation at position `index` of the run.
    pub fn build_script(settings: &JobSettings<'_>, computation: &ComputationDescriptor, index: usize) -> String {
        let mut script = String::with_capacity(4096);
        for stage in ScriptStage::ORDER {
            match stage {
                ScriptStage::Header => write_header(&mut script, settings, computation, index),
                ScriptStage::MpiSettings => write_mpi_settings(&mut script, settings),
                ScriptStage::LibraryPaths => write_library_paths(&mut script, settings),
                ScriptStage::ComputationCommand => write_computation(&mut script, settings, computation),
            }
        }
        script
    }
}

fn banner(script: &mut String, title: &str) {
    script.push_str(&format!("{}\n", RULE));
    script.push_str(&format!("{:<width$}#\n", format!("# {}", title), width = RULE.len() - 1));
    script.push_str(&format!("{}\n", RULE));
    script.push('\n');
}

fn export(script: &mut String, name: &str, value: &str) {
    script.push_str(&format!("{}={}\nexport {}\n\n", name, value, name));
}

fn write_header(script: &mut String, settings: &JobSettings<'_>, computation: &ComputationDescriptor, index: usize) {
    let scheduler = settings.scheduler;
    let log = computation.file_stem_path(settings.package);

    script.push_str("#!/bin/sh\n");
    script.push_str("#$ -S /bin/sh\n");
    script.push_str("#$ -notify\n");
    script.push_str(&format!("#$ -q {}\n", scheduler.queue));
    script.push_str(&format!("#$ -pe {} {}\n", scheduler.parallel_environment, computation.cores));
    script.push_str("#$ -l exclusive=1\n");
    script.push_str(&format!("#$ -N {}_{}\n", settings.package.code().to_uppercase(), index));
    script.push_str(&format!("#$ -o {}.std -j y\n", log.display()));
    script.push('\n');

    banner(script, "NUMECA Settings");
    export(script, "NI_VERSIONS_DIR", &settings.install.versions_dir);
    export(script, "NUMECA_SOFT_VERSION", &settings.package.soft_version(&settings.version.raw));
    export(script, "NUMECA_DIR", "${NI_VERSIONS_DIR}/fine${NUMECA_SOFT_VERSION}");
    export(script, "NUMECA_BIN", "${NUMECA_DIR}/LINUX");
    export(script, "PATH", "/usr/bin:${PATH}:${NI_VERSIONS_DIR}/bin");
    export(script, "TMP_DIR", &settings.install.tmp_dir);
    script.push_str(&format!("export NUMECA_LICENSE_FILE={}\n", settings.install.license_file));
    script.push('\n');
}

fn write_mpi_settings(script: &mut String, settings: &JobSettings<'_>) {
    let current = settings.generation() == PathGeneration::Current;
    let paths = settings.mpi_paths;

    match settings.mpi {
        MpiLibrary::IntelMpi => {
            banner(script, "INTELMPI Library Settings");
            if current {
                export(script, "I_MPI_ROOT", &paths.intel_root_current);
                script.push_str("source $I_MPI_ROOT/bin64/mpivars.sh\n");
            } else {
                export(script, "I_MPI_ROOT", &paths.intel_root_legacy);
                script.push_str("source $I_MPI_ROOT/bin/mpivars.sh\n");
            }
            script.push_str("# IntelMPI allows support for different interconnects\n");
            script.push_str("# tcp = standard ethernet\n");
            script.push_str("# ofa = Infiniband\n");
            script.push_str("# I_MPI_FABRICS=tcp\n\n");
            export(script, "I_MPI_FABRICS", &paths.intel_fabrics);
            script.push_str("export I_MPI_MPIRUN_CLEANUP=1\n\n");

            match settings.package {
                Package::FineTurbo => script.push_str("BIN=$NUMECA_DIR/LINUX/euranus/euranusTurbodpx86_64_impi_icc\n\n"),
                _ => script.push_str("BIN=$NUMECA_DIR/LINUX/hexa/hexstreamdpx86_64_impi_icc\n\n"),
            }
        }
        MpiLibrary::OpenMpi => {
            banner(script, "OPENMPI Library Settings");
            let home = if current { &paths.openmpi_home_current } else { &paths.openmpi_home_legacy };
            export(script, "MPIR_HOME", home);
            script.push_str("export OPAL_PREFIX=$MPIR_HOME\n");
            script.push_str("ompi_options=\n");

            match (settings.package, current) {
                (Package::FineTurbo, true) => script.push_str("BIN=${NUMECA_BIN}/euranus/euranusTurbodpx86_64_ompi_icc\n\n"),
                (Package::FineTurbo, false) => script.push_str("BIN=${NUMECA_BIN}/euranus/euranusTurbodpx86_64_ompi\n\n"),
                (Package::FineOpen, _) => script.push_str("BIN=${NUMECA_BIN}/hexa/hexstreamdpx86_64_ompi\n\n"),
                (Package::HexpressHybrid, _) => {
                    script.push_str("export BIN=${NUMECA_BIN}/hexpress/hexpresshybridx86_64\n\n");
                    script.push_str("unset OMP_NUM_THREADS\n");
                }
            }
        }
    }
}

// Prepends each item of `list_var` to `target` unless it is already there
fn dedupe_loop(script: &mut String, list_var: &str, target: &str) {
    script.push_str(&format!("for item in ${{{}}} ; do\n", list_var));
    script.push_str(&format!("\tif [ -n \"${}\" ] ; then\n", target));
    script.push_str(&format!("\t\tfound=`echo :${{{}}}: | grep :${{item}}:`\n", target));
    script.push_str("\t\tif [ \"X$found\" == \"X\" ] ; then\n");
    script.push_str(&format!("\t\t\t{}=\"${{item}}:${{{}}}\"\n", target, target));
    script.push_str("\t\tfi\n");
    script.push_str("\telse\n");
    script.push_str(&format!("\t\t{}=${{item}}\n", target));
    script.push_str("\tfi\n");
    script.push_str("done\n");
    script.push_str(&format!("export {}\n", target));
}

fn write_library_paths(script: &mut String, settings: &JobSettings<'_>) {
    let current = settings.generation() == PathGeneration::Current;

    script.push_str(&format!("{}\n", RULE));
    script.push_str("# PATH - LD_LIBRARY_PATH\n");
    script.push_str(&format!("{}\n\n\n", RULE));

    let (pathlist, mpi_lib) = match (settings.mpi, current) {
        (MpiLibrary::IntelMpi, true) => ("${I_MPI_ROOT}/bin64", "${I_MPI_ROOT}/lib64"),
        (MpiLibrary::IntelMpi, false) => ("${I_MPI_ROOT}/bin", "${I_MPI_ROOT}/lib"),
        (MpiLibrary::OpenMpi, _) => ("${MPIR_HOME}/bin ${NI_VERSIONS_DIR}/bin", "${MPIR_HOME}/lib"),
    };

    script.push_str(&format!("pathlist=\"{}\"\n", pathlist));
    dedupe_loop(script, "pathlist", "PATH");
    script.push_str(&format!("libpath=\"{} {}\"\n\n", mpi_lib, VENDOR_LIBS));
    dedupe_loop(script, "libpath", "LD_LIBRARY_PATH");
    script.push('\n');
}

fn write_computation(script: &mut String, settings: &JobSettings<'_>, computation: &ComputationDescriptor) {
    banner(script, "Computation Settings & Start");

    if settings.package == Package::HexpressHybrid {
        script.push_str(&format!("CONF_FILE={}\n", computation.input_file.display()));
        script.push_str("$BIN ${CONF_FILE} -numproc ${NSLOTS} -print\n");
        return;
    }

    let stem = computation.file_stem_path(settings.package);
    script.push_str(&format!("RUNFILE={}.run\n\n", stem.display()));
    script.push_str(&format!("STEERINGFILE={}.steering\n\n", stem.display()));

    if settings.package == Package::FineTurbo {
        script.push_str("NB_BALANCE=`expr $NSLOTS - 1`\n\n");
        let mode = if computation.parallel_partition { "-partition" } else { "-parallel" };
        script.push_str(&format!(
            "fine${{NUMECA_SOFT_VERSION}} -print -batch {} -computation $RUNFILE -nproc $NB_BALANCE",
            mode
        ));
        if let Some(memory) = computation.memory {
            script.push_str(&format!(" -nbint {} -nbreal {}", memory.nbint, memory.nbreal));
        }
        script.push_str("\n\n");
    }

    let mpirun = match (settings.mpi, settings.generation()) {
        (MpiLibrary::OpenMpi, _) => "${MPIR_HOME}/bin/mpirun",
        (MpiLibrary::IntelMpi, PathGeneration::Current) => "${I_MPI_ROOT}/bin64/mpirun",
        (MpiLibrary::IntelMpi, PathGeneration::Legacy) => "${I_MPI_ROOT}/bin/mpirun",
    };
    script.push_str(&format!("{} -np $NSLOTS $BIN $RUNFILE -steering $STEERINGFILE -print\n", mpirun));
}
