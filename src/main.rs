use std::path::PathBuf;          // Owned paths for CLI arguments
use std::process;                // process::exit with a non-zero code on failure

use clap::{Parser, Subcommand};
use colored::Colorize;           // Colored console summaries
use tracing::error;

use fineflow::blocks::{open_selected_blocks, BlockOpenRequest};     // CFView selective open by block name
use fineflow::config::RunConfig;
use fineflow::design3d::{extract_moments, extract_results};         // Design3D post-processing tables
use fineflow::error::*;
use fineflow::modal_analysis::displacement::ModalDisplacement;      // Physical displacement from mode shapes
use fineflow::modal_analysis::ibpa::IbpaPlan;
use fineflow::parser::fine_turbo::modes::ModeFileParser;            // Structure mode file reader
use fineflow::sge::{launch, JobRequest};                            // SGE script generation and submission
use fineflow::structs_and_impls::*;
use fineflow::writer::par_writer::ParWriter;                        // .par patcher
use fineflow::writer::xml_writer::VTUWriter;                        // Writer for VTK XML unstructured grid (.vtu) format

#[derive(Parser, Debug)]
#[command(name = "fineflow")]
#[command(about = "Automation toolkit for FINE/Turbo, FINE/Open, FINE/Design3D and Hexpress/Hybrid")]
struct Cli {
    /// TOML file overriding the built-in cluster settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add uncertain parameters to a .par file and drive matching parameters by expression
    PatchPar {
        /// Source parameter file
        source: PathBuf,
        /// Output file [default: <stem>_new.<ext> next to the source]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// NAME=TRIGGER[,TRIGGER...], repeatable; replaces the configured rules
        #[arg(long = "rule")]
        rules: Vec<String>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        min: Option<String>,
        #[arg(long)]
        max: Option<String>,
    },
    /// Collect per-design quantity values into <quantity>_global.dat tables
    Results {
        /// Root of the optimization or database tree
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Quantity file stem, repeatable; replaces the configured list
        #[arg(short, long = "quantity")]
        quantities: Vec<String>,
        /// Design directory marker (_design_ for optimizations, _flow_ for databases)
        #[arg(long)]
        marker: Option<String>,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Sort each table by design number
        #[arg(long)]
        sort: bool,
    },
    /// Extract statistical moments from a .his statistics history
    Moments {
        his: PathBuf,
        #[arg(long)]
        marker: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate, and by default submit, SGE job scripts
    Sge {
        /// Project directory holding the computations
        #[arg(default_value = ".")]
        project: PathBuf,
        #[arg(short, long, value_enum)]
        package: Package,
        /// Version number without prefix, e.g. 121, 121b10, 112rc, 71
        #[arg(long = "version")]
        software_version: String,
        /// Cores, a multiple of the configured core step (ignored for hh)
        #[arg(short, long)]
        cores: Option<u32>,
        #[arg(long, value_enum, default_value = "ompi")]
        mpi: MpiLibrary,
        /// FINE/Turbo integer memory (requires --nbreal)
        #[arg(long, requires = "nbreal")]
        nbint: Option<u64>,
        /// FINE/Turbo real memory (requires --nbint)
        #[arg(long, requires = "nbint")]
        nbreal: Option<u64>,
        /// FINE/Turbo parallel partitioner
        #[arg(long)]
        parallel_partitioner: bool,
        /// Computation name (.conf file for hh), repeatable [default: all]
        #[arg(long = "computation")]
        computations: Vec<String>,
        /// Only write the scripts
        #[arg(long)]
        no_submit: bool,
    },
    /// Open a computation in CFView with a block-name selection
    Blocks {
        /// IGG mesh project the block names are read from
        mesh: PathBuf,
        /// Run file given to CFView
        #[arg(long)]
        run_file: String,
        /// Block name, repeatable
        #[arg(short, long = "block", required = true)]
        blocks: Vec<String>,
        /// Existing block name dump, skips IGG
        #[arg(long)]
        block_list: Option<PathBuf>,
        /// CFView macro to run after the selective open
        #[arg(long)]
        template: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
        /// Only write the macro
        #[arg(long)]
        no_launch: bool,
        /// Remove the auxiliary files afterwards
        #[arg(long)]
        clean: bool,
    },
    /// Maximum modal displacement from a structure mode file
    Displacement {
        mode_file: PathBuf,
        /// Generalized displacements, one per mode, comma separated
        #[arg(short, long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        generalized: Vec<f64>,
        /// Also write the displacement field as VTK XML
        #[arg(long)]
        vtu: Option<PathBuf>,
    },
    /// Interblade phase angles for a range of nodal diameters
    Ibpa {
        #[arg(long)]
        nodal_diameters: u32,
        #[arg(long)]
        blades: u32,
        /// Base computation name for the derived computation names
        #[arg(long)]
        computation: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();                     // clap exits with usage on bad arguments
    fineflow::init_logging(cli.verbose);        // RUST_LOG overrides -v

    if let Err(e) = run(cli) {
        error!("{}", e);                        // Report the failure through the log
        process::exit(1);                       // Exit with error code
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = RunConfig::load(cli.config.as_deref())?;  // Built-in defaults when no file is given

    match cli.command {
        Command::PatchPar { source, output, rules, value, min, max } => {
            if !rules.is_empty() {                  // CLI rules replace the configured ones
                config.patch.rules = rules.iter().map(|r| SubstitutionRule::from_cli(r)).collect::<Result<_>>()?;
            }
            let range = &mut config.patch.range;
            if let Some(v) = value { range.value = v; }
            if let Some(v) = min { range.min = v; }
            if let Some(v) = max { range.max = v; }

            let output = output.unwrap_or_else(|| ParWriter::default_output_path(&source));    // <stem>_new.<ext>
            let report = ParWriter::patch_file(&source, &output, &config.patch.rules, &config.patch.range)?;

            println!("{} {}", "Patched parameter file:".green().bold(), output.display());
            if let (Some(before), Some(after)) = (report.declared_before, report.declared_after) {
                println!("  NUMBER_OF_PARAMETERS {} -> {}", before, after);
            }
            println!("  injected: {}", report.injected.join(", "));
            for (name, parameter) in &report.patched {
                println!("  {} = VALUE*{}", name.cyan(), parameter);
            }
            if !report.found_user_parameters {
                println!("{}", "  no USER_PARAMETERS block, output is an unmodified copy".yellow().bold());
            }
        }

        Command::Results { root, quantities, marker, output_dir, sort } => {
            if !quantities.is_empty() {
                config.results.quantities = quantities;
            }
            let marker = marker.unwrap_or(config.results.marker);
            let summaries = extract_results(&root, &config.results.quantities, &marker, &output_dir, sort || config.results.sort)?;

            println!("{}", "Quantity tables:".green().bold());
            for s in summaries {
                let skipped = if s.skipped > 0 { format!(", {} skipped", s.skipped).yellow().to_string() } else { String::new() };
                println!("  {} {} record(s){} -> {}", s.quantity.cyan(), s.records, skipped, s.output.display());
            }
        }

        Command::Moments { his, marker, output } => {
            let marker = marker.unwrap_or(config.moments.marker);
            let output = output.unwrap_or(config.moments.output);
            let summary = extract_moments(&his, &marker, &output)?;

            println!("{} {}", "Moments written to".green().bold(), output.display());
            println!("  {} design sample(s) kept, {} skipped", summary.written, summary.skipped);
        }

        Command::Sge {
            project, package, software_version, cores, mpi, nbint, nbreal,
            parallel_partitioner, computations, no_submit,
        } => {
            let memory = match (nbint, nbreal) {    // clap guarantees both or neither
                (Some(nbint), Some(nbreal)) => Some(MemorySettings { nbint, nbreal }),
                _ => None,
            };
            let request = JobRequest {
                project,
                package,
                version: software_version,
                cores,
                mpi,
                memory,
                parallel_partition: parallel_partitioner,
                computations,
                submit: !no_submit,
            };
            let summary = launch(&request, &config)?;

            println!("{} {} SGE script(s) for {}", "Created".green().bold(), summary.scripts.len(), package);
            for script in &summary.scripts {
                println!("  {} {}", script.computation.cyan(), script.path.display());
            }
            if request.submit {
                println!("  submitted: {}", summary.submitted);
                if !summary.failed_submissions.is_empty() {
                    println!("{} {}", "  failed:".red().bold(), summary.failed_submissions.join(", "));
                }
            }
        }

        Command::Blocks { mesh, run_file, blocks, block_list, template, work_dir, no_launch, clean } => {
            let request = BlockOpenRequest {
                mesh_project: mesh,
                run_file,
                blocks,
                block_list,
                template,
                work_dir,
                launch_viewer: !no_launch,
                clean,
            };
            let summary = open_selected_blocks(&request, &config.tools)?;

            println!("{} {:?}", "Selected block indices:".green().bold(), summary.indices);
            println!("  {}", summary.command);
            if !request.clean {
                println!("  macro: {}", summary.macro_path.display());
            }
        }

        Command::Displacement { mode_file, generalized, vtu } => {
            let modes = ModeFileParser::parse_file(&mode_file)?;               // Header, frequencies and node table
            let field = ModalDisplacement::compute(&modes, &generalized)?;     // Weighted sum over every mode
            let max = &field.maxima;

            println!("{}", "Maximum displacement".green().bold());
            println!("  x:         {:e}", max.x);
            println!("  y:         {:e}", max.y);
            if let Some(z) = max.z {
                println!("  z:         {:e}", z);
            }
            println!("  radial:    {:e}", max.radial);
            println!("  theta:     {:e}", max.theta);
            println!("  magnitude: {} at node {}", format!("{:e}", max.magnitude).cyan(), max.magnitude_node);

            if let Some(path) = vtu {
                VTUWriter::write_displacement(&modes, &field, &path)?;
                println!("  field written to {}", path.display());
            }
        }

        Command::Ibpa { nodal_diameters, blades, computation } => {
            let plan = IbpaPlan::from_nodal_diameters(nodal_diameters, blades, computation.as_deref())?;

            println!("{} {} angle(s)", "IBPA plan:".green().bold(), plan.angles.len());
            for angle in &plan.angles {
                match &angle.computation_name {
                    Some(name) => println!("  {:>10.6} rad {:>5} deg  {}", angle.radians, angle.degrees, name.cyan()),
                    None => println!("  {:>10.6} rad {:>5} deg", angle.radians, angle.degrees),
                }
            }
        }
    }

    Ok(())
}
