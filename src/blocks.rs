//! Selective open of a computation in CFView by block name.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::ToolsConfig;
use crate::error::*;
use crate::external::run_tool;
use crate::parser::igg::block_list::BlockListParser;
use crate::structs_and_impls::require_file;
use crate::writer::macro_writer::MacroWriter;


const IGG_SCRIPT: &str = "igg_script.py";
const BLOCK_LIST: &str = "blf.dat";
const CFVIEW_MACRO: &str = "cfview_script.py";

#[derive(Debug, Clone)]
pub struct BlockOpenRequest {
    pub mesh_project: PathBuf,          // .igg project the block names come from
    pub run_file: String,               // Computation opened by CFView
    pub blocks: Vec<String>,
    pub block_list: Option<PathBuf>,    // Existing name dump, skips the IGG step
    pub template: Option<PathBuf>,      // CFView macro to run after the selective open
    pub work_dir: PathBuf,              // Where the auxiliary files go
    pub launch_viewer: bool,
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockOpenSummary {
    pub indices: Vec<usize>,
    pub command: String,
    pub macro_path: PathBuf,
}

fn dump_block_names(request: &BlockOpenRequest, tools: &ToolsConfig) -> Result<(PathBuf, Vec<PathBuf>)> {
    let project = fs::canonicalize(require_file(&request.mesh_project)?).map_err(ParseError::from)?;
    let block_list = request.work_dir.join(BLOCK_LIST);
    let script_path = request.work_dir.join(IGG_SCRIPT);

    fs::write(&script_path, MacroWriter::igg_block_dump_script(&project, &block_list)).map_err(WriterError::from)?;
    info!("IGG script written to {}", script_path.display());
    run_tool(&tools.igg, &["-batch", "-script", IGG_SCRIPT], Some(&request.work_dir))?;

    Ok((block_list.clone(), vec![script_path, block_list]))
}

pub fn open_selected_blocks(request: &BlockOpenRequest, tools: &ToolsConfig) -> Result<BlockOpenSummary> {
    if request.blocks.is_empty() {
        return Err(Error::Validation("no block name given".to_string()));
    }
    let template = match &request.template {
        Some(path) => Some(fs::read_to_string(require_file(path)?).map_err(ParseError::from)?),
        None => None,
    };

    let (block_list, mut auxiliary) = match &request.block_list {
        Some(path) => (path.clone(), Vec::new()),
        None => dump_block_names(request, tools)?,
    };

    let names = BlockListParser::parse_file(&block_list)?;
    info!("{} block(s) listed in {}", names.len(), block_list.display());
    let indices = BlockListParser::select_indices(&names, &request.blocks)?;

    let command = MacroWriter::selective_open_command(&request.run_file, &indices);
    let macro_path = request.work_dir.join(CFVIEW_MACRO);
    fs::write(&macro_path, MacroWriter::cfview_macro(&command, template.as_deref())?).map_err(WriterError::from)?;
    info!("CFView macro written to {}", macro_path.display());
    auxiliary.push(macro_path.clone());

    if request.launch_viewer {
        let args: &[&str] = if template.is_some() {
            &["-macro", CFVIEW_MACRO, "-batch", "-print"]
        } else {
            &["-macro", CFVIEW_MACRO, "-print"]
        };
        run_tool(&tools.cfview, args, Some(&request.work_dir))?;
    }

    if request.clean {
        for path in &auxiliary {
            match fs::remove_file(path) {
                Ok(()) => info!("removed {}", path.display()),
                Err(err) => warn!("could not remove {}: {}", path.display(), err),
            }
        }
    }

    Ok(BlockOpenSummary { indices, command, macro_path })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_block_list_skips_igg() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("names.dat");
        fs::write(&list, "hub\nblade_skin\nshroud\ninlet\n").unwrap();

        let request = BlockOpenRequest {
            mesh_project: dir.path().join("absent.igg"),
            run_file: "case.run".to_string(),
            blocks: vec!["inlet".to_string(), "blade_skin".to_string()],
            block_list: Some(list),
            template: None,
            work_dir: dir.path().to_path_buf(),
            launch_viewer: false,
            clean: false,
        };
        let summary = open_selected_blocks(&request, &ToolsConfig::default()).unwrap();
        assert_eq!(summary.indices, vec![2, 4]);
        let text = fs::read_to_string(&summary.macro_path).unwrap();
        assert_eq!(text, "CFViewBackward(912)\nFileOpenProjectSelection('case.run' ,'blocklist',2 ,'2 4' ,'loadqnt')\n");
    }

    #[test]
    fn clean_removes_macro_and_keeps_given_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("names.dat");
        fs::write(&list, "hub\nshroud\n").unwrap();

        let request = BlockOpenRequest {
            mesh_project: dir.path().join("absent.igg"),
            run_file: "case.run".to_string(),
            blocks: vec!["shroud".to_string()],
            block_list: Some(list.clone()),
            template: None,
            work_dir: dir.path().to_path_buf(),
            launch_viewer: false,
            clean: true,
        };
        let summary = open_selected_blocks(&request, &ToolsConfig::default()).unwrap();
        assert_eq!(summary.indices, vec![2]);
        assert!(!summary.macro_path.exists());
        assert!(list.exists());
    }

    #[test]
    fn unknown_block_writes_no_macro() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("names.dat");
        fs::write(&list, "hub\nshroud\n").unwrap();

        let request = BlockOpenRequest {
            mesh_project: dir.path().join("absent.igg"),
            run_file: "case.run".to_string(),
            blocks: vec!["casing".to_string()],
            block_list: Some(list),
            template: None,
            work_dir: dir.path().to_path_buf(),
            launch_viewer: false,
            clean: false,
        };
        assert!(matches!(open_selected_blocks(&request, &ToolsConfig::default()), Err(Error::Validation(_))));
        assert!(!dir.path().join(CFVIEW_MACRO).exists());
    }
}
