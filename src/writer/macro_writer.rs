use std::path::Path;

use crate::error::ParseError;


const SELECTIVE_OPEN: &str = "FileOpenProjectSelection";

pub struct MacroWriter;  // Python scripts handed to IGG and CFView in batch mode

impl MacroWriter {
    /// IGG script that opens `project` and dumps one block name per line into `block_list`.
    pub fn igg_block_dump_script(project: &Path, block_list: &Path) -> String {
        let mut script = String::new();
        script.push_str("script_version(2.2)\n");
        script.push_str("import os\n");
        script.push_str(&format!("path = '{}'\n", project.display()));
        script.push_str(&format!("outfile = '{}'\n", block_list.display()));
        script.push_str("open_igg_project(path)\n");
        script.push_str("nb = num_of_blocks()\n");
        script.push_str("print('>>> There are %s blocks in %s <<<' % (nb, os.path.basename(path)))\n");
        script.push_str("i = 1\n");
        script.push_str("with open(outfile, 'w') as temp:\n");
        script.push_str("\twhile i <= nb:\n");
        script.push_str("\t\ttemp.write(block(i).get_name())\n");
        script.push_str("\t\ttemp.write('\\n')\n");
        script.push_str("\t\ti += 1\n");
        script
    }

    /// `FileOpenProjectSelection('<run>' ,'blocklist',<n> ,'<i j k>' ,'loadqnt')`
    pub fn selective_open_command(run_file: &str, indices: &[usize]) -> String {
        let joined = indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        format!(
            "{}('{}' ,'blocklist',{} ,'{}' ,'loadqnt')",
            SELECTIVE_OPEN,
            run_file,
            indices.len(),
            joined
        )
    }

    /// Macro text: template's first line, blank line, the command, then the rest of the
    /// template without its own selective-open lines. Without a template the command
    /// follows the compatibility call.
    pub fn cfview_macro(command: &str, template: Option<&str>) -> Result<String, ParseError> {
        let template = match template {
            Some(template) => template,
            None => return Ok(format!("CFViewBackward(912)\n{}\n", command)),
        };

        let mut lines = template.split_inclusive('\n');
        let first = lines
            .next()
            .ok_or_else(|| ParseError::FormatError("CFView template macro is empty".to_string()))?;

        let mut text = String::with_capacity(template.len() + command.len() + 2);
        text.push_str(first);
        if !first.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(command);
        text.push('\n');
        for line in lines.filter(|l| !l.starts_with(SELECTIVE_OPEN)) {
            text.push_str(line);
        }
        Ok(text)
    }
}
