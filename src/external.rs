//! Blocking invocations of the vendor tools and the scheduler.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::ToolError;


/// Runs `program args...` in `cwd` and waits for it. A non-zero exit is an error.
pub fn run_tool(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<(), ToolError> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    debug!("running {} {}", program, args.join(" "));

    let status = command.status().map_err(|source| ToolError::Spawn {
        tool: program.to_string(),
        source,
    })?;

    if status.success() {
        info!("{} finished", program);
        Ok(())
    } else {
        warn!("{} exited with {}", program, status);
        Err(ToolError::ExitStatus { tool: program.to_string(), status: status.to_string() })
    }
}
