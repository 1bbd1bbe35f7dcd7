//! External command execution shared by the tool-backed collaborators.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

use noteport_core::{Error, Result};

/// Run a command with a timeout, returning raw stdout.
///
/// A timeout, spawn failure, or non-zero exit is a conversion error. The child
/// is killed when the timeout drops its future.
pub async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<Vec<u8>> {
    cmd.kill_on_drop(true);
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Conversion(format!(
                "External command timed out after {}s",
                timeout_secs
            ))
        })?
        .map_err(|e| Error::Conversion(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Conversion(format!(
            "Command failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Whether `program` can be spawned. Any exit status counts, as several tools
/// print their version to stderr and exit non-zero.
pub async fn tool_available(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .kill_on_drop(true)
        .output()
        .await
        .is_ok()
}

/// Write `data` to a fresh file under `dir` for a tool to read by path.
///
/// The file is removed when the returned guard drops.
pub fn write_tool_input(dir: &Path, suffix: &str, data: &[u8]) -> Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("extract-")
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| Error::Internal(format!("Failed to create temp file: {}", e)))?;
    file.write_all(data)
        .and_then(|_| file.flush())
        .map_err(|e| Error::Internal(format!("Failed to write temp file: {}", e)))?;
    Ok(file)
}
