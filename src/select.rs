// ABOUTME: Interactive picking of records through an external filter such as fzf.
// ABOUTME: Candidates go to the filter's stdin; the lines it prints are the selection.

use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit statuses filters use when the user aborts or nothing matched.
const ABORT_STATUSES: &[i32] = &[1, 130];

/// Run `filter_cmd` through `sh -c` and return the lines it selected.
///
/// The filter's stderr stays attached to the terminal so interactive
/// filters can draw their UI there.
pub async fn select(filter_cmd: &str, candidates: &[String]) -> Result<Vec<String>> {
    tracing::debug!(filter = filter_cmd, count = candidates.len(), "running selection filter");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(filter_cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::FilterFailed(format!("failed to start `{filter_cmd}`: {e}")))?;

    let mut input = candidates.join("\n");
    input.push('\n');
    let stdin = child.stdin.take();
    // Feed the filter while its output is collected; a pass-through filter
    // stops reading once its stdout pipe is full.
    let feed = async move {
        if let Some(mut stdin) = stdin {
            match stdin.write_all(input.as_bytes()).await {
                // Filters that stop reading early close the pipe.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
        }
        Ok(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    fed?;

    let selected: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if !output.status.success() {
        return match output.status.code() {
            Some(code) if ABORT_STATUSES.contains(&code) => Err(Error::NoSelection),
            code => Err(Error::FilterFailed(format!(
                "`{filter_cmd}` exited with {}",
                code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
            ))),
        };
    }
    if selected.is_empty() {
        return Err(Error::NoSelection);
    }
    Ok(selected)
}
