// ABOUTME: Branch command implementation.
// ABOUTME: Lists the branch checked out for every discovered entry.

use super::connection::{discover_servers, report_warnings};
use panda::config::Config;
use panda::diagnostics::Diagnostics;
use panda::error::Result;
use panda::output::{Output, OutputMode, RecordColumns};

pub async fn branch(
    config: Config,
    server: Option<String>,
    all: bool,
    ago: bool,
    output: Output,
) -> Result<()> {
    let mut diag = Diagnostics::default();
    let listed = discover_servers(
        &config,
        server.as_deref(),
        &config.scripts.branches,
        &output,
        &mut diag,
    )
    .await?;

    let columns = RecordColumns {
        branch: true,
        date: ago,
    };
    let several = listed.len() > 1;
    for (server, mut records) in listed {
        if !all {
            records.retain(|r| r.has_branch());
        }
        if several && output.mode() == OutputMode::Normal {
            println!("[{server}]");
        }
        output.records(&server, &records, columns);
    }

    report_warnings(&diag, &output);
    Ok(())
}
