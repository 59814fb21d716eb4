// ABOUTME: Debug command implementation.
// ABOUTME: Dumps every discovered entry with all of its fields.

use super::connection::{discover_servers, report_warnings};
use panda::config::Config;
use panda::diagnostics::Diagnostics;
use panda::error::Result;
use panda::output::{Output, OutputMode, RecordColumns};

pub async fn debug(config: Config, server: Option<String>, output: Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let listed = discover_servers(
        &config,
        server.as_deref(),
        &config.scripts.paths,
        &output,
        &mut diag,
    )
    .await?;

    for (server, records) in listed {
        match output.mode() {
            OutputMode::Json => output.records(&server, &records, RecordColumns::default()),
            OutputMode::Normal | OutputMode::Quiet => {
                for record in &records {
                    println!("{server}: {record:?}");
                }
            }
        }
    }

    report_warnings(&diag, &output);
    Ok(())
}
