// ABOUTME: Config command implementation.
// ABOUTME: Creates the config file on first use and prints its location and contents.

use panda::config::{init_config, local_user};
use panda::error::Result;
use panda::output::{Output, OutputMode};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ConfigReport<'a> {
    path: &'a str,
    created: bool,
    contents: &'a str,
}

pub fn show_config(path: &Path, output: Output) -> Result<()> {
    let created = !path.exists();
    if created {
        init_config(path, &local_user())?;
    }
    let contents = std::fs::read_to_string(path)?;

    match output.mode() {
        OutputMode::Json => {
            let shown = path.display().to_string();
            let report = ConfigReport {
                path: &shown,
                created,
                contents: &contents,
            };
            if let Ok(json) = serde_json::to_string(&report) {
                println!("{json}");
            }
        }
        OutputMode::Quiet => println!("{}", path.display()),
        OutputMode::Normal => {
            if created {
                println!("Created {}", path.display());
            }
            println!("# {}", path.display());
            print!("{contents}");
        }
    }
    Ok(())
}
