// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (scripting), and JSON output modes for results and records.

use crate::inventory::HostRecord;
use crate::ssh::CommandResult;
use serde::Serialize;
use std::io::Write;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a non-fatal warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print a captured command's output. Quiet mode prints stdout only.
    pub fn command_result(&self, host: &str, result: &CommandResult) {
        match self.mode {
            OutputMode::Normal => {
                print!("{}", result.stdout);
                eprint!("{}", result.stderr);
                if !result.success() {
                    eprintln!("{host}: exit status {}", result.exit_status);
                }
            }
            OutputMode::Quiet => print!("{}", result.stdout),
            OutputMode::Json => {
                let event = JsonResult {
                    event: "result",
                    host,
                    exit_status: result.exit_status,
                    stdout: &result.stdout,
                    stderr: &result.stderr,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
        let _ = std::io::stdout().flush();
    }

    /// Print inventory records for `server`.
    pub fn records(&self, server: &str, records: &[HostRecord], columns: RecordColumns) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                print!("{}", render_records(records, columns));
            }
            OutputMode::Json => {
                for record in records {
                    let row = JsonRecord { server, record };
                    if let Ok(json) = serde_json::to_string(&row) {
                        println!("{json}");
                    }
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

/// Which optional columns a record listing shows after the name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordColumns {
    pub branch: bool,
    pub date: bool,
}

/// Lay records out as whitespace-aligned columns, one per line.
pub fn render_records(records: &[HostRecord], columns: RecordColumns) -> String {
    let rows: Vec<Vec<&str>> = records
        .iter()
        .map(|r| {
            let mut row = vec![r.name.as_str()];
            if columns.branch {
                row.push(r.branch.as_str());
            }
            if columns.date {
                row.push(r.date.as_str());
            }
            row
        })
        .collect();

    let width = rows.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..width)
        .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &rows {
        let mut line = String::new();
        for (col, cell) in row.iter().enumerate() {
            if col > 0 {
                line.push_str("  ");
            }
            line.push_str(&format!("{cell:<w$}", w = widths[col]));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonResult<'a> {
    event: &'a str,
    host: &'a str,
    exit_status: i32,
    stdout: &'a str,
    stderr: &'a str,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    server: &'a str,
    #[serde(flatten)]
    record: &'a HostRecord,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, branch: &str, date: &str) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            path: format!("/var/www/vhosts/{name}"),
            branch: branch.to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn columns_are_aligned() {
        let records = vec![
            record("shop", "main", "2 days ago (abc1234)"),
            record("marketing", "feature/x", "5 hours ago (def5678)"),
        ];
        let columns = RecordColumns {
            branch: true,
            date: false,
        };
        assert_eq!(
            render_records(&records, columns),
            "shop       main\nmarketing  feature/x\n"
        );
    }

    #[test]
    fn names_only_without_columns() {
        let records = vec![record("shop", "", "")];
        assert_eq!(render_records(&records, RecordColumns::default()), "shop\n");
    }

    #[test]
    fn empty_listing_renders_nothing() {
        assert!(render_records(&[], RecordColumns::default()).is_empty());
    }

    #[test]
    fn json_record_flattens_fields() {
        let record = record("shop", "main", "");
        let json = serde_json::to_value(JsonRecord {
            server: "qa1",
            record: &record,
        })
        .unwrap();
        assert_eq!(json["server"], "qa1");
        assert_eq!(json["name"], "shop");
        assert_eq!(json["branch"], "main");
    }
}
