// ABOUTME: First-run config scaffolding.
// ABOUTME: Writes a commented config.yml template with working defaults.

use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use crate::error::Result;

/// Inventory script listing every vhost with its checked-out branch and the
/// age of its last commit, one labelled record per line.
pub const DEFAULT_BRANCHES_SCRIPT: &str = r#"for path in /var/www/vhosts/*
do
  (
  cd "$path/current" &>/dev/null
  name=$(basename "$path")
  branch="$(git rev-parse --abbrev-ref HEAD 2>/dev/null)"
  date=$(git show --quiet --pretty=format:"%ar (%h)" "$branch" 2>/dev/null)
  printf "name:%s\tpath:%s\tbranch:%s\tdate:%s\n" "$name" "$path" "$branch" "$date"
  ) &
done
wait
"#;

/// Inventory script listing vhost names and paths only.
pub const DEFAULT_PATHS_SCRIPT: &str = r#"for path in /var/www/vhosts/*
do
  printf "name:%s\tpath:%s\n" "$(basename "$path")" "$path"
done
"#;

/// Write the template config to `path`, creating parent directories.
///
/// New directories are created 0700 and the file 0600 on Unix.
pub fn init_config(path: &Path, user: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        private_dir_builder().create(parent)?;
    }
    let mut file = private_file_options().open(path)?;
    file.write_all(generate_template_yaml(user).as_bytes())?;
    tracing::info!(path = %path.display(), "created default config");
    Ok(())
}

fn private_dir_builder() -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder
}

fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}

pub fn generate_template_yaml(user: &str) -> String {
    format!(
        r#"servers:
  - host: example.com
    # port: 10022
    # identity_file: ~/.ssh/id_rsa
    # SSH host key verification: unknown hosts are trusted on first use
    # and remembered in ~/.ssh/known_hosts. Set to false to require a
    # pre-populated known_hosts entry.
    # trust_first_connection: true

# Port used for servers that do not name one.
default_port: 10022
user: {user}
identity_file: ~/.ssh/id_rsa
timeout: 10s

select_cmd: fzf
tail_cmd: tail -f
log_path_format: /var/www/vhosts/%s/log/%s-app_error_log

# Upper bound on servers queried at the same time.
max_concurrency: 4

scripts:
  paths: |
{paths}
  branches: |
{branches}
"#,
        paths = indent(DEFAULT_PATHS_SCRIPT, 4),
        branches = indent(DEFAULT_BRANCHES_SCRIPT, 4),
    )
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
