//! Diagnostic artifact collection.
//!
//! Runs a fixed catalog of diagnostic commands and writes each successful
//! capture to `<output_dir>/<name>.txt`. Artifacts carry a two-line header
//! (the source command, then a separator) so a reader — human or index —
//! can see where the text came from. A failed command records `false` and
//! leaves any artifact from a previous run untouched.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runner::run_command;

/// Fixed catalog of (artifact name, shell command) pairs.
pub const CATALOG: &[(&str, &str)] = &[
    ("os", "uname -a"),
    ("disk", "df -h"),
    ("memory", "free -m"),
    ("processes", "ps aux --sort=-%cpu | head -20"),
    ("network", "ip addr show"),
    ("uptime", "uptime"),
    ("cpu", "lscpu"),
    ("mounts", "mount"),
    ("users", "who"),
    ("environment", "env | sort"),
];

/// Width of the separator line under each artifact header.
const SEPARATOR_WIDTH: usize = 50;

/// Collects diagnostic command output into text artifacts.
pub struct SystemInfoCollector {
    output_dir: PathBuf,
}

impl SystemInfoCollector {
    /// Create a collector, ensuring the output directory exists.
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every catalog entry and report per-item success.
    ///
    /// The returned map has exactly one entry per catalog item. A `true`
    /// entry guarantees a fresh artifact on disk; a `false` entry wrote
    /// nothing.
    pub async fn collect_all(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        println!("Collecting system information...");

        for (name, command) in CATALOG {
            println!("  running: {}", command);
            let ok = match run_command(command).await {
                Some(output) => match self.write_artifact(name, command, &output, false) {
                    Ok(()) => {
                        println!("  saved: {}.txt", name);
                        true
                    }
                    Err(e) => {
                        eprintln!("  write failed: {}.txt - {}", name, e);
                        false
                    }
                },
                None => {
                    println!("  failed: {}", name);
                    false
                }
            };
            results.insert(name.to_string(), ok);
        }

        results
    }

    /// Run a single ad hoc command and save it under `<name>.txt`.
    pub async fn collect_custom(&self, name: &str, command: &str) -> bool {
        println!("Running custom command: {}", command);
        match run_command(command).await {
            Some(output) => match self.write_artifact(name, command, &output, true) {
                Ok(()) => {
                    println!("Saved custom info: {}.txt", name);
                    true
                }
                Err(e) => {
                    eprintln!("Failed to save {}.txt: {}", name, e);
                    false
                }
            },
            None => {
                eprintln!("Failed to run: {}", command);
                false
            }
        }
    }

    fn write_artifact(&self, name: &str, command: &str, output: &str, custom: bool) -> Result<()> {
        let label = if custom { "Custom Command" } else { "Command" };
        let content = format!(
            "{}: {}\n{}\n{}",
            label,
            command,
            "=".repeat(SEPARATOR_WIDTH),
            output
        );
        let path = self.output_dir.join(format!("{}.txt", name));
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        Ok(())
    }
}

/// Run the `collect` subcommand: full catalog plus any `name:cmd` extras.
pub async fn run_collect(output_dir: &Path, custom_commands: &[String]) -> Result<()> {
    let collector = SystemInfoCollector::new(output_dir)?;

    let results = collector.collect_all().await;

    for spec in custom_commands {
        let Some((name, command)) = spec.split_once(':') else {
            eprintln!("Invalid custom command format: {}", spec);
            eprintln!("Use format: name:command");
            continue;
        };
        collector
            .collect_custom(name.trim(), command.trim())
            .await;
    }

    let successful = results.values().filter(|ok| **ok).count();
    let total = results.len();

    println!();
    println!("Collection complete.");
    println!("Successfully collected {}/{} items", successful, total);
    println!(
        "Files saved to: {}",
        std::fs::canonicalize(collector.output_dir())
            .unwrap_or_else(|_| collector.output_dir().to_path_buf())
            .display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_collect_all_one_entry_per_catalog_item() {
        let tmp = TempDir::new().unwrap();
        let collector = SystemInfoCollector::new(tmp.path()).unwrap();

        let results = collector.collect_all().await;
        assert_eq!(results.len(), CATALOG.len());

        // An artifact exists exactly for the entries that reported success.
        for (name, ok) in &results {
            let path = tmp.path().join(format!("{}.txt", name));
            assert_eq!(
                path.exists(),
                *ok,
                "artifact presence mismatch for '{}'",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_artifact_format() {
        let tmp = TempDir::new().unwrap();
        let collector = SystemInfoCollector::new(tmp.path()).unwrap();

        assert!(collector.collect_custom("greeting", "echo hi").await);

        let content = std::fs::read_to_string(tmp.path().join("greeting.txt")).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Custom Command: echo hi"));
        assert_eq!(lines.next(), Some(&"=".repeat(50)[..]));
        assert_eq!(lines.next(), Some("hi"));
    }

    #[tokio::test]
    async fn test_failed_command_leaves_prior_artifact() {
        let tmp = TempDir::new().unwrap();
        let collector = SystemInfoCollector::new(tmp.path()).unwrap();

        assert!(collector.collect_custom("probe", "echo first").await);
        let before = std::fs::read_to_string(tmp.path().join("probe.txt")).unwrap();

        assert!(!collector.collect_custom("probe", "exit 1").await);
        let after = std::fs::read_to_string(tmp.path().join("probe.txt")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_failed_custom_command_creates_no_file() {
        let tmp = TempDir::new().unwrap();
        let collector = SystemInfoCollector::new(tmp.path()).unwrap();

        assert!(!collector.collect_custom("nothing", "exit 1").await);
        assert!(!tmp.path().join("nothing.txt").exists());
    }

    #[test]
    fn test_new_creates_output_dir_idempotently() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("info");

        SystemInfoCollector::new(&dir).unwrap();
        assert!(dir.is_dir());
        // Second construction over the existing directory is fine.
        SystemInfoCollector::new(&dir).unwrap();
    }
}
