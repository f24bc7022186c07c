//! Status overview of collected artifacts and the persisted index.

use anyhow::{bail, Result};
use std::path::Path;

use crate::index::{artifact_files, has_persisted_index, IndexStore, INDEX_STORE_FILE};

/// Run the `status` subcommand: artifact listing plus index metadata.
pub fn run_status(system_info_dir: &Path, storage_dir_name: &str) -> Result<()> {
    if !system_info_dir.is_dir() {
        bail!(
            "Directory '{}' does not exist. Run 'shellai collect' first.",
            system_info_dir.display()
        );
    }

    let files = artifact_files(system_info_dir)?;
    let storage_dir = system_info_dir.join(storage_dir_name);

    // After `cleanup` the artifacts are gone but the index still answers
    // questions, so an empty directory is only an error without one.
    if files.is_empty() && !has_persisted_index(&storage_dir) {
        bail!(
            "No system info files found in '{}'. Run 'shellai collect' first.",
            system_info_dir.display()
        );
    }

    println!(
        "System info directory: {}",
        std::fs::canonicalize(system_info_dir)
            .unwrap_or_else(|_| system_info_dir.to_path_buf())
            .display()
    );
    if files.is_empty() {
        println!("No info files (cleaned up after indexing).");
    } else {
        println!("Found {} info files:", files.len());
    }

    for file in &files {
        let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {} ({})", name, format_bytes(size));
    }

    println!();
    if has_persisted_index(&storage_dir) {
        println!("Persisted index: {}", storage_dir.display());
        match read_index_meta(&storage_dir) {
            Some(meta) => println!(
                "  {} documents, model {}, built {}",
                meta.document_ids.len(),
                meta.embedding_model,
                meta.built_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("  (metadata unreadable; next 'ask' will rebuild)"),
        }
    } else {
        println!("Persisted index: none (built on first 'shellai ask')");
    }

    Ok(())
}

fn read_index_meta(storage_dir: &Path) -> Option<IndexStore> {
    let content = std::fs::read_to_string(storage_dir.join(INDEX_STORE_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
