//! Deletion of raw text artifacts once a persisted index exists.
//!
//! The raw `.txt` files are the only source the index can be rebuilt from,
//! so cleanup refuses to run unless a complete persisted index is present.
//! The persisted index itself is never touched.

use anyhow::{bail, Result};
use std::io::BufRead;
use std::path::Path;

use crate::index::{artifact_files, has_persisted_index};

/// Run the `cleanup` subcommand.
///
/// Without `--force` the operator is asked to confirm (y/N) before any file
/// is removed.
pub fn run_cleanup(system_info_dir: &Path, storage_dir_name: &str, force: bool) -> Result<()> {
    if !system_info_dir.is_dir() {
        bail!("Directory '{}' does not exist.", system_info_dir.display());
    }

    let storage_dir = system_info_dir.join(storage_dir_name);
    if !has_persisted_index(&storage_dir) {
        bail!(
            "No persisted index found in '{}'. Refusing to delete raw artifacts: \
             they are the only source the index can be rebuilt from.",
            storage_dir.display()
        );
    }

    let files = artifact_files(system_info_dir)?;
    if files.is_empty() {
        println!("Nothing to clean up: no .txt artifacts in {}", system_info_dir.display());
        return Ok(());
    }

    if !force {
        println!(
            "About to delete {} artifact file(s) from {}.",
            files.len(),
            system_info_dir.display()
        );
        print!("Continue? [y/N] ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = delete_artifacts(system_info_dir)?;
    println!("Deleted {} artifact file(s).", deleted);
    println!("Persisted index kept: {}", storage_dir.display());
    Ok(())
}

/// Delete every `*.txt` directly under `dir`. Returns the count removed.
fn delete_artifacts(dir: &Path) -> Result<usize> {
    let files = artifact_files(dir)?;
    let mut deleted = 0;
    for file in files {
        std::fs::remove_file(&file)?;
        deleted += 1;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};
    use tempfile::TempDir;

    fn write_fake_index(storage_dir: &Path) {
        std::fs::create_dir_all(storage_dir).unwrap();
        for file in [INDEX_STORE_FILE, DOCSTORE_FILE, VECTOR_STORE_FILE] {
            std::fs::write(storage_dir.join(file), "{}").unwrap();
        }
    }

    #[test]
    fn test_refuses_without_persisted_index() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("os.txt"), "data").unwrap();

        let err = run_cleanup(tmp.path(), "storage", true).unwrap_err();
        assert!(err.to_string().contains("Refusing to delete"));
        assert!(tmp.path().join("os.txt").exists());
    }

    #[test]
    fn test_refuses_with_partial_index() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("os.txt"), "data").unwrap();
        let storage = tmp.path().join("storage");
        std::fs::create_dir_all(&storage).unwrap();
        std::fs::write(storage.join(INDEX_STORE_FILE), "{}").unwrap();

        assert!(run_cleanup(tmp.path(), "storage", true).is_err());
        assert!(tmp.path().join("os.txt").exists());
    }

    #[test]
    fn test_force_deletes_artifacts_and_keeps_index() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("os.txt"), "data").unwrap();
        std::fs::write(tmp.path().join("disk.txt"), "data").unwrap();
        std::fs::write(tmp.path().join("notes.log"), "not an artifact").unwrap();
        let storage = tmp.path().join("storage");
        write_fake_index(&storage);

        run_cleanup(tmp.path(), "storage", true).unwrap();

        assert!(!tmp.path().join("os.txt").exists());
        assert!(!tmp.path().join("disk.txt").exists());
        // Non-artifact files and the persisted index survive.
        assert!(tmp.path().join("notes.log").exists());
        assert!(storage.join(INDEX_STORE_FILE).exists());
        assert!(storage.join(DOCSTORE_FILE).exists());
        assert!(storage.join(VECTOR_STORE_FILE).exists());
    }

    #[test]
    fn test_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(run_cleanup(&tmp.path().join("nope"), "storage", true).is_err());
    }
}
