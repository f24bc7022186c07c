//! Shell command execution with a bounded timeout.

use std::time::Duration;
use tokio::process::Command;

/// Hard cap on any single diagnostic command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `command` through `sh -c` and return its stdout.
///
/// Returns `Some(stdout)` only when the process exits with status zero.
/// A non-zero exit, a spawn failure, and a timeout are all treated the same
/// way: the failure is reported on stderr and `None` is returned. Partial
/// output is never surfaced and nothing is retried.
pub async fn run_command(command: &str) -> Option<String> {
    let child = Command::new("sh").arg("-c").arg(command).output();

    let output = match tokio::time::timeout(COMMAND_TIMEOUT, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            eprintln!("Command failed: {} - {}", command, e);
            return None;
        }
        Err(_) => {
            eprintln!(
                "Command timed out after {}s: {}",
                COMMAND_TIMEOUT.as_secs(),
                command
            );
            return None;
        }
    };

    if !output.status.success() {
        eprintln!("Command failed: {} - exit status {}", command, output.status);
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).to_string())
}
