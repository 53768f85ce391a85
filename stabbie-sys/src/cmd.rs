// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SysError};

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: String,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    /// Best human-readable explanation of a failed command
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("{} exited with status {}", self.command, code),
            None => format!("{} was terminated by a signal", self.command),
        }
    }
}

pub fn render(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Run `command` to completion, killing it if it outlives `timeout`.
///
/// A non-zero exit is not an error here: the caller decides what the
/// status and stderr mean. The C locale keeps messages stable for that.
pub async fn run(command: &str, args: &[String], timeout: Duration) -> Result<CommandOutcome> {
    let rendered = render(command, args);
    debug!("Running {}", rendered);

    let child = Command::new(command)
        .args(args)
        .env("LC_ALL", "C")
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|error| SysError::CommandFailed {
            command: rendered.clone(),
            reason: error.to_string(),
        })?,
        Err(_) => {
            return Err(SysError::CommandTimeout {
                command: rendered,
                timeout,
            });
        }
    };

    Ok(CommandOutcome {
        command: rendered,
        code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_command_context() {
        let args = vec![
            "-t".to_string(),
            "nfs".to_string(),
            "nas:/export".to_string(),
            "/mnt/a".to_string(),
        ];
        let rendered = render("mount", &args);
        assert_eq!(rendered, "mount -t nfs nas:/export /mnt/a");
        assert_eq!(render("umount", &[]), "umount");
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let outcome = CommandOutcome {
            command: "umount /mnt/a".to_string(),
            code: Some(32),
            success: false,
            stdout: String::new(),
            stderr: "umount: /mnt/a: target is busy.\n".to_string(),
        };
        assert_eq!(outcome.failure_message(), "umount: /mnt/a: target is busy.");

        let silent = CommandOutcome {
            stderr: String::new(),
            ..outcome
        };
        assert_eq!(
            silent.failure_message(),
            "umount /mnt/a exited with status 32"
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_command_failure() {
        let result = run(
            "stabbie-definitely-missing-binary",
            &[],
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(SysError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let result = run("sleep", &["5".to_string()], Duration::from_millis(50)).await;
        assert!(matches!(result, Err(SysError::CommandTimeout { .. })));
    }
}
