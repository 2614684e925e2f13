//! `command`: run a shell command and return its stdout.
//!
//! A non-zero exit is a soft failure: the walker aborts unless the call
//! sets `ignore_error`, in which case the captured stdout is the result.

use std::process::Command;

use serde::Deserialize;

use hookwalk_core::Value;
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

#[derive(Debug, Deserialize)]
pub struct CommandHook {
    pub command: String,
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    }
}

impl Hook for CommandHook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        tracing::debug!(key = %env.key_path, command = %self.command, "running command");
        let output = shell(&self.command).output().map_err(|e| HookError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = Value::String(stdout.trim_end_matches(['\n', '\r']).to_owned());
        if output.status.success() {
            return Ok(HookOutcome::Success(stdout));
        }
        Ok(HookOutcome::Failure {
            output: stdout,
            cause: format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

pub fn descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "command",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("command", FieldKind::Str).required())
            .args(["command"])
            .help("Run a shell command and return its stdout"),
        HookImpl::Native(native::<CommandHook>()),
    )
}
