//! Interactive prompts: `input` and `confirm`.
//!
//! Both read a line from stdin after writing the prompt to stderr, so
//! stdout stays clean for a run's output. With `no_input` set they return
//! their default without touching the terminal.

use std::io::{self, BufRead, Write};

use serde::Deserialize;

use hookwalk_core::Value;
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

fn prompt_text(message: Option<&str>, env: &ExecEnv<'_>) -> String {
    match message {
        Some(m) => m.to_owned(),
        None => format!("{} >>>", env.key_path),
    }
}

/// Write `prompt` to stderr and read one line, without the newline.
/// `None` on end of input.
fn read_line(prompt: &str) -> Result<Option<String>, HookError> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{prompt} ").map_err(HookError::Input)?;
    stderr.flush().map_err(HookError::Input)?;
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line).map_err(HookError::Input)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
}

// ---------------------------------------------------------------------------
// input
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct InputHook {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
}

impl Hook for InputHook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        let fallback = self.default.clone().unwrap_or_else(|| Value::from(""));
        if env.no_input {
            return Ok(HookOutcome::Success(fallback));
        }
        let prompt = match &self.default {
            Some(Value::String(d)) if !d.is_empty() => {
                format!("{} [{d}]", prompt_text(self.message.as_deref(), env))
            }
            _ => prompt_text(self.message.as_deref(), env),
        };
        let answer = match read_line(&prompt)? {
            Some(line) if !line.is_empty() => Value::String(line),
            _ => fallback,
        };
        Ok(HookOutcome::Success(answer))
    }
}

pub fn input_descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "input",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("message", FieldKind::Str))
            .field(FieldSpec::new("default", FieldKind::Any))
            .args(["message"])
            .interactive()
            .help("Read a line of text"),
        HookImpl::Native(native::<InputHook>()),
    )
}

// ---------------------------------------------------------------------------
// confirm
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ConfirmHook {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub default: bool,
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl Hook for ConfirmHook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        if env.no_input {
            return Ok(HookOutcome::Success(Value::Bool(self.default)));
        }
        let hint = if self.default { "[Y/n]" } else { "[y/N]" };
        let prompt = format!("{} {hint}", prompt_text(self.message.as_deref(), env));
        loop {
            let Some(line) = read_line(&prompt)? else {
                return Ok(HookOutcome::Success(Value::Bool(self.default)));
            };
            if line.trim().is_empty() {
                return Ok(HookOutcome::Success(Value::Bool(self.default)));
            }
            match parse_answer(&line) {
                Some(b) => return Ok(HookOutcome::Success(Value::Bool(b))),
                None => eprintln!("please answer yes or no"),
            }
        }
    }
}

pub fn confirm_descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "confirm",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("message", FieldKind::Str))
            .field(FieldSpec::new("default", FieldKind::Bool).default_value(false))
            .args(["message"])
            .interactive()
            .help("Ask a yes/no question"),
        HookImpl::Native(native::<ConfirmHook>()),
    )
}
