//! `print`: write a value to stdout.

use serde::Deserialize;

use hookwalk_core::Value;
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

#[derive(Debug, Deserialize)]
pub struct PrintHook {
    #[serde(default)]
    pub objects: Value,
}

/// Strings print bare; everything else prints as YAML.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}

impl Hook for PrintHook {
    fn exec(&self, _env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        println!("{}", display(&self.objects));
        Ok(HookOutcome::Success(Value::Null))
    }
}

pub fn descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "print",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("objects", FieldKind::Any))
            .args(["objects"])
            .help("Print a value"),
        HookImpl::Native(native::<PrintHook>()),
    )
}
