//! `literal`: return the input without rendering it.

use serde::Deserialize;

use hookwalk_core::Value;
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

#[derive(Debug, Deserialize)]
pub struct LiteralHook {
    pub input: Value,
}

impl Hook for LiteralHook {
    fn exec(&self, _env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        Ok(HookOutcome::Success(self.input.clone()))
    }
}

pub fn descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "literal",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("input", FieldKind::Any).required().lazy())
            .args(["input"])
            .help("Return the input verbatim"),
        HookImpl::Native(native::<LiteralHook>()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::exec;
    use hookwalk_core::ContextStore;

    #[test]
    fn templates_are_left_alone() {
        let hook = LiteralHook { input: Value::from("{{ not_rendered }}") };
        let out = exec(&hook, &ContextStore::default(), true).unwrap();
        assert_eq!(out, HookOutcome::Success(Value::from("{{ not_rendered }}")));
    }
}
