//! `var`: render an expression, then keep rendering the result until it
//! stops changing.

use serde::Deserialize;

use hookwalk_core::Value;
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

/// Upper bound on re-render passes; a value that still changes after this
/// many passes is returned as-is.
const MAX_PASSES: usize = 16;

#[derive(Debug, Deserialize)]
pub struct VarHook {
    pub input: Value,
}

impl Hook for VarHook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        let mut current = self.input.clone();
        for _ in 0..MAX_PASSES {
            let next = env.render(&current)?;
            if next == current {
                break;
            }
            current = next;
        }
        Ok(HookOutcome::Success(current))
    }
}

pub fn descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "var",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("input", FieldKind::Any).required().render_by_default())
            .args(["input"])
            .help("Render a variable"),
        HookImpl::Native(native::<VarHook>()),
    )
}
