//! `match`: pick a branch by value.
//!
//! ```yaml
//! size->: match
//!   value: env
//!   case:
//!     prod: large
//!     dev: small
//!     _: medium
//! ```
//!
//! `case` stays unrendered until a branch is chosen, so templates in the
//! branches that are not taken never run.

use serde::Deserialize;

use hookwalk_core::{types::key_to_string, Mapping, Value};
use hookwalk_registry::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookDescriptor, HookError, HookImpl,
    HookOutcome, HookSchema, HookSource,
};

const DEFAULT_CASE: &str = "_";

#[derive(Debug, Deserialize)]
pub struct MatchHook {
    pub value: Value,
    pub case: Mapping,
}

fn same(key: &Value, value: &Value) -> bool {
    if key == value {
        return true;
    }
    // scalars compare by their string form: `1` matches "1"
    match (key_to_string(key), key_to_string(value)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl Hook for MatchHook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError> {
        let chosen = self
            .case
            .iter()
            .find(|(k, _)| k.as_str() != Some(DEFAULT_CASE) && same(k, &self.value))
            .or_else(|| self.case.iter().find(|(k, _)| k.as_str() == Some(DEFAULT_CASE)))
            .map(|(_, v)| v);
        match chosen {
            Some(branch) => Ok(HookOutcome::Success(env.render(branch)?)),
            None => Err(HookError::Invalid(format!(
                "no case matches {} and no '_' default is given",
                serde_yaml::to_string(&self.value).unwrap_or_default().trim_end()
            ))),
        }
    }
}

pub fn descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "match",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("value", FieldKind::Any).required().render_by_default())
            .field(FieldSpec::new("case", FieldKind::Map).required().lazy())
            .args(["value"])
            .help("Choose a case by value; `_` is the fallback"),
        HookImpl::Native(native::<MatchHook>()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::exec;
    use hookwalk_core::ContextStore;

    fn hook(value: Value, cases: &str) -> MatchHook {
        MatchHook { value, case: serde_yaml::from_str(cases).unwrap() }
    }

    #[test]
    fn picks_matching_case_and_renders_it() {
        let ctx = ContextStore::new(serde_yaml::from_str("{size: 3}").unwrap());
        let h = hook(Value::from("prod"), "{prod: '{{ size * 2 }}', dev: '{{ missing }}'}");
        assert_eq!(exec(&h, &ctx, true).unwrap(), HookOutcome::Success(Value::from(6)));
    }

    #[test]
    fn falls_back_to_underscore() {
        let h = hook(Value::from("qa"), "{prod: a, _: fallback}");
        assert_eq!(
            exec(&h, &ContextStore::default(), true).unwrap(),
            HookOutcome::Success(Value::from("fallback"))
        );
    }

    #[test]
    fn numbers_match_string_keys() {
        let h = hook(Value::from(1), "{'1': one}");
        assert_eq!(
            exec(&h, &ContextStore::default(), true).unwrap(),
            HookOutcome::Success(Value::from("one"))
        );
    }

    #[test]
    fn no_match_without_default_is_an_error() {
        let h = hook(Value::from("x"), "{a: 1}");
        let err = exec(&h, &ContextStore::default(), true).unwrap_err();
        assert!(matches!(err, HookError::Invalid(_)));
    }
}
