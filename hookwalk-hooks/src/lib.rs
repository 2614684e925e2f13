//! Built-in hook library.
//!
//! | Type      | Args        | Result                                         |
//! |-----------|-------------|------------------------------------------------|
//! | `var`     | `input`     | `input` rendered until it stops changing        |
//! | `literal` | `input`     | `input` verbatim, never rendered                |
//! | `block`   |             | public output of `items`, walked in a new scope |
//! | `command` | `command`   | stdout of `sh -c command`                       |
//! | `print`   | `objects`   | null; writes to stdout                          |
//! | `input`   | `message`   | a line from stdin (interactive)                 |
//! | `confirm` | `message`   | yes/no from stdin (interactive)                 |
//! | `match`   | `value`     | the `case` entry matching `value`, or `_`       |

pub mod command;
pub mod literal;
pub mod matcher;
pub mod print;
pub mod prompt;
pub mod var;

use hookwalk_registry::{
    FieldKind, FieldSpec, HookDescriptor, HookImpl, HookRegistry, HookSchema, HookSource,
    RegistryError, Scope,
};

fn block_descriptor() -> HookDescriptor {
    HookDescriptor::new(
        "block",
        HookSource::Builtin,
        HookSchema::new()
            .field(FieldSpec::new("items", FieldKind::Any).lazy().required())
            .help("Walk `items` in a fresh scope and return its public output"),
        HookImpl::Block,
    )
}

/// Every built-in descriptor, in table order.
pub fn builtin_descriptors() -> Vec<HookDescriptor> {
    vec![
        var::descriptor(),
        literal::descriptor(),
        block_descriptor(),
        command::descriptor(),
        print::descriptor(),
        prompt::input_descriptor(),
        prompt::confirm_descriptor(),
        matcher::descriptor(),
    ]
}

/// Register the built-ins in the `Builtin` scope.
pub fn register_builtins(registry: &mut HookRegistry) -> Result<(), RegistryError> {
    for d in builtin_descriptors() {
        registry.register(d, Scope::Builtin)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use hookwalk_core::{ContextStore, KeyPath};
    use hookwalk_registry::{ExecEnv, Hook, HookError, HookOutcome};
    use hookwalk_renderer::TeraRenderer;

    /// Run `hook` against `ctx` with a throwaway environment.
    pub fn exec(hook: &dyn Hook, ctx: &ContextStore, no_input: bool) -> Result<HookOutcome, HookError> {
        let renderer = TeraRenderer::new();
        let path = KeyPath::root().key("out");
        let mut env = ExecEnv {
            context: ctx,
            renderer: &renderer,
            key_path: &path,
            no_input,
        };
        hook.exec(&mut env)
    }
}
