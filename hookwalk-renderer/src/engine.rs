//! Tera-backed [`Renderer`].
//!
//! | Template                 | Result                                  |
//! |--------------------------|-----------------------------------------|
//! | `plain`                  | returned unchanged                      |
//! | `{{ a.b }}`              | value at `a.b`, read straight from the store |
//! | `{{ xs \| length }}`     | native value via `json_encode`          |
//! | `hello {{ name }}`       | rendered string                         |

use std::error::Error as _;

use hookwalk_core::{ContextStore, Value};

use crate::context::{from_json, resolve_path, tera_context, variable_path};
use crate::error::RenderError;
use crate::gateway::{is_template, single_expression, Renderer};

const VALUE_SLOT: &str = "__hookwalk_value";

/// Stateless tera renderer; each call renders a one-off template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraRenderer;

impl TeraRenderer {
    pub fn new() -> Self {
        Self
    }

    fn one_off(&self, source: &str, template: &str, ctx: &ContextStore) -> Result<String, RenderError> {
        let tera_ctx = tera_context(ctx)?;
        tera::Tera::one_off(source, &tera_ctx, false).map_err(|e| classify(e, template))
    }
}

impl Renderer for TeraRenderer {
    fn render_str(&self, template: &str, ctx: &ContextStore) -> Result<Value, RenderError> {
        if !is_template(template) {
            return Ok(Value::String(template.to_owned()));
        }
        match single_expression(template) {
            Some(expr) => self.evaluate(expr, ctx).map_err(|e| retemplate(e, template)),
            None => self.one_off(template, template, ctx).map(Value::String),
        }
    }

    fn evaluate(&self, expression: &str, ctx: &ContextStore) -> Result<Value, RenderError> {
        let literal = matches!(expression, "true" | "false" | "True" | "False");
        if let Some(parts) = variable_path(expression).filter(|_| !literal) {
            if let Some(v) = resolve_path(ctx, &parts) {
                return Ok(v.clone());
            }
            if ctx.lookup(parts[0]).is_none() {
                return Err(RenderError::UndefinedVariable {
                    name: parts[0].to_owned(),
                    template: expression.to_owned(),
                });
            }
        }
        let source = format!(
            "{{% set {VALUE_SLOT} = {expression} %}}{{{{ {VALUE_SLOT} | json_encode() }}}}"
        );
        let out = self.one_off(&source, expression, ctx)?;
        tracing::trace!(expression, out = %out, "evaluated expression");
        Ok(from_json(serde_json::from_str(&out)?))
    }
}

/// Map a tera error onto [`RenderError`], pulling the variable name out of
/// "Variable `x` not found in context" anywhere in the source chain.
fn classify(err: tera::Error, template: &str) -> RenderError {
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        messages.push(s.to_string());
        source = s.source();
    }
    for msg in &messages {
        if msg.contains("not found in context") {
            let name = msg
                .split('`')
                .nth(1)
                .unwrap_or_default()
                .to_owned();
            return RenderError::UndefinedVariable {
                name,
                template: template.to_owned(),
            };
        }
    }
    RenderError::Template {
        template: template.to_owned(),
        message: messages.join(": "),
    }
}

fn retemplate(err: RenderError, template: &str) -> RenderError {
    match err {
        RenderError::UndefinedVariable { name, .. } => RenderError::UndefinedVariable {
            name,
            template: template.to_owned(),
        },
        RenderError::Template { message, .. } => RenderError::Template {
            template: template.to_owned(),
            message,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
