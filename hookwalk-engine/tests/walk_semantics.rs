//! Interpreter semantics: ordering, scoping, conditionals, loops, merge.

mod common;

use common::{mapping, walk};
use hookwalk_core::Value;
use hookwalk_engine::EngineError;

#[test]
fn calls_run_in_declaration_order() {
    let out = walk(
        r#"
a: 1
b->: var a
c->: "{{ b }}-x"
_p->: literal secret
d->: var "{{ _p }}"
"#,
    )
    .unwrap();
    assert_eq!(out, mapping("{a: 1, b: 1, c: 1-x, d: secret}"));
}

#[test]
fn forward_reference_is_an_undefined_variable() {
    let err = walk(r#"{a: {type: var, input: "{{b}}"}, b: x}"#).unwrap_err();
    assert!(err.is_undefined_variable(), "got: {err}");
    assert_eq!(err.key_path(), Some("a"));

    let out = walk(r#"{b: x, a: {type: var, input: "{{b}}"}}"#).unwrap();
    assert_eq!(out, mapping("{b: x, a: x}"));
}

#[test]
fn loops_run_once_per_element_with_fresh_scopes() {
    let out = walk(
        r#"
items: [1, 2, 3]
conf: {x: 1, y: 2}
doubled->: var "{{ item * 2 }}" --loop items
indexes:
  type: var
  input: "{{ index }}"
  loop: items
pairs:
  type: var
  input: "{{ k }}={{ v }}"
  loop: k, v in conf
odd:
  type: var
  input: "{{ n }}"
  loop: n in items
  if: n % 2 == 1
backwards->: var "{{ item }}" --loop items --reverse
"#,
    )
    .unwrap();
    assert_eq!(out.get("doubled"), Some(&serde_yaml::from_str::<Value>("[2, 4, 6]").unwrap()));
    assert_eq!(out.get("indexes"), Some(&serde_yaml::from_str::<Value>("[0, 1, 2]").unwrap()));
    assert_eq!(out.get("pairs"), Some(&serde_yaml::from_str::<Value>("[x=1, y=2]").unwrap()));
    assert_eq!(out.get("odd"), Some(&serde_yaml::from_str::<Value>("[1, 3]").unwrap()));
    assert_eq!(out.get("backwards"), Some(&serde_yaml::from_str::<Value>("[3, 2, 1]").unwrap()));
    for temp in ["item", "index", "k", "v", "n"] {
        assert!(out.get(temp).is_none(), "loop variable '{temp}' leaked");
    }
}

#[test]
fn sibling_list_blocks_in_a_loop_do_not_share_lists() {
    let out = walk(
        r#"
out:
  type: block
  loop: [1, 2]
  items:
    first->: [x, y]
    second->: [x, y]
    n->: var item
"#,
    )
    .unwrap();
    let expected = mapping(
        "{out: [{first: [x, y], second: [x, y], n: 1}, {first: [x, y], second: [x, y], n: 2}]}",
    );
    assert_eq!(out, expected);
}

#[test]
fn when_else_chains_assign_exactly_one_branch() {
    let out = walk(
        r#"
env: prod
size:
  type: literal
  input: large
  when: env == 'dev'
  else:
    type: literal
    input: medium
    when: "{{ env == 'prod' }}"
    else: small
fallback:
  type: literal
  input: a
  when: [true, false]
  else: "{{ env }}-default"
flag:
  type: literal
  input: a
  when: false
  else: true
skipped->: literal x --when false
"#,
    )
    .unwrap();
    assert_eq!(out.get("size"), Some(&Value::from("medium")));
    assert_eq!(out.get("fallback"), Some(&Value::from("prod-default")));
    assert_eq!(out.get("flag"), Some(&Value::Bool(true)));
    assert!(out.get("skipped").is_none());
}

#[test]
fn block_private_keys_stay_inside() {
    let out = walk(
        r#"
_top: 5
outer->:
  visible: 1
  _hidden: 2
  sum->: var "{{ visible + _hidden + _top }}"
"#,
    )
    .unwrap();
    assert_eq!(out, mapping("{outer: {visible: 1, sum: 8}}"));
}

#[test]
fn private_arrow_writes_nothing_public() {
    let out = walk("{a_>: literal 1, b->: var a}").unwrap();
    assert_eq!(out, mapping("{b: 1}"));
}

#[test]
fn merge_flattens_into_the_parent() {
    let out = walk(
        r#"
top:
  type: literal
  input: {x: 1, y: 2}
  merge: true
nested:
  keep: 0
  ->:
    loop: [a, b]
    merge: true
    k->: var item
"#,
    )
    .unwrap();
    assert_eq!(out, mapping("{x: 1, y: 2, nested: {keep: 0, k: b}}"));
}

#[test]
fn merging_a_scalar_fails() {
    let err = walk("{a: {type: literal, input: 3, merge: true}}").unwrap_err();
    assert!(matches!(err.root_cause(), EngineError::Merge { .. }), "got: {err}");
    assert_eq!(err.key_path(), Some("a"));
}

#[test]
fn list_to_block_preserves_order() {
    let out = walk(
        r#"
a: z
l->: [1, "{{ a }}", {"->": literal lit}, {x: "{{ a }}"}, {"->": literal no, when: false}]
"#,
    )
    .unwrap();
    assert_eq!(out.get("l"), Some(&serde_yaml::from_str::<Value>("[1, z, lit, {x: z}]").unwrap()));
}

#[test]
fn discarded_results_leave_no_key() {
    let out = walk("{'->': literal 1, a: 2}").unwrap();
    assert_eq!(out, mapping("{a: 2}"));
}

#[test]
fn match_picks_a_case() {
    let out = walk(
        r#"
env: dev
size:
  type: match
  value: env
  case:
    prod: large
    dev: "{{ env }}-small"
    _: medium
"#,
    )
    .unwrap();
    assert_eq!(out.get("size"), Some(&Value::from("dev-small")));
}

#[test]
fn unknown_hook_type_lists_known_types() {
    let err = walk("{a->: nosuch 1}").unwrap_err();
    assert_eq!(err.key_path(), Some("a"));
    let msg = err.to_string();
    assert!(msg.contains("nosuch") && msg.contains("literal"), "got: {msg}");
}

#[test]
fn missing_required_field_names_the_key() {
    let err = walk("{outer: {inner: {type: var}}}").unwrap_err();
    assert_eq!(err.key_path(), Some("outer.inner"));
    assert!(err.to_string().contains("missing required field 'input'"), "got: {err}");
}

#[test]
fn quoted_arguments_inside_compact_templates_survive() {
    let out = walk("a->: var {{ missing | default(value='fallback') }}\n").unwrap();
    assert_eq!(out, mapping("{a: fallback}"));
}

#[test]
fn try_assigns_except_branch_on_any_error() {
    let out = walk(
        r#"
ok->: literal fine --try
rendered:
  type: var
  input: "{{ nope }}"
  try: true
  except: "fallback {{ ok }}"
walked:
  type: nosuch
  try: true
  except:
    msg->: literal failed
    _hidden: 1
    code: 2
chained:
  type: var
  input: "{{ nope }}"
  try: true
  except:
    ->: literal second
missing->: var "{{ nope }}" --try
"#,
    )
    .unwrap();
    assert_eq!(
        out,
        mapping("{ok: fine, rendered: fallback fine, walked: {msg: failed, code: 2}, chained: second}")
    );
}

#[test]
fn errors_without_try_still_abort() {
    let err = walk("{a: {type: nosuch, except: x}}").unwrap_err();
    assert_eq!(err.key_path(), Some("a"));
}

#[cfg(unix)]
mod commands {
    use super::*;

    #[test]
    fn ignore_error_keeps_captured_output() {
        let out = walk(r#"{out->: command "echo partial; exit 3" --ignore-error}"#).unwrap();
        assert_eq!(out.get("out"), Some(&Value::from("partial")));
    }

    #[test]
    fn soft_failure_aborts_with_key_path() {
        let err = walk(r#"{ok: 1, out->: command "exit 3"}"#).unwrap_err();
        assert_eq!(err.key_path(), Some("out"));
        assert!(matches!(err.root_cause(), EngineError::Failed { .. }), "got: {err}");
    }

    #[test]
    fn try_catches_soft_failures() {
        let out = walk(r#"{out->: command "exit 3" --try --except recovered}"#).unwrap();
        assert_eq!(out.get("out"), Some(&Value::from("recovered")));
    }
}
