//! Record, replay, rerun and overwrite through full runs.

mod common;

use assert_fs::prelude::*;
use predicates::prelude::*;

use common::{mapping, options, run};
use hookwalk_core::Value;
use hookwalk_engine::{EngineError, Overwrite, Recording};

const DOC: &str = r#"
name->: input --default alice
greeting->: var "hello {{ name }}"
"#;

#[test]
fn record_then_replay_reproduces_public_output() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let record = tmp.child("inputs.yaml");

    let mut first = options(tmp.path(), DOC);
    first.record = Recording::Path(record.path().to_path_buf());
    let original = run(first).unwrap();
    assert_eq!(original, mapping("{name: alice, greeting: hello alice}"));
    record.assert(predicate::str::contains("name: alice"));

    let mut again = options(tmp.path(), DOC);
    again.replay = Recording::Path(record.path().to_path_buf());
    assert_eq!(run(again).unwrap(), original);
}

#[test]
fn replayed_values_replace_interactive_nodes() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let record = tmp.child("inputs.yaml");
    record.write_str("name: bob\n").unwrap();

    let mut opts = options(tmp.path(), DOC);
    // prompting would block; the override must keep the hook from running
    opts.no_input = false;
    opts.replay = Recording::Path(record.path().to_path_buf());
    let out = run(opts).unwrap();
    assert_eq!(out.get("greeting"), Some(&Value::from("hello bob")));
}

#[test]
fn default_record_location_is_under_replay_dir() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let project = tmp.child("site");
    project.create_dir_all().unwrap();
    let mut opts = options(project.path(), DOC);
    opts.record = Recording::Default;
    let replay_dir = opts.settings.replay_dir.clone();
    run(opts).unwrap();
    assert!(replay_dir.join("site.yaml").is_file());
}

#[test]
fn missing_replay_file_is_an_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut opts = options(tmp.path(), DOC);
    opts.replay = Recording::Path(tmp.path().join("absent.yaml"));
    let err = run(opts).unwrap_err();
    assert!(matches!(err, EngineError::Source { .. }), "got: {err}");
}

#[test]
fn rerun_file_is_written_even_when_the_run_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let broken = r#"
name->: input --default carol
oops->: var "{{ missing }}"
"#;
    let mut opts = options(tmp.path(), broken);
    opts.rerun = Recording::Default;
    let err = run(opts).unwrap_err();
    assert!(err.is_undefined_variable(), "got: {err}");

    let rerun = tmp.child(".hookwalk.rerun.yaml");
    rerun.assert(predicate::str::contains("name: carol"));

    // fix the document and resume; the recorded answer is reused
    rerun.write_str("name: dave\n").unwrap();
    let mut fixed = options(tmp.path(), DOC);
    fixed.rerun = Recording::Default;
    let out = run(fixed).unwrap();
    assert_eq!(out, mapping("{name: dave, greeting: hello dave}"));
    rerun.assert(predicate::str::contains("name: dave"));
}

#[test]
fn overwrite_inputs_skip_nodes() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut opts = options(tmp.path(), DOC);
    opts.overwrite_inputs = Some(Overwrite::Inline(mapping("{greeting: hi}")));
    let out = run(opts).unwrap();
    assert_eq!(out, mapping("{name: alice, greeting: hi}"));

    let file = tmp.child("over.yaml");
    file.write_str("name: erin\n").unwrap();
    let mut opts = options(tmp.path(), DOC);
    opts.overwrite_inputs = Some(Overwrite::File(file.path().to_path_buf()));
    let out = run(opts).unwrap();
    // an overwritten node is not executed, but later templates still see
    // the value it was assigned
    assert_eq!(out, mapping("{name: erin, greeting: hello erin}"));
}

#[test]
fn existing_context_and_default_context_seed_rendering() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut opts = options(tmp.path(), "out->: var \"{{ who }}/{{ team }}\"\n");
    opts.settings.default_context = mapping("{who: nobody, team: core}");
    opts.existing_context = mapping("{who: frank}");
    let out = run(opts).unwrap();
    assert_eq!(out, mapping("{out: frank/core}"));
}

const ASK: &str = r#"
ask:
  interactive: true
  fields: {k: str}
  exec:
    x: 1
    y->: var k
"#;

#[test]
fn replay_keeps_merged_results_flattened() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("hooks/ask.yaml").write_str(ASK).unwrap();
    let doc = r#"
cfg:
  type: ask
  k: one
  merge: true
"#;
    let record = tmp.child("inputs.yaml");

    let mut first = options(tmp.path(), doc);
    first.record = Recording::Path(record.path().to_path_buf());
    let original = run(first).unwrap();
    assert_eq!(original, mapping("{x: 1, y: one}"));

    let mut again = options(tmp.path(), doc);
    again.replay = Recording::Path(record.path().to_path_buf());
    assert_eq!(run(again).unwrap(), original);
}

#[test]
fn replay_keeps_looped_merges_flattened() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("hooks/ask.yaml").write_str(ASK).unwrap();
    let doc = r#"
cfg:
  type: ask
  k: "{{ item }}"
  loop: [a, b]
  merge: true
"#;
    let record = tmp.child("inputs.yaml");

    let mut first = options(tmp.path(), doc);
    first.record = Recording::Path(record.path().to_path_buf());
    let original = run(first).unwrap();
    assert_eq!(original, mapping("{x: 1, y: b}"));

    let mut again = options(tmp.path(), doc);
    again.replay = Recording::Path(record.path().to_path_buf());
    assert_eq!(run(again).unwrap(), original);
}

#[test]
fn overwritten_call_with_false_condition_is_skipped() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut opts = options(tmp.path(), "a->: literal 1 --when false\nb->: literal 2\n");
    opts.overwrite_inputs = Some(Overwrite::Inline(mapping("{a: 9, b: 8}")));
    assert_eq!(run(opts).unwrap(), mapping("{b: 8}"));
}
