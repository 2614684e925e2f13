use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn hookwalk_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hookwalk"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("HOOKWALK_DIR")
        .env_remove("HOOKWALK_PROVIDER_DIR")
        .env_remove("HOOKWALK_REPLAY_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn project(doc: &str) -> (TempDir, TempDir) {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    fs::write(work.path().join("hookwalk.yaml"), doc).expect("write document");
    (home, work)
}

const GREETING: &str = "name->: input --default alice\ngreeting->: var \"hello {{ name }}\"\n_hidden: 1\n";

#[test]
fn run_prints_public_context_as_yaml() {
    let (home, work) = project(GREETING);
    hookwalk_cmd(home.path())
        .args(["run", "--no-input"])
        .arg(work.path())
        .assert()
        .success()
        .stdout(contains("greeting: hello alice"))
        .stdout(contains("_hidden").not())
        .stderr(contains("done"));
}

#[test]
fn run_prints_json_when_asked() {
    let (home, work) = project(GREETING);
    let assert = hookwalk_cmd(home.path())
        .args(["run", "--no-input", "--format", "json"])
        .arg(work.path())
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(parsed, serde_json::json!({"name": "alice", "greeting": "hello alice"}));
}

#[test]
fn context_and_overwrite_files_feed_the_run() {
    let (home, work) = project("out->: var \"{{ who }}\"\nname->: input --default x\n");
    let context = work.path().join("ctx.json");
    fs::write(&context, r#"{"who": "bea"}"#).unwrap();
    let overwrite = work.path().join("over.yaml");
    fs::write(&overwrite, "name: zed\n").unwrap();

    hookwalk_cmd(home.path())
        .args(["run", "--no-input", "--context"])
        .arg(&context)
        .arg("--overwrite")
        .arg(&overwrite)
        .arg(work.path().join("hookwalk.yaml"))
        .assert()
        .success()
        .stdout(contains("out: bea"))
        .stdout(contains("name: zed"));
}

#[test]
fn record_and_replay_through_explicit_paths() {
    let (home, work) = project(GREETING);
    let record = work.path().join("answers.yaml");
    hookwalk_cmd(home.path())
        .args(["run", "--no-input"])
        .arg(format!("--record={}", record.display()))
        .arg(work.path())
        .assert()
        .success();
    assert!(fs::read_to_string(&record).unwrap().contains("name: alice"));

    fs::write(&record, "name: cy\n").unwrap();
    hookwalk_cmd(home.path())
        .arg("run")
        .arg(format!("--replay={}", record.display()))
        .arg(work.path())
        .assert()
        .success()
        .stdout(contains("greeting: hello cy"));
}

#[test]
fn bare_record_flag_writes_under_home() {
    let (home, work) = project(GREETING);
    hookwalk_cmd(home.path())
        .args(["run", "--no-input", "--record"])
        .arg(work.path().join("hookwalk.yaml"))
        .assert()
        .success();
    let name = work.path().file_name().unwrap().to_string_lossy().into_owned();
    let expected = home.path().join(".hookwalk/replay").join(format!("{name}.yaml"));
    assert!(expected.is_file(), "missing {}", expected.display());
}

#[test]
fn failures_exit_nonzero_and_name_the_key() {
    let (home, work) = project("a: 1\nbroken->: var \"{{ nope }}\"\n");
    hookwalk_cmd(home.path())
        .args(["run", "--no-input"])
        .arg(work.path())
        .assert()
        .failure()
        .stderr(contains("broken"))
        .stderr(contains("nope"));
}

#[test]
fn hooks_lists_builtin_and_local_types() {
    let (home, work) = project("x: 1\n");
    fs::create_dir_all(work.path().join("hooks")).unwrap();
    fs::write(
        work.path().join("hooks/greet.yaml"),
        "greet:\n  help: Say hello\n  exec: {message: hi}\n",
    )
    .unwrap();

    hookwalk_cmd(home.path())
        .arg("hooks")
        .arg(work.path())
        .assert()
        .success()
        .stdout(contains("greet"))
        .stdout(contains("Say hello"))
        .stdout(contains("command"))
        .stdout(contains("builtin"));
}
