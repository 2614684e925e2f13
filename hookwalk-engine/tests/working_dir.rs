//! Working-directory changes. Kept in its own test binary because the
//! current directory is process-wide.

mod common;

use assert_fs::prelude::*;

use common::{canonical, options, run};
use hookwalk_core::Value;

#[cfg(unix)]
#[test]
fn output_dir_and_chdir_scope_the_working_directory() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("out/sub").create_dir_all().unwrap();
    let before = std::env::current_dir().unwrap();

    let mut opts = options(
        tmp.path(),
        r#"
here->: command pwd
there->: command pwd --chdir sub
back->: command pwd
"#,
    );
    let out_dir = tmp.path().join("out");
    opts.output_dir = Some(out_dir.clone());
    let out = run(opts).unwrap();

    let out_dir = canonical(&out_dir);
    assert_eq!(out.get("here"), Some(&Value::from(out_dir.to_string_lossy().as_ref())));
    assert_eq!(
        out.get("there"),
        Some(&Value::from(out_dir.join("sub").to_string_lossy().as_ref()))
    );
    assert_eq!(out.get("back"), out.get("here"));
    assert_eq!(std::env::current_dir().unwrap(), before);
}
