//! Rendering against a populated context store.

use hookwalk_core::{ContextStore, FrameKind, Mapping, Tier, Value};
use hookwalk_renderer::{RenderError, Renderer, TeraRenderer};
use rstest::rstest;

fn populated() -> ContextStore {
    let existing: Mapping =
        serde_yaml::from_str("{env: prod, region: eu, ports: [80, 443]}").unwrap();
    let mut store = ContextStore::new(existing);
    store.set(Tier::Public, "env", Value::from("staging")).unwrap();
    store.set(Tier::Private, "_secret", Value::from("s3cr3t")).unwrap();
    store
}

#[rstest]
#[case("{{ env }}", "staging")]
#[case("{{ region }}", "eu")]
#[case("{{ _secret }}", "s3cr3t")]
#[case("{{ env | upper }}-{{ region }}", "STAGING-eu")]
#[case("{% if ports | length > 1 %}many{% else %}one{% endif %}", "many")]
fn renders_against_all_tiers(#[case] template: &str, #[case] expected: &str) {
    let r = TeraRenderer::new();
    assert_eq!(r.render_str(template, &populated()).unwrap(), Value::from(expected));
}

#[test]
fn expressions_over_lists_return_native_values() {
    let r = TeraRenderer::new();
    let v = r.render_str("{{ ports | first }}", &populated()).unwrap();
    assert_eq!(v, Value::from(80));
    let v = r.render_str("{{ ports.1 }}", &populated()).unwrap();
    assert_eq!(v, Value::from(443));
}

#[test]
fn names_from_a_popped_scope_are_undefined() {
    let r = TeraRenderer::new();
    let mut store = populated();
    store.push_scope(FrameKind::Loop);
    store.set(Tier::Temporary, "item", Value::from(1)).unwrap();
    assert_eq!(r.render_str("{{ item }}", &store).unwrap(), Value::from(1));
    store.pop_scope().unwrap();

    let err = r.render_str("{{ item }}", &store).unwrap_err();
    assert!(matches!(err, RenderError::UndefinedVariable { ref name, .. } if name == "item"));
}
