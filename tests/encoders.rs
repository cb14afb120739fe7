use std::{
    error::Error,
    fmt,
    sync::{Arc, OnceLock},
};

use structerr::{
    Attr, Cause, EncodeConfig, ErrorRef, NIL_VALUE, StructuredError, Wrapped, cause,
    encode::{fields, json, text},
};

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
struct DiskFull;

fn every_rendering(error: Option<&StructuredError>, config: &EncodeConfig) -> Vec<String> {
    let sections = fields::sections(error, config);
    vec![
        text::render(error, config),
        json::to_string(error, config).unwrap(),
        fields::FieldValue::Group(fields::into_fields(sections)).to_string(),
    ]
}

#[test]
fn message_is_rendered_verbatim() {
    let err = StructuredError::new("ledger is locked by another writer");
    for rendering in every_rendering(Some(&err), &EncodeConfig::default()) {
        assert!(
            rendering.contains("ledger is locked by another writer"),
            "{rendering}"
        );
    }
}

#[test]
fn empty_and_absent_messages_render_the_sentinel() {
    let empty = StructuredError::new("");
    for error in [Some(&empty), None] {
        for rendering in every_rendering(error, &EncodeConfig::default()) {
            assert!(rendering.contains(NIL_VALUE), "{rendering}");
            assert!(!rendering.contains("message=)"), "{rendering}");
            assert!(!rendering.contains(r#""message":"""#), "{rendering}");
        }
    }
}

#[test]
fn wrapper_prose_around_a_structured_cause_is_dropped() {
    let inner = StructuredError::new("inner failure").with_attrs([Attr::int("code", 7)]);
    let outer = StructuredError::new("outer").with_errors([Wrapped::new("text", inner)]);

    for rendering in every_rendering(Some(&outer), &EncodeConfig::default()) {
        assert!(!rendering.contains("text"), "{rendering}");
        assert!(rendering.contains("inner failure"), "{rendering}");
    }
    assert!(outer.to_string().contains("(code=7)"));
}

#[test]
fn integer_and_string_list_attrs_are_native_json() {
    let err = StructuredError::new("x").with_attrs([
        Attr::int("n", 42),
        Attr::strings("t", ["a", "b"]),
    ]);
    let json = err.to_json().unwrap();
    assert!(json.contains(r#""n":42"#), "{json}");
    assert!(json.contains(r#""t":["a","b"]"#), "{json}");
}

#[test]
fn deep_chains_are_cut_at_the_maximum_depth() {
    let mut err = StructuredError::new("level 49");
    for level in (0..49).rev() {
        err = StructuredError::new(format!("level {level}")).with_errors([err]);
    }

    let config = EncodeConfig::new(10);
    for rendering in every_rendering(Some(&err), &config) {
        assert!(rendering.contains("level 0"), "{rendering}");
        assert!(rendering.contains("level 11"), "{rendering}");
        assert!(!rendering.contains("level 49"), "{rendering}");
    }
}

struct Cyclic(Arc<OnceLock<Vec<Option<ErrorRef>>>>);

impl fmt::Debug for Cyclic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cyclic")
    }
}

impl fmt::Display for Cyclic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cyclic")
    }
}

impl Error for Cyclic {}

impl Cause for Cyclic {
    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        self.0.get().map(Vec::as_slice)
    }
}

#[test]
fn cyclic_cause_graphs_terminate() {
    let slot = Arc::new(OnceLock::new());
    let node = ErrorRef::new(Cyclic(slot.clone()));
    slot.set(vec![Some(node.clone()), None]).unwrap();

    let err = StructuredError::new("top").with_errors([node]);
    for rendering in every_rendering(Some(&err), &EncodeConfig::new(8)) {
        assert!(rendering.contains("top"), "{rendering}");
        assert!(rendering.contains("cyclic"), "{rendering}");
    }
}

#[derive(Debug)]
struct Spin;

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("spin")
    }
}

impl Error for Spin {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self)
    }
}

#[test]
fn self_sourcing_errors_terminate() {
    let err = StructuredError::new("top").with_errors([cause(Spin), cause(DiskFull)]);
    for rendering in every_rendering(Some(&err), &EncodeConfig::new(4)) {
        assert!(rendering.contains("spin"), "{rendering}");
        assert!(rendering.contains("disk full"), "{rendering}");
    }
}
