//! Runs in its own process: changes the process-wide default depth.

use structerr::{EncodeConfig, StructuredError, default_max_depth, set_default_max_depth};

fn chain(depth: usize) -> StructuredError {
    let mut err = StructuredError::new(format!("l{depth}"));
    for level in (0..depth).rev() {
        err = StructuredError::new(format!("l{level}")).with_errors([err]);
    }
    err
}

#[test]
fn default_depth_override_applies_to_new_configs() {
    let before = EncodeConfig::default();

    set_default_max_depth(1);
    assert_eq!(default_max_depth(), 1);
    assert_eq!(EncodeConfig::default().max_depth, 1);

    let err = chain(4);
    let rendered = err.to_string();
    assert!(rendered.contains("(message=l3)"));
    assert!(!rendered.contains("l4"));
    assert!(err.to_text(&before).contains("l4"));
}
