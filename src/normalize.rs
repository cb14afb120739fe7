//! Flattening of cause graphs into the sequence every encoder renders.
//!
//! A [`StructuredError`] may hold arbitrary causes: plain errors, wrappers
//! around other errors, fan-out wrappers, other structured errors, and
//! absent entries. [`normalize`] turns them into a flat list of [`Entry`]
//! values so all encoders agree on what the `errors` section contains.
//!
//! For each candidate, in order:
//!
//! 1. An absent candidate is kept as [`Entry::Absent`].
//! 2. A candidate that is itself a structured error is kept as
//!    [`Entry::Structured`].
//! 3. Past the configured maximum depth nothing is unwrapped any more and the
//!    candidate is emitted as-is.
//! 4. A candidate wrapping two or more causes is replaced in place by those
//!    causes, each normalized one level deeper.
//! 5. A candidate whose single wrapped cause chain leads to a structured
//!    error is replaced by that structured error. The wrapper's own message
//!    is dropped.
//! 6. Anything else is kept as [`Entry::Opaque`].
//!
//! Normalization borrows from the input and allocates only the output list.

use core::error::Error;

use crate::{EncodeConfig, ErrorRef, StructuredError};

/// One element of a normalized `errors` section.
#[derive(Copy, Clone, Debug)]
pub enum Entry<'a> {
    /// An absent cause. Renders with the sentinel message.
    Absent,
    /// A structured error, rendered in full one level deeper.
    Structured(&'a StructuredError),
    /// Any other error, rendered as its trimmed message.
    Opaque(&'a (dyn Error + 'static)),
    /// A structured error reached past the maximum depth, rendered as its
    /// message only.
    Message(&'a str),
}

/// Normalizes the causes of an error being rendered at `depth`.
pub fn normalize<'a>(
    errors: &'a [Option<ErrorRef>],
    depth: usize,
    config: &EncodeConfig,
) -> Vec<Entry<'a>> {
    let mut entries = Vec::with_capacity(errors.len());
    for candidate in errors {
        push_candidate(&mut entries, candidate.as_ref(), depth, config);
    }
    entries
}

fn push_candidate<'a>(
    entries: &mut Vec<Entry<'a>>,
    candidate: Option<&'a ErrorRef>,
    depth: usize,
    config: &EncodeConfig,
) {
    let Some(candidate) = candidate else {
        entries.push(Entry::Absent);
        return;
    };

    if depth > config.max_depth {
        tracing::debug!(
            depth,
            max_depth = config.max_depth,
            "structured error nesting exceeds the maximum depth, emitting message only"
        );
        entries.push(match candidate.as_structured() {
            Some(structured) => Entry::Message(structured.message()),
            None => Entry::Opaque(candidate.as_error()),
        });
        return;
    }

    if let Some(structured) = candidate.as_structured() {
        entries.push(Entry::Structured(structured));
        return;
    }

    match candidate.multi_causes() {
        Some(children) if children.len() >= 2 => {
            for child in children {
                push_candidate(entries, child.as_ref(), depth + 1, config);
            }
        }
        Some([Some(only)]) => match structured_in_chain(only, depth, config) {
            Some(structured) => entries.push(Entry::Structured(structured)),
            None => entries.push(Entry::Opaque(candidate.as_error())),
        },
        Some(_) => entries.push(Entry::Opaque(candidate.as_error())),
        None => match candidate.as_error().source() {
            Some(source) => match structured_in_source_chain(source, depth, config) {
                Some(structured) => entries.push(Entry::Structured(structured)),
                None => entries.push(Entry::Opaque(candidate.as_error())),
            },
            None => entries.push(Entry::Opaque(candidate.as_error())),
        },
    }
}

fn structured_in_chain<'a>(
    cause: &'a ErrorRef,
    depth: usize,
    config: &EncodeConfig,
) -> Option<&'a StructuredError> {
    if let Some(structured) = cause.as_structured() {
        return Some(structured);
    }
    structured_in_source_chain(cause.as_error(), depth + 1, config)
}

/// Walks a `source()` chain looking for a structured error. The walk stops at
/// the maximum depth, so a chain that loops back on itself terminates.
fn structured_in_source_chain<'a>(
    mut current: &'a (dyn Error + 'static),
    mut depth: usize,
    config: &EncodeConfig,
) -> Option<&'a StructuredError> {
    loop {
        if let Some(structured) = current.downcast_ref::<StructuredError>() {
            return Some(structured);
        }
        if let Some(structured) = current
            .downcast_ref::<ErrorRef>()
            .and_then(|handle| handle.as_structured())
        {
            return Some(structured);
        }
        if depth >= config.max_depth {
            return None;
        }
        depth += 1;
        current = current.source()?;
    }
}

#[cfg(test)]
mod tests {
    use core::fmt;

    use super::*;
    use crate::{Wrapped, cause};

    #[derive(Debug, thiserror::Error)]
    #[error("plain")]
    struct Plain;

    #[derive(Debug, thiserror::Error)]
    #[error("outer context")]
    struct Outer(#[source] StructuredError);

    /// An error whose source is itself.
    #[derive(Debug)]
    struct Ouroboros;

    impl fmt::Display for Ouroboros {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ouroboros")
        }
    }

    impl Error for Ouroboros {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self)
        }
    }

    fn config() -> EncodeConfig {
        EncodeConfig::new(10)
    }

    #[test]
    fn test_absent_and_plain_are_kept() {
        let errors = [None, Some(cause(Plain))];
        let entries = normalize(&errors, 0, &config());
        assert!(matches!(entries[..], [Entry::Absent, Entry::Opaque(_)]));
    }

    #[test]
    fn test_single_structured_cause_replaces_wrapper() {
        let inner = StructuredError::new("inner");
        let errors = [Some(ErrorRef::new(Wrapped::new("text", inner)))];
        let entries = normalize(&errors, 0, &config());
        let [Entry::Structured(found)] = entries[..] else {
            panic!("expected one structured entry, got {entries:?}");
        };
        assert_eq!(found.message(), "inner");
    }

    #[test]
    fn test_source_chain_reaches_structured_error() {
        let errors = [Some(cause(Outer(StructuredError::new("deep"))))];
        let entries = normalize(&errors, 0, &config());
        assert!(matches!(entries[..], [Entry::Structured(s)] if s.message() == "deep"));
    }

    #[test]
    fn test_fan_out_is_spliced_in_place() {
        let fan = Wrapped::fan_out("two", [cause(Plain), ErrorRef::new(StructuredError::new("b"))]);
        let errors = [Some(cause(Plain)), Some(ErrorRef::new(fan)), None];
        let entries = normalize(&errors, 0, &config());
        assert!(matches!(
            entries[..],
            [Entry::Opaque(_), Entry::Opaque(_), Entry::Structured(_), Entry::Absent]
        ));
    }

    #[test]
    fn test_self_sourcing_error_terminates() {
        let errors = [Some(cause(Ouroboros))];
        let entries = normalize(&errors, 0, &config());
        assert!(matches!(entries[..], [Entry::Opaque(_)]));
    }

    #[test]
    fn test_past_max_depth_emits_message_only() {
        let errors = [Some(ErrorRef::new(StructuredError::new("far")))];
        let entries = normalize(&errors, 11, &config());
        assert!(matches!(entries[..], [Entry::Message("far")]));
    }
}
