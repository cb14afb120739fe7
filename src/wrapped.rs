use core::{error::Error, fmt};

use crate::{Cause, ErrorRef, IntoCause};

/// A plain error that wraps one or more causes behind a context message.
///
/// This is the lightweight counterpart of [`StructuredError`] for code that
/// just wants to say "while doing X" without attaching attributes:
///
/// - [`Wrapped::new`] wraps a single cause, rendering as `"context: cause"`.
/// - [`Wrapped::fan_out`] wraps several causes behind one context message.
/// - [`Wrapped::join`] joins several causes with no context at all.
///
/// The message is rendered once, at construction, so displaying a `Wrapped`
/// never walks its causes again.
///
/// When a `Wrapped` ends up inside a [`StructuredError`], the normalizer looks
/// through it: a single structured cause replaces the wrapper entirely (the
/// context text is dropped), and multiple causes are spliced in place.
///
/// [`StructuredError`]: crate::StructuredError
#[derive(Debug, Clone, Default)]
pub struct Wrapped {
    message: String,
    causes: Vec<Option<ErrorRef>>,
}

impl Wrapped {
    /// Wraps `cause` with a context message.
    pub fn new(context: impl fmt::Display, cause: impl IntoCause) -> Self {
        Self::fan_out(context, [cause])
    }

    /// Wraps several causes behind one context message.
    ///
    /// Renders as `"context: first; second"`, so sibling causes don't read as
    /// a chain. Absent causes are kept so positions line up with the input.
    pub fn fan_out<I>(context: impl fmt::Display, causes: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoCause,
    {
        let causes: Vec<_> = causes.into_iter().map(IntoCause::into_cause).collect();
        let mut message = context.to_string();
        let rendered = render_causes(&causes, "; ");
        if !rendered.is_empty() {
            message.push_str(": ");
            message.push_str(&rendered);
        }
        Self { message, causes }
    }

    /// Joins several causes without a context message.
    ///
    /// Absent causes are discarded. Returns `None` if none remain.
    pub fn join<I>(causes: I) -> Option<Self>
    where
        I: IntoIterator,
        I::Item: IntoCause,
    {
        let causes: Vec<_> = causes
            .into_iter()
            .filter_map(IntoCause::into_cause)
            .map(Some)
            .collect();
        if causes.is_empty() {
            return None;
        }
        let message = render_causes(&causes, "\n");
        Some(Self { message, causes })
    }

    /// The rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped causes, in order.
    pub fn causes(&self) -> &[Option<ErrorRef>] {
        &self.causes
    }
}

fn render_causes(causes: &[Option<ErrorRef>], separator: &str) -> String {
    let mut rendered = String::new();
    for cause in causes.iter().flatten() {
        if !rendered.is_empty() {
            rendered.push_str(separator);
        }
        rendered.push_str(&cause.to_string());
    }
    rendered
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Wrapped {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.causes.as_slice() {
            [Some(only)] => Some(only.as_error()),
            _ => None,
        }
    }
}

impl Cause for Wrapped {
    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        Some(&self.causes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StructuredError, cause};

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn test_new_renders_context_and_cause() {
        let wrapped = Wrapped::new("fetching page", cause(Reset));
        assert_eq!(wrapped.to_string(), "fetching page: connection reset");
        assert!(wrapped.source().is_some_and(|s| s.is::<Reset>()));
    }

    #[test]
    fn test_fan_out_keeps_every_cause() {
        let wrapped = Wrapped::fan_out(
            "sync",
            [Some(cause(Reset)), None, Some(StructuredError::new("disk").into())],
        );
        assert_eq!(wrapped.causes().len(), 3);
        assert!(wrapped.source().is_none());
        assert_eq!(wrapped.message(), "sync: connection reset; (message=disk)");
    }

    #[test]
    fn test_join_discards_absent_causes() {
        assert!(Wrapped::join([None::<ErrorRef>, None]).is_none());
        let joined = Wrapped::join([Some(cause(Reset)), None, Some(cause(Reset))]).unwrap();
        assert_eq!(joined.causes().len(), 2);
        assert_eq!(joined.to_string(), "connection reset\nconnection reset");
    }
}
