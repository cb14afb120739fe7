use core::{error::Error, fmt};

use crate::{Attr, Cause, EncodeConfig, ErrorRef, IntoCause, encode};

/// An error carrying a message, typed attributes, tags, nested causes and an
/// optional stack trace.
///
/// A `StructuredError` is built with a chain of `with_*` calls, each of which
/// takes the error by value and returns it, and is read-only from then on.
/// Once placed inside another error as a cause it is shared behind an
/// [`ErrorRef`] and can be rendered concurrently from any number of threads.
///
/// # Rendering
///
/// - [`Display`](fmt::Display) produces the text encoding, see
///   [`encode::text`].
/// - [`serde::Serialize`] and [`serde::Deserialize`] use the JSON wire shape,
///   see [`encode::json`].
/// - [`encode::fields::sections`] produces the structured-log field tree used
///   by the log backends.
///
/// An empty message renders as [`NIL_VALUE`](crate::NIL_VALUE) in every format.
///
/// # Equality
///
/// Two errors are equal only if they are the same instance. Equal content is
/// not enough.
///
/// # Examples
///
/// ```
/// use structerr::{Attr, StructuredError, cause};
///
/// let err = StructuredError::new("payment declined")
///     .with_attrs([Attr::int64("amount_cents", 1250), Attr::string("currency", "EUR")])
///     .with_tags(["billing"])
///     .with_errors([cause(std::io::Error::other("gateway timeout"))]);
///
/// let text = err.to_string();
/// assert!(text.starts_with("(message=payment declined)"));
/// assert!(text.contains("(amount_cents=1250)"));
/// ```
pub struct StructuredError {
    message: String,
    attrs: Vec<Attr>,
    errors: Vec<Option<ErrorRef>>,
    tags: Vec<String>,
    stack: Option<Vec<u8>>,
    joined: bool,
}

impl StructuredError {
    /// Creates an error with the given message and nothing else.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attrs: Vec::new(),
            errors: Vec::new(),
            tags: Vec::new(),
            stack: None,
            joined: false,
        }
    }

    pub(crate) fn joined(errors: Vec<Option<ErrorRef>>) -> Self {
        Self {
            errors,
            joined: true,
            ..Self::new(String::new())
        }
    }

    /// Appends attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Replaces the causes.
    ///
    /// Absent entries are kept in position.
    #[must_use]
    pub fn with_errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoCause,
    {
        self.errors = errors.into_iter().map(IntoCause::into_cause).collect();
        self
    }

    /// Inserts causes before the existing ones.
    #[must_use]
    pub fn prepend_errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoCause,
    {
        let mut prepended: Vec<_> = errors.into_iter().map(IntoCause::into_cause).collect();
        prepended.append(&mut self.errors);
        self.errors = prepended;
        self
    }

    /// Inserts causes after the existing ones.
    #[must_use]
    pub fn append_errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoCause,
    {
        self.errors
            .extend(errors.into_iter().map(IntoCause::into_cause));
        self
    }

    /// Appends tags.
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the stack trace, replacing any previous one.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<Vec<u8>>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// The message, possibly empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The attributes, in insertion order.
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    /// The causes, in order. Absent entries are `None`.
    pub fn errors(&self) -> &[Option<ErrorRef>] {
        &self.errors
    }

    /// The tags, in insertion order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The raw stack trace, if one was set.
    pub fn stack(&self) -> Option<&[u8]> {
        self.stack.as_deref()
    }

    /// Returns `true` if this error was created by [`join`](crate::join) to
    /// aggregate causes, rather than to describe a failure of its own.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Renders the error as text using an explicit configuration.
    pub fn to_text(&self, config: &EncodeConfig) -> String {
        encode::text::render(Some(self), config)
    }

    /// Renders the error as JSON using the process-wide default configuration.
    ///
    /// # Errors
    ///
    /// Fails if an [`Any`](crate::AttrValue::Any) attribute cannot be
    /// represented as JSON.
    pub fn to_json(&self) -> Result<String, encode::json::JsonError> {
        encode::json::to_string(Some(self), &EncodeConfig::default())
    }

    /// Parses an error from its JSON encoding.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or an invalid base64 stack.
    pub fn from_json(input: &str) -> Result<Self, encode::json::JsonError> {
        encode::json::from_str(input)
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        encode::text::TextEncoder::new(f, &EncodeConfig::default()).error(Some(self), 0)
    }
}

impl fmt::Debug for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StructuredError");
        s.field("message", &self.message);
        if !self.tags.is_empty() {
            s.field("tags", &self.tags);
        }
        if !self.attrs.is_empty() {
            s.field("attrs", &self.attrs);
        }
        if !self.errors.is_empty() {
            s.field("errors", &self.errors);
        }
        if let Some(stack) = &self.stack {
            s.field("stack", &String::from_utf8_lossy(stack));
        }
        if self.joined {
            s.field("joined", &true);
        }
        s.finish()
    }
}

impl Error for StructuredError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.iter().flatten().next().map(ErrorRef::as_error)
    }
}

impl Cause for StructuredError {
    fn as_structured(&self) -> Option<&StructuredError> {
        Some(self)
    }

    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        Some(&self.errors)
    }
}

impl PartialEq for StructuredError {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for StructuredError {}
