//! Text encoding.
//!
//! Every field is written as `(key=value)`. Sections are separated by `,`
//! and a newline. Lists and attribute groups open a bracket, put one element
//! per line indented one tab deeper than the section, and close the bracket
//! on its own line:
//!
//! ```text
//! (message=request failed),
//! (tags=[
//! 	http,
//! 	retryable
//! ]),
//! (attrs=[
//! 	(status=503),
//! 	(upstream={
//! 		(host=api.internal),
//! 		(port=443)
//! 	})
//! ]),
//! (errors=[
//! 	(message=connection reset)
//! ])
//! ```
//!
//! The exact layout is meant for humans and may change between versions.

use core::fmt::{self, Write};

use crate::{
    Attr, AttrValue, EncodeConfig, StructuredError,
    encode::{ATTRS_KEY, ERRORS_KEY, MESSAGE_KEY, NIL_VALUE, STACK_KEY, TAGS_KEY, leaf_message, or_nil},
    normalize::{Entry, normalize},
};

/// Renders `error` as text.
///
/// # Examples
///
/// ```
/// use structerr::{EncodeConfig, StructuredError, encode::text};
///
/// assert_eq!(text::render(None, &EncodeConfig::default()), "(message=!NILVALUE)");
///
/// let err = StructuredError::new("timeout").with_tags(["net"]);
/// assert_eq!(
///     text::render(Some(&err), &EncodeConfig::default()),
///     "(message=timeout),\n(tags=[\n\tnet\n])"
/// );
/// ```
pub fn render(error: Option<&StructuredError>, config: &EncodeConfig) -> String {
    let mut out = String::new();
    // Writing into a `String` does not fail.
    let _ = TextEncoder::new(&mut out, config).error(error, 0);
    out
}

/// Streaming text encoder writing into any [`fmt::Write`].
pub struct TextEncoder<'a, W: ?Sized> {
    out: &'a mut W,
    config: &'a EncodeConfig,
}

impl<'a, W: Write + ?Sized> TextEncoder<'a, W> {
    /// Creates an encoder writing into `out`.
    pub fn new(out: &'a mut W, config: &'a EncodeConfig) -> Self {
        Self { out, config }
    }

    /// Writes an error whose first line is already indented to `depth`.
    pub fn error(&mut self, error: Option<&StructuredError>, depth: usize) -> fmt::Result {
        let Some(error) = error else {
            return self.value(MESSAGE_KEY, NIL_VALUE);
        };

        self.value(MESSAGE_KEY, or_nil(error.message()))?;

        if !error.tags().is_empty() {
            self.section_break(depth)?;
            self.list(depth, TAGS_KEY, '[', ']', error.tags(), |enc, tag| {
                enc.out.write_str(tag.trim())
            })?;
        }

        if !error.attrs().is_empty() {
            self.section_break(depth)?;
            self.list(depth, ATTRS_KEY, '[', ']', error.attrs(), |enc, attr| {
                enc.attr(attr, depth + 1)
            })?;
        }

        if !error.errors().is_empty() {
            let entries = normalize(error.errors(), depth, self.config);
            self.section_break(depth)?;
            self.list(depth, ERRORS_KEY, '[', ']', &entries, |enc, entry| {
                enc.entry(entry, depth + 1)
            })?;
        }

        if let Some(stack) = error.stack().filter(|stack| !stack.is_empty()) {
            self.section_break(depth)?;
            self.value(STACK_KEY, String::from_utf8_lossy(stack))?;
        }

        Ok(())
    }

    /// Writes a single attribute whose first line is already indented to
    /// `depth`.
    pub fn attr(&mut self, attr: &Attr, depth: usize) -> fmt::Result {
        let key = attr.key();
        match attr.value() {
            AttrValue::Any(value) => self.value(key, format_args!("{value:?}")),
            AttrValue::Object(children) => self.list(depth, key, '{', '}', children, |enc, child| {
                enc.attr(child, depth + 1)
            }),
            AttrValue::Bool(value) => self.value(key, value),
            AttrValue::Bools(values) => self.display_list(depth, key, values),
            AttrValue::Time(value) => self.value(key, value),
            AttrValue::Times(values) => self.display_list(depth, key, values),
            AttrValue::Duration(value) => self.value(key, format_args!("{value:?}")),
            AttrValue::Durations(values) => self.list(depth, key, '[', ']', values, |enc, value| {
                write!(enc.out, "{value:?}")
            }),
            AttrValue::Int(value) => self.value(key, value),
            AttrValue::Ints(values) => self.display_list(depth, key, values),
            AttrValue::Int64(value) => self.value(key, value),
            AttrValue::Int64s(values) => self.display_list(depth, key, values),
            AttrValue::Uint64(value) => self.value(key, value),
            AttrValue::Uint64s(values) => self.display_list(depth, key, values),
            AttrValue::Float64(value) => self.value(key, value),
            AttrValue::Float64s(values) => self.display_list(depth, key, values),
            AttrValue::String(value) => self.value(key, value),
            AttrValue::Strings(values) => self.list(depth, key, '[', ']', values, |enc, value| {
                enc.out.write_str(value.trim())
            }),
        }
    }

    fn entry(&mut self, entry: &Entry<'_>, depth: usize) -> fmt::Result {
        match entry {
            Entry::Structured(structured) => self.error(Some(*structured), depth),
            _ => self.value(MESSAGE_KEY, leaf_message(entry)),
        }
    }

    fn value(&mut self, key: &str, value: impl fmt::Display) -> fmt::Result {
        write!(self.out, "({key}={value})")
    }

    fn section_break(&mut self, depth: usize) -> fmt::Result {
        self.out.write_str(",\n")?;
        self.indent(depth)
    }

    fn indent(&mut self, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            self.out.write_char('\t')?;
        }
        Ok(())
    }

    fn display_list<T: fmt::Display>(&mut self, depth: usize, key: &str, values: &[T]) -> fmt::Result {
        self.list(depth, key, '[', ']', values, |enc, value| write!(enc.out, "{value}"))
    }

    fn list<T>(
        &mut self,
        depth: usize,
        key: &str,
        open: char,
        close: char,
        items: &[T],
        mut item: impl FnMut(&mut Self, &T) -> fmt::Result,
    ) -> fmt::Result {
        write!(self.out, "({key}={open}")?;
        if items.is_empty() {
            return write!(self.out, "{close})");
        }
        self.out.write_char('\n')?;
        for (index, value) in items.iter().enumerate() {
            if index > 0 {
                self.out.write_str(",\n")?;
            }
            self.indent(depth + 1)?;
            item(self, value)?;
        }
        self.out.write_char('\n')?;
        self.indent(depth)?;
        write!(self.out, "{close})")
    }
}
