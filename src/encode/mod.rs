//! Encoders for [`StructuredError`](crate::StructuredError).
//!
//! All encoders share one rendering contract:
//!
//! - An absent error renders as the sentinel message [`NIL_VALUE`].
//! - Sections appear only when non-empty, always in the order `message`,
//!   `tags`, `attrs`, `errors`, `stack`. The message is always present.
//! - Causes go through [`normalize`](crate::normalize::normalize) first.
//!   Structured entries are rendered recursively one level deeper; every other
//!   entry renders as a single `message` field holding its trimmed text.
//!
//! The encoders differ only in the output they produce:
//!
//! - [`text`]: the human-readable `(key=value)` grammar used by `Display`.
//! - [`json`]: the JSON wire format, plus decoding.
//! - [`fields`]: an ordered field tree that structured-log backends translate
//!   into their own key/value model.

pub mod fields;
pub mod json;
pub mod text;

use crate::normalize::Entry;

/// The literal rendered in place of an empty or absent message.
pub const NIL_VALUE: &str = "!NILVALUE";

/// Section key of the message.
pub const MESSAGE_KEY: &str = "message";
/// Section key of the tags.
pub const TAGS_KEY: &str = "tags";
/// Section key of the attributes.
pub const ATTRS_KEY: &str = "attrs";
/// Section key of the normalized causes.
pub const ERRORS_KEY: &str = "errors";
/// Section key of the stack trace.
pub const STACK_KEY: &str = "stack";

/// Returns `message`, or [`NIL_VALUE`] if it is empty.
pub(crate) fn or_nil(message: &str) -> &str {
    if message.is_empty() { NIL_VALUE } else { message }
}

/// The message of a non-structured entry: trimmed, or [`NIL_VALUE`] if
/// nothing is left.
pub(crate) fn leaf_message(entry: &Entry<'_>) -> String {
    let message = match entry {
        Entry::Absent => return NIL_VALUE.to_owned(),
        Entry::Structured(structured) => structured.message().trim().to_owned(),
        Entry::Opaque(error) => error.to_string().trim().to_owned(),
        Entry::Message(message) => message.trim().to_owned(),
    };
    if message.is_empty() {
        NIL_VALUE.to_owned()
    } else {
        message
    }
}
