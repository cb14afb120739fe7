#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! [`tracing`] event support for structerr errors.
//!
//! [`emit`] records a [`StructuredError`] as a single `tracing` event. The
//! event message is the error message; the other sections become the fields
//! `tags`, `attrs`, `errors` and `stack`, rendered through the
//! [field tree](structerr::encode::fields). Sections the error doesn't have
//! are not recorded.
//!
//! # Quick Start
//!
//! ```
//! use structerr::{Attr, StructuredError};
//! use structerr_tracing::TracingExt;
//! use tracing::Level;
//!
//! fn connect() -> Result<(), StructuredError> {
//!     Err(StructuredError::new("connection refused").with_attrs([Attr::uint64("port", 5432)]))
//! }
//!
//! // Logs the error at WARN and passes it on.
//! let result = connect().trace_at(Level::WARN);
//! assert!(result.is_err());
//! ```
//!
//! With a subscriber such as `tracing_subscriber::fmt` installed, this prints
//! something like:
//!
//! ```text
//! WARN structerr_tracing: connection refused attrs={port=5432}
//! ```

use structerr::{
    EncodeConfig, NIL_VALUE, StructuredError,
    encode::{
        ATTRS_KEY, ERRORS_KEY, MESSAGE_KEY, STACK_KEY, TAGS_KEY,
        fields::{self, FieldValue},
    },
};
use tracing::Level;

// `tracing::event!` needs its level at compile time.
macro_rules! event_at {
    ($level:expr, $($fields:tt)+) => {
        match $level {
            Level::ERROR => tracing::event!(Level::ERROR, $($fields)+),
            Level::WARN => tracing::event!(Level::WARN, $($fields)+),
            Level::INFO => tracing::event!(Level::INFO, $($fields)+),
            Level::DEBUG => tracing::event!(Level::DEBUG, $($fields)+),
            _ => tracing::event!(Level::TRACE, $($fields)+),
        }
    };
}

/// Records `error` as a `tracing` event at `level`, with the default
/// [`EncodeConfig`].
///
/// An absent error is recorded with the sentinel message
/// [`NIL_VALUE`](structerr::NIL_VALUE) and no other fields.
pub fn emit(error: Option<&StructuredError>, level: Level) {
    emit_with(error, level, &EncodeConfig::default());
}

/// Like [`emit`], with an explicit [`EncodeConfig`].
pub fn emit_with(error: Option<&StructuredError>, level: Level, config: &EncodeConfig) {
    let sections = fields::sections(error, config);
    let message = match sections.get(MESSAGE_KEY) {
        Some(FieldValue::Str(message)) => message.as_str(),
        _ => NIL_VALUE,
    };
    let field = |key: &str| sections.get(key).map(tracing::field::display);

    event_at!(
        level,
        tags = field(TAGS_KEY),
        attrs = field(ATTRS_KEY),
        errors = field(ERRORS_KEY),
        stack = field(STACK_KEY),
        "{message}"
    );
}

/// Extension trait for recording errors as they pass by.
pub trait TracingExt: Sized {
    /// Records the error with [`emit`] and returns `self` unchanged.
    fn trace_at(self, level: Level) -> Self;
}

impl TracingExt for StructuredError {
    fn trace_at(self, level: Level) -> Self {
        emit(Some(&self), level);
        self
    }
}

impl<T> TracingExt for Result<T, StructuredError> {
    fn trace_at(self, level: Level) -> Self {
        if let Err(error) = &self {
            emit(Some(error), level);
        }
        self
    }
}
