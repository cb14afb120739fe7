#![deny(
    missing_docs,
    unsafe_code,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Structured errors with typed attributes, rendered the same way everywhere.
//!
//! ## Overview
//!
//! A [`StructuredError`] carries more than a message: typed [`Attr`]
//! key/value pairs, free-form tags, any number of nested causes and an
//! optional stack trace. The same error renders consistently as
//! human-readable text, as JSON, and as structured-log fields, so the context
//! you attach once shows up in every sink.
//!
//! ## Quick Example
//!
//! ```
//! use std::time::Duration;
//!
//! use structerr::prelude::*;
//!
//! fn charge(amount_cents: i64) -> Result<(), StructuredError> {
//!     let gateway = std::io::Error::other("gateway timed out");
//!     Err(structerr!("charge failed")
//!         .with_attrs([
//!             Attr::int64("amount_cents", amount_cents),
//!             Attr::duration("elapsed", Duration::from_secs(30)),
//!         ])
//!         .with_tags(["billing", "retryable"])
//!         .with_errors([cause(gateway)]))
//! }
//!
//! let err = charge(1250).unwrap_err();
//!
//! // Text, via `Display`.
//! assert!(err.to_string().contains("(amount_cents=1250)"));
//!
//! // JSON, via `serde`.
//! let json = err.to_json()?;
//! assert!(json.contains(r#"{"amount_cents":1250}"#));
//! # Ok::<(), structerr::encode::json::JsonError>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Attributes** are a closed set of typed values ([`AttrValue`]): one
//!   scalar and one plural variant per type, nested groups, and an `Any`
//!   fallback. Encoders match on them exhaustively instead of reflecting.
//! - **Causes** are stored as [`ErrorRef`], a shared handle to anything
//!   implementing [`Cause`]. Foreign errors are adapted with [`cause`].
//!   [`Wrapped`] wraps causes behind a context message without attributes.
//! - **Joining**: [`join`] and [`join_if`] build an aggregate whose only
//!   purpose is to hold several causes.
//! - **Normalization**: before rendering, the causes of an error are
//!   flattened by [`normalize`](normalize::normalize). Wrappers around a
//!   single structured error are replaced by it and fan-out wrappers are
//!   spliced in place, so every encoder sees the same list.
//! - **Depth limit**: encoders stop following causes past
//!   [`EncodeConfig::max_depth`], which keeps cyclic or adversarial cause
//!   graphs finite.
//!
//! ## Output Formats
//!
//! - [`encode::text`]: `(key=value)` text, used by `Display`.
//! - [`encode::json`]: JSON encoding and decoding, also exposed through
//!   `serde`.
//! - [`encode::fields`]: an ordered field tree for structured-log backends.
//!   The `structerr-log` and `structerr-tracing` crates build on it, and
//!   `structerr-backtrace` captures stacks for [`StructuredError::with_stack`].
//!
//! An empty or absent message always renders as [`NIL_VALUE`].

mod macros;

mod attr;
mod cause;
pub mod config;
pub mod encode;
mod iterator_ext;
mod join;
pub mod normalize;
pub mod prelude;
mod result_ext;
mod structured_error;
mod wrapped;

pub use self::{
    attr::{AnyValue, Attr, AttrKind, AttrValue},
    cause::{Cause, ErrorRef, IntoCause, cause},
    config::{EncodeConfig, default_max_depth, set_default_max_depth},
    encode::NIL_VALUE,
    iterator_ext::IteratorExt,
    join::{join, join_if},
    result_ext::ResultExt,
    structured_error::StructuredError,
    wrapped::Wrapped,
};

// Not public API. Referenced by macro-generated code.
#[doc(hidden)]
pub mod __private {
    // Used by structerr-backtrace to recognize frames from this crate.
    pub const STRUCTERR_LOCATION: &core::panic::Location = core::panic::Location::caller();

    #[doc(hidden)]
    pub use core::result::Result::Err;
    #[doc(hidden)]
    pub use std::format;
}
