//! Commonly used items for convenient importing.
//!
//! ```rust
//! use structerr::prelude::*;
//!
//! fn parse_port(raw: &str) -> Result<u16, StructuredError> {
//!     let port = raw.parse::<u16>().context("port is not a number")?;
//!     if port == 0 {
//!         bail!("port must not be zero");
//!     }
//!     Ok(port)
//! }
//!
//! assert_eq!(parse_port("8080").unwrap(), 8080);
//! assert!(parse_port("zero").is_err());
//! ```
//!
//! # What's Included
//!
//! - **[`StructuredError`]** and **[`Attr`]**: the error type and its
//!   attributes
//! - **[`ResultExt`]** and **[`IteratorExt`]**: extension methods for
//!   `Result` values and iterators over them
//! - **[`structerr!`]** and **[`bail!`]**: macros for creating and returning
//!   errors
//! - **[`join`]** and **[`join_if`]**: aggregation of several causes
//! - **[`cause`]** and **[`IntoCause`]**: conversions into stored causes

pub use crate::{
    Attr, IntoCause, StructuredError, bail, cause, iterator_ext::IteratorExt, join, join_if,
    result_ext::ResultExt, structerr,
};
