//! Encoder configuration.
//!
//! Every encoder takes an [`EncodeConfig`] by reference. The convenience entry
//! points ([`Display`](core::fmt::Display), `serde`, [`StructuredError::to_json`])
//! use [`EncodeConfig::default`], which snapshots the process-wide default.
//!
//! # Environment Variables
//!
//! - `STRUCTERR_MAX_DEPTH` - initial value of the process-wide maximum depth.
//!   Ignored if it does not parse as an unsigned integer.
//!
//! [`StructuredError::to_json`]: crate::StructuredError::to_json

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// The maximum depth used when neither the environment nor
/// [`set_default_max_depth`] says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 100;

const UNSET: usize = usize::MAX;

static MAX_DEPTH_OVERRIDE: AtomicUsize = AtomicUsize::new(UNSET);

#[derive(Debug)]
struct StructerrEnvOptions {
    max_depth: usize,
}

impl StructerrEnvOptions {
    fn get() -> &'static Self {
        static STRUCTERR_FLAGS: OnceLock<StructerrEnvOptions> = OnceLock::new();

        STRUCTERR_FLAGS.get_or_init(|| {
            let max_depth = std::env::var_os("STRUCTERR_MAX_DEPTH")
                .and_then(|var| var.to_string_lossy().trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_DEPTH);
            StructerrEnvOptions { max_depth }
        })
    }
}

/// Returns the process-wide default maximum depth.
pub fn default_max_depth() -> usize {
    match MAX_DEPTH_OVERRIDE.load(Ordering::Relaxed) {
        UNSET => StructerrEnvOptions::get().max_depth,
        depth => depth,
    }
}

/// Sets the process-wide default maximum depth.
///
/// Configurations created afterwards with [`EncodeConfig::default`] pick up
/// the new value. Concurrent callers race; the last write wins.
pub fn set_default_max_depth(depth: usize) {
    MAX_DEPTH_OVERRIDE.store(depth.min(UNSET - 1), Ordering::Relaxed);
}

/// Settings shared by every encoder.
///
/// # Examples
///
/// ```
/// use structerr::{EncodeConfig, StructuredError};
///
/// let shallow = EncodeConfig::default().with_max_depth(2);
/// let text = StructuredError::new("boom").to_text(&shallow);
/// assert_eq!(text, "(message=boom)");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodeConfig {
    /// How deep encoders follow nested causes before falling back to the
    /// cause's own message.
    pub max_depth: usize,
}

impl EncodeConfig {
    /// Creates a configuration with an explicit maximum depth.
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns a copy with a different maximum depth.
    #[must_use]
    pub const fn with_max_depth(self, max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self::new(default_max_depth())
    }
}
