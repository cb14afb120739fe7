use core::error::Error;

use crate::{StructuredError, cause};

/// Extension methods for `Result` types to wrap errors in a
/// [`StructuredError`].
///
/// # Examples
///
/// ```
/// use structerr::prelude::*;
///
/// fn read_config(path: &str) -> Result<String, StructuredError> {
///     std::fs::read_to_string(path).context("failed to read configuration file")
/// }
///
/// let err = read_config("/definitely/not/here").unwrap_err();
/// assert_eq!(err.message(), "failed to read configuration file");
/// assert_eq!(err.errors().len(), 1);
/// ```
pub trait ResultExt<T, E> {
    /// Wraps the error in a new [`StructuredError`] with the given message.
    ///
    /// The original error becomes the single cause of the new one.
    fn context(self, message: impl Into<String>) -> Result<T, StructuredError>;

    /// Like [`context`](ResultExt::context), but only builds the message if
    /// there is an error.
    fn with_context<F, M>(self, message: F) -> Result<T, StructuredError>
    where
        F: FnOnce() -> M,
        M: Into<String>;
}

impl<T, E> ResultExt<T, E> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    #[inline]
    fn context(self, message: impl Into<String>) -> Result<T, StructuredError> {
        self.map_err(|error| StructuredError::new(message).with_errors([cause(error)]))
    }

    #[inline]
    fn with_context<F, M>(self, message: F) -> Result<T, StructuredError>
    where
        F: FnOnce() -> M,
        M: Into<String>,
    {
        self.map_err(|error| StructuredError::new(message()).with_errors([cause(error)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("parse failure")]
    struct ParseFailure;

    #[test]
    fn test_context_keeps_original_cause() {
        let result: Result<(), ParseFailure> = Err(ParseFailure);
        let err = result.context("loading settings").unwrap_err();
        assert_eq!(err.message(), "loading settings");
        let original = err.errors()[0].as_ref().unwrap();
        assert!(original.downcast_ref::<ParseFailure>().is_some());
    }

    #[test]
    fn test_with_context_is_lazy_on_ok() {
        let result: Result<u8, ParseFailure> = Ok(3);
        let value = result
            .with_context(|| -> String { unreachable!("message built for Ok") })
            .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_structured_error_keeps_identity_as_cause() {
        let result: Result<(), StructuredError> = Err(StructuredError::new("inner"));
        let err = result.context("outer").unwrap_err();
        let inner = err.errors()[0].as_ref().and_then(|e| e.as_structured()).unwrap();
        assert_eq!(inner.message(), "inner");
    }
}
