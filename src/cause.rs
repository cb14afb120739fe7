//! Shared handles to the causes stored inside a [`StructuredError`].
//!
//! Causes are stored as [`ErrorRef`], a cheaply clonable handle to a
//! [`Cause`] trait object. [`Cause`] is the capability the normalizer uses to
//! look inside a cause: whether it *is* a structured aggregate, and whether it
//! fans out into several causes of its own. Foreign errors that know nothing
//! about this crate are adapted by [`ErrorRef::from_error`].

use core::{any::Any, error::Error, fmt, ops::Deref};

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{StructuredError, Wrapped};

/// An error that can be stored as a cause of a [`StructuredError`].
///
/// Both methods default to "no", which is the right answer for plain errors.
pub trait Cause: Error + Send + Sync + 'static {
    /// Returns the structured aggregate this cause represents, if any.
    fn as_structured(&self) -> Option<&StructuredError> {
        None
    }

    /// Returns the causes this error wraps, if it wraps a sequence of them
    /// rather than a single [`source`](Error::source).
    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        None
    }

    #[doc(hidden)]
    fn foreign_inner(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// A shared, immutable handle to a cause.
///
/// Cloning an `ErrorRef` never copies the underlying error. Identity is
/// preserved, so [`ErrorRef::ptr_eq`] can be used to check whether two
/// handles refer to the same error instance.
#[derive(Clone)]
pub struct ErrorRef(Arc<dyn Cause>);

/// Adapter for errors that do not implement [`Cause`] themselves.
struct Foreign<E>(E);

impl<E: fmt::Debug> fmt::Debug for Foreign<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E: fmt::Display> fmt::Display for Foreign<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: Error> Error for Foreign<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl<E: Error + Send + Sync + 'static> Cause for Foreign<E> {
    fn as_structured(&self) -> Option<&StructuredError> {
        let inner: &dyn Any = &self.0;
        inner.downcast_ref::<StructuredError>()
    }

    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        let inner: &dyn Any = &self.0;
        inner.downcast_ref::<Wrapped>().and_then(Cause::multi_causes)
    }

    fn foreign_inner(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl ErrorRef {
    /// Wraps a value implementing [`Cause`].
    pub fn new<C: Cause>(cause: C) -> Self {
        Self(Arc::new(cause).unsize(unsize::Coercion!(to dyn Cause)))
    }

    /// Wraps any error.
    ///
    /// Errors that are already an [`ErrorRef`], a [`StructuredError`] or a
    /// [`Wrapped`] keep their capabilities; an existing handle is returned
    /// unchanged so identity survives the conversion.
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E) -> Self {
        let any: &dyn Any = &error;
        if let Some(existing) = any.downcast_ref::<ErrorRef>() {
            return existing.clone();
        }
        Self::new(Foreign(error))
    }

    /// Returns `true` if both handles point at the same error instance.
    pub fn ptr_eq(&self, other: &ErrorRef) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Returns the stored error as a plain [`Error`] trait object.
    ///
    /// For adapted foreign errors this is the original error, so the usual
    /// [`downcast_ref`](trait@Error) on the result finds the caller's type.
    pub fn as_error(&self) -> &(dyn Error + 'static) {
        match self.0.foreign_inner() {
            Some(inner) => inner,
            None => &*self.0,
        }
    }

    /// Attempts to downcast the stored error to a concrete type.
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        self.as_error().downcast_ref::<T>()
    }
}

impl Deref for ErrorRef {
    type Target = dyn Cause;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for ErrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ErrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for ErrorRef {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl Cause for ErrorRef {
    fn as_structured(&self) -> Option<&StructuredError> {
        self.0.as_structured()
    }

    fn multi_causes(&self) -> Option<&[Option<ErrorRef>]> {
        self.0.multi_causes()
    }

    fn foreign_inner(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.as_error())
    }
}

impl From<StructuredError> for ErrorRef {
    fn from(error: StructuredError) -> Self {
        Self::new(error)
    }
}

impl From<Wrapped> for ErrorRef {
    fn from(error: Wrapped) -> Self {
        Self::new(error)
    }
}

/// Converts a value into an optional cause.
///
/// Absent causes are legal entries of [`StructuredError::with_errors`] and
/// friends, which is why the conversion produces an `Option`.
pub trait IntoCause {
    /// Performs the conversion.
    fn into_cause(self) -> Option<ErrorRef>;
}

impl IntoCause for ErrorRef {
    #[inline]
    fn into_cause(self) -> Option<ErrorRef> {
        Some(self)
    }
}

impl IntoCause for &ErrorRef {
    #[inline]
    fn into_cause(self) -> Option<ErrorRef> {
        Some(self.clone())
    }
}

impl IntoCause for StructuredError {
    #[inline]
    fn into_cause(self) -> Option<ErrorRef> {
        Some(ErrorRef::new(self))
    }
}

impl IntoCause for Wrapped {
    #[inline]
    fn into_cause(self) -> Option<ErrorRef> {
        Some(ErrorRef::new(self))
    }
}

impl<T: IntoCause> IntoCause for Option<T> {
    #[inline]
    fn into_cause(self) -> Option<ErrorRef> {
        self.and_then(IntoCause::into_cause)
    }
}

/// Adapts any error into a cause.
///
/// # Examples
///
/// ```
/// use structerr::{StructuredError, cause};
///
/// let io = std::io::Error::other("disk full");
/// let err = StructuredError::new("write failed").with_errors([cause(io)]);
/// assert_eq!(err.errors().len(), 1);
/// ```
pub fn cause<E: Error + Send + Sync + 'static>(error: E) -> ErrorRef {
    ErrorRef::from_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("leaf failure")]
    struct Leaf;

    static_assertions::assert_impl_all!(ErrorRef: Send, Sync, Clone);

    #[test]
    fn test_foreign_error_downcasts_to_original_type() {
        let handle = cause(Leaf);
        assert!(handle.downcast_ref::<Leaf>().is_some());
        assert!(handle.as_structured().is_none());
        assert_eq!(handle.to_string(), "leaf failure");
    }

    #[test]
    fn test_existing_handle_keeps_identity() {
        let handle = cause(Leaf);
        let again = cause(handle.clone());
        assert!(handle.ptr_eq(&again));
        assert!(!handle.ptr_eq(&cause(Leaf)));
    }

    #[test]
    fn test_structured_error_keeps_capability() {
        let handle = cause(StructuredError::new("inner"));
        assert_eq!(handle.as_structured().map(|s| s.message()), Some("inner"));
        assert!(handle.downcast_ref::<StructuredError>().is_some());
    }

    #[test]
    fn test_option_into_cause() {
        let none: Option<StructuredError> = None;
        assert!(none.into_cause().is_none());
        assert!(Some(StructuredError::new("x")).into_cause().is_some());
    }
}
