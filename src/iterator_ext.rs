use core::iter::FusedIterator;

use crate::{ErrorRef, IntoCause, StructuredError};

/// Extension methods for iterators over `Result` types that keep every error.
///
/// The standard library's [`Iterator::collect`] stops at the first error.
/// These methods keep going and [`join`](crate::join) every error they see
/// into one [`StructuredError`]:
///
/// ```rust
/// use structerr::{cause, prelude::*};
///
/// let inputs = ["1", "2", "invalid", "4", "bad"];
///
/// let result: Result<Vec<u8>, StructuredError> = inputs
///     .iter()
///     .map(|s| s.parse::<u8>().map_err(cause))
///     .collect_joined();
///
/// let joined = result.unwrap_err();
/// assert!(joined.is_joined());
/// assert_eq!(joined.errors().len(), 2);
/// ```
pub trait IteratorExt<A, E>: Sized + Iterator<Item = Result<A, E>> {
    /// Collects successful values into a container, or every error into a
    /// joined [`StructuredError`].
    ///
    /// Errors that convert into an absent cause are skipped. If every error
    /// was absent the result is `Ok`, holding the successful values only.
    fn collect_joined<Container>(self) -> Result<Container, StructuredError>
    where
        Container: FromIterator<A>,
        E: IntoCause;
}

struct IteratorWrapper<'a, Iter> {
    iter: Iter,
    errors: &'a mut Vec<Option<ErrorRef>>,
}

impl<Iter, Object, Error> Iterator for IteratorWrapper<'_, Iter>
where
    Iter: Iterator<Item = Result<Object, Error>>,
    Error: IntoCause,
{
    type Item = Object;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.iter.next()? {
                Ok(object) => return Some(object),
                Err(error) => self.errors.push(error.into_cause()),
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.iter.size_hint();
        (0, upper)
    }
}

impl<Iter, Object, Error> FusedIterator for IteratorWrapper<'_, Iter>
where
    Iter: FusedIterator<Item = Result<Object, Error>>,
    Error: IntoCause,
{
}

impl<A, E, I> IteratorExt<A, E> for I
where
    I: Iterator<Item = Result<A, E>>,
{
    #[inline]
    fn collect_joined<Container>(self) -> Result<Container, StructuredError>
    where
        Container: FromIterator<A>,
        E: IntoCause,
    {
        let mut errors = Vec::new();
        let result = Container::from_iter(IteratorWrapper {
            iter: self,
            errors: &mut errors,
        });
        match crate::join(errors) {
            Some(joined) => Err(joined),
            None => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ok() {
        let result: Result<Vec<u8>, StructuredError> =
            [Ok(1), Ok(2)].into_iter().map(|r: Result<u8, StructuredError>| r).collect_joined();
        assert_eq!(result.unwrap(), [1, 2]);
    }

    #[test]
    fn test_errors_are_joined_in_order() {
        let items = [
            Ok(1),
            Err(StructuredError::new("first")),
            Ok(2),
            Err(StructuredError::new("second")),
        ];
        let joined = items.into_iter().collect_joined::<Vec<u8>>().unwrap_err();
        let messages: Vec<_> = joined
            .errors()
            .iter()
            .filter_map(|e| e.as_ref()?.as_structured().map(StructuredError::message))
            .collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
