use crate::{IntoCause, StructuredError};

/// Joins causes into a new aggregate error.
///
/// Absent causes are discarded and the order of the rest is kept. Returns
/// `None` if nothing remains. The result has an empty message and reports
/// [`is_joined`](StructuredError::is_joined).
///
/// # Examples
///
/// ```
/// use structerr::{StructuredError, join};
///
/// assert!(join([None::<StructuredError>, None]).is_none());
///
/// let joined = join([
///     Some(StructuredError::new("first")),
///     None,
///     Some(StructuredError::new("second")),
/// ])
/// .unwrap();
/// assert_eq!(joined.errors().len(), 2);
/// assert!(joined.is_joined());
/// ```
pub fn join<I>(errors: I) -> Option<StructuredError>
where
    I: IntoIterator,
    I::Item: IntoCause,
{
    let errors: Vec<_> = errors
        .into_iter()
        .filter_map(IntoCause::into_cause)
        .map(Some)
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(StructuredError::joined(errors))
    }
}

/// Like [`join`], but only if the first cause is present.
///
/// Returns `None` if `errors` is empty or starts with an absent cause,
/// whatever the rest contains. Otherwise joins every cause, the first one
/// included.
///
/// This fits the common "wrap the error if there is one" pattern, where the
/// first entry is the primary error and the rest is context that only matters
/// alongside it.
///
/// # Examples
///
/// ```
/// use structerr::{StructuredError, join_if};
///
/// let primary: Option<StructuredError> = None;
/// assert!(join_if([primary, Some(StructuredError::new("cleanup failed"))]).is_none());
/// ```
pub fn join_if<I>(errors: I) -> Option<StructuredError>
where
    I: IntoIterator,
    I::Item: IntoCause,
{
    let mut errors = errors.into_iter().map(IntoCause::into_cause);
    let first = errors.next()??;
    join(core::iter::once(Some(first)).chain(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorRef, cause};

    #[derive(Debug, thiserror::Error)]
    #[error("e{0}")]
    struct Numbered(u8);

    fn some(n: u8) -> Option<ErrorRef> {
        Some(cause(Numbered(n)))
    }

    fn numbers(error: &StructuredError) -> Vec<u8> {
        error
            .errors()
            .iter()
            .map(|e| e.as_ref().and_then(|e| e.downcast_ref::<Numbered>()).map_or(0, |n| n.0))
            .collect()
    }

    #[test]
    fn test_join_counts_present_causes() {
        let joined = join([some(1), None, some(2), None, some(3)]).unwrap();
        assert_eq!(numbers(&joined), [1, 2, 3]);
        assert!(joined.message().is_empty());
        assert!(joined.is_joined());
    }

    #[test]
    fn test_join_empty_or_all_absent() {
        assert!(join(Vec::<ErrorRef>::new()).is_none());
        assert!(join([None::<ErrorRef>, None]).is_none());
    }

    #[test]
    fn test_join_if_positional_short_circuit() {
        assert!(join_if([None, some(2), some(3)]).is_none());
        assert!(join_if(Vec::<ErrorRef>::new()).is_none());

        let joined = join_if([some(1), None, some(3)]).unwrap();
        assert_eq!(numbers(&joined), [1, 3]);
    }
}
