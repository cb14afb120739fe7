/// Creates a [`StructuredError`](crate::StructuredError) from a format string.
///
/// The arguments are interpreted the same way as by [`format!()`].
///
/// [`format!()`]: std::format
///
/// # Examples
///
/// ```
/// use structerr::prelude::*;
///
/// let user_id = 42;
/// let err = structerr!("user {user_id} not found").with_tags(["lookup"]);
/// assert_eq!(err.message(), "user 42 not found");
/// ```
#[macro_export]
macro_rules! structerr {
    ($($arg:tt)*) => {
        $crate::StructuredError::new($crate::__private::format!($($arg)*))
    };
}

/// Return early with a [`StructuredError`](crate::StructuredError).
///
/// This macro is similar to the [`bail!`] macro from the [`anyhow`] crate.
/// It builds an error using the same arguments as [`structerr!`] and returns
/// it wrapped in an `Err`.
///
/// This is equivalent to writing `return Err(structerr!(...).into());`
///
/// [`bail!`]: https://docs.rs/anyhow/latest/anyhow/macro.bail.html
/// [`anyhow`]: https://docs.rs/anyhow/latest/anyhow/
///
/// # Examples
///
/// ```
/// use structerr::prelude::*;
///
/// fn checked_div(a: i32, b: i32) -> Result<i32, StructuredError> {
///     if b == 0 {
///         bail!("cannot divide {a} by zero");
///     }
///     Ok(a / b)
/// }
///
/// assert_eq!(checked_div(6, 3).unwrap(), 2);
/// assert!(checked_div(1, 0).is_err());
/// ```
#[macro_export]
macro_rules! bail {
    ($($args:tt)*) => {
        return $crate::__private::Err($crate::structerr!($($args)*).into())
    };
}
