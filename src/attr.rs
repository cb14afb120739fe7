//! Typed attributes attached to a [`StructuredError`].
//!
//! An [`Attr`] pairs a key with an [`AttrValue`], a closed set of scalar,
//! plural and grouped values. Every encoder matches on [`AttrValue`]
//! exhaustively, so rendering a typed attribute never goes through generic
//! reflection. The one escape hatch is [`AttrValue::Any`], which falls back to
//! the value's [`Debug`](core::fmt::Debug) output for text and structured-log
//! renderings and to its [`serde::Serialize`] implementation for JSON.
//!
//! Keys are not validated: duplicates are legal and kept in insertion order.
//!
//! [`StructuredError`]: crate::StructuredError

use core::{fmt, time::Duration};

use chrono::{DateTime, FixedOffset, TimeZone};
use triomphe::Arc;
use unsize::CoerceUnsize;

/// A value that can be carried by [`AttrValue::Any`].
///
/// This is implemented automatically for every type that is
/// [`Debug`](fmt::Debug) and [`serde::Serialize`].
pub trait AnyValue: fmt::Debug + Send + Sync + 'static {
    /// Converts the value into a JSON tree.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the value cannot be represented as
    /// JSON, for example a map with non-string keys.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> AnyValue for T
where
    T: serde::Serialize + fmt::Debug + Send + Sync + 'static,
{
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// The type tag of an [`AttrValue`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AttrKind {
    Any,
    Object,
    Bool,
    Bools,
    Time,
    Times,
    Duration,
    Durations,
    Int,
    Ints,
    Int64,
    Int64s,
    Uint64,
    Uint64s,
    Float64,
    Float64s,
    String,
    Strings,
}

/// The payload of an [`Attr`].
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// An arbitrary value with no typed constructor.
    Any(Arc<dyn AnyValue>),
    /// A nested, ordered group of attributes.
    Object(Vec<Attr>),
    /// A boolean.
    Bool(bool),
    /// A list of booleans.
    Bools(Vec<bool>),
    /// A point in time with its UTC offset.
    Time(DateTime<FixedOffset>),
    /// A list of points in time.
    Times(Vec<DateTime<FixedOffset>>),
    /// A span of time.
    Duration(Duration),
    /// A list of spans of time.
    Durations(Vec<Duration>),
    /// A platform-sized signed integer.
    Int(isize),
    /// A list of platform-sized signed integers.
    Ints(Vec<isize>),
    /// A 64-bit signed integer.
    Int64(i64),
    /// A list of 64-bit signed integers.
    Int64s(Vec<i64>),
    /// A 64-bit unsigned integer.
    Uint64(u64),
    /// A list of 64-bit unsigned integers.
    Uint64s(Vec<u64>),
    /// A 64-bit float.
    Float64(f64),
    /// A list of 64-bit floats.
    Float64s(Vec<f64>),
    /// A string.
    String(String),
    /// A list of strings.
    Strings(Vec<String>),
}

impl AttrValue {
    /// Returns the type tag of this value.
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Any(_) => AttrKind::Any,
            AttrValue::Object(_) => AttrKind::Object,
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Bools(_) => AttrKind::Bools,
            AttrValue::Time(_) => AttrKind::Time,
            AttrValue::Times(_) => AttrKind::Times,
            AttrValue::Duration(_) => AttrKind::Duration,
            AttrValue::Durations(_) => AttrKind::Durations,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Ints(_) => AttrKind::Ints,
            AttrValue::Int64(_) => AttrKind::Int64,
            AttrValue::Int64s(_) => AttrKind::Int64s,
            AttrValue::Uint64(_) => AttrKind::Uint64,
            AttrValue::Uint64s(_) => AttrKind::Uint64s,
            AttrValue::Float64(_) => AttrKind::Float64,
            AttrValue::Float64s(_) => AttrKind::Float64s,
            AttrValue::String(_) => AttrKind::String,
            AttrValue::Strings(_) => AttrKind::Strings,
        }
    }
}

/// A single typed key/value pair, or a named group of them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use structerr::{Attr, AttrKind};
///
/// let attrs = [
///     Attr::int("retries", 3),
///     Attr::strings("hosts", ["db-1", "db-2"]),
///     Attr::object(
///         "request",
///         [Attr::string("method", "GET"), Attr::duration("elapsed", Duration::from_millis(15))],
///     ),
/// ];
/// assert_eq!(attrs[1].kind(), AttrKind::Strings);
/// ```
#[derive(Clone, Debug)]
pub struct Attr {
    key: String,
    value: AttrValue,
}

macro_rules! scalar_constructors {
    ($($(#[$meta:meta])* $single:ident, $plural:ident: $ty:ty => $variant:ident, $variants:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $single(key: impl Into<String>, value: $ty) -> Self {
                Self::new(key, AttrValue::$variant(value))
            }

            #[doc = concat!("Creates an [`AttrValue::", stringify!($variants), "`] attribute.")]
            pub fn $plural(key: impl Into<String>, values: impl IntoIterator<Item = $ty>) -> Self {
                Self::new(key, AttrValue::$variants(values.into_iter().collect()))
            }
        )*
    };
}

impl Attr {
    /// Creates an attribute from an already-built value.
    pub fn new(key: impl Into<String>, value: AttrValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    scalar_constructors! {
        /// Creates an [`AttrValue::Bool`] attribute.
        bool, bools: bool => Bool, Bools;
        /// Creates an [`AttrValue::Duration`] attribute.
        duration, durations: Duration => Duration, Durations;
        /// Creates an [`AttrValue::Int`] attribute.
        int, ints: isize => Int, Ints;
        /// Creates an [`AttrValue::Int64`] attribute.
        int64, int64s: i64 => Int64, Int64s;
        /// Creates an [`AttrValue::Uint64`] attribute.
        uint64, uint64s: u64 => Uint64, Uint64s;
        /// Creates an [`AttrValue::Float64`] attribute.
        float64, float64s: f64 => Float64, Float64s;
    }

    /// Creates an [`AttrValue::Time`] attribute.
    ///
    /// The time zone is reduced to its fixed UTC offset.
    pub fn time<Tz: TimeZone>(key: impl Into<String>, value: DateTime<Tz>) -> Self {
        Self::new(key, AttrValue::Time(value.fixed_offset()))
    }

    /// Creates an [`AttrValue::Times`] attribute.
    pub fn times<Tz: TimeZone>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = DateTime<Tz>>,
    ) -> Self {
        Self::new(
            key,
            AttrValue::Times(values.into_iter().map(|t| t.fixed_offset()).collect()),
        )
    }

    /// Creates an [`AttrValue::String`] attribute.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, AttrValue::String(value.into()))
    }

    /// Creates an [`AttrValue::Strings`] attribute.
    pub fn strings<S: Into<String>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            key,
            AttrValue::Strings(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Creates an [`AttrValue::Object`] attribute grouping `attrs` under `key`.
    pub fn object(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self::new(key, AttrValue::Object(attrs.into_iter().collect()))
    }

    /// Creates an [`AttrValue::Any`] attribute.
    ///
    /// Use this only when no typed constructor applies; its renderings are
    /// the value's `Debug` output or its `serde` representation.
    pub fn any<T: AnyValue>(key: impl Into<String>, value: T) -> Self {
        let value = Arc::new(value).unsize(unsize::Coercion!(to dyn AnyValue));
        Self::new(key, AttrValue::Any(value))
    }

    /// The key of the attribute.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value of the attribute.
    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    /// The type tag of the attribute's value.
    pub fn kind(&self) -> AttrKind {
        self.value.kind()
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::encode::text::TextEncoder::new(f, &crate::EncodeConfig::default()).attr(self, 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    static_assertions::assert_impl_all!(Attr: Send, Sync, Clone);
    static_assertions::assert_impl_all!(AttrValue: Send, Sync);

    #[test]
    fn test_singular_and_plural_kinds() {
        let cases = [
            (Attr::bool("a", true), AttrKind::Bool),
            (Attr::bools("a", [true, false]), AttrKind::Bools),
            (Attr::int("a", -1), AttrKind::Int),
            (Attr::ints("a", [1, 2]), AttrKind::Ints),
            (Attr::int64("a", 7), AttrKind::Int64),
            (Attr::int64s("a", [7]), AttrKind::Int64s),
            (Attr::uint64("a", 7), AttrKind::Uint64),
            (Attr::uint64s("a", []), AttrKind::Uint64s),
            (Attr::float64("a", 0.5), AttrKind::Float64),
            (Attr::float64s("a", [0.5]), AttrKind::Float64s),
            (Attr::string("a", "x"), AttrKind::String),
            (Attr::strings("a", ["x", "y"]), AttrKind::Strings),
            (Attr::duration("a", Duration::from_secs(1)), AttrKind::Duration),
            (Attr::durations("a", [Duration::ZERO]), AttrKind::Durations),
            (Attr::object("a", []), AttrKind::Object),
            (Attr::any("a", vec![1u8, 2]), AttrKind::Any),
        ];
        for (attr, kind) in cases {
            assert_eq!(attr.kind(), kind);
            assert_eq!(attr.key(), "a");
        }
    }

    #[test]
    fn test_time_keeps_offset() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let attr = Attr::times("seen", [t, t]);
        let AttrValue::Times(values) = attr.value() else {
            panic!("expected times, got {:?}", attr.kind());
        };
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].offset().local_minus_utc(), 0);
        assert_eq!(values[0], t);
    }

    #[test]
    fn test_object_preserves_duplicate_keys() {
        let attr = Attr::object("o", [Attr::int("k", 1), Attr::int("k", 2)]);
        let AttrValue::Object(children) = attr.value() else {
            panic!("expected object");
        };
        let keys: Vec<_> = children.iter().map(Attr::key).collect();
        assert_eq!(keys, ["k", "k"]);
    }

    #[test]
    fn test_any_to_json() {
        let attr = Attr::any("v", ("x", 3));
        let AttrValue::Any(value) = attr.value() else {
            panic!("expected any");
        };
        assert_eq!(value.to_json().unwrap(), serde_json::json!(["x", 3]));
    }
}
