//! Backend-neutral structured-log field tree.
//!
//! Structured-log backends each have their own key/value model. Rather than
//! teaching each of them about [`StructuredError`], [`sections`] renders an
//! error into an ordered map of top-level [`Sections`] holding
//! [`FieldValue`] trees, and a backend only has to translate those.
//!
//! Top-level keys are always a subset of `message`, `tags`, `attrs`,
//! `errors` and `stack`, in that order. Nested groups are plain lists of
//! [`Field`] so duplicate attribute keys survive.

use core::{fmt, time::Duration};

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    Attr, AttrValue, EncodeConfig, StructuredError,
    encode::{ATTRS_KEY, ERRORS_KEY, MESSAGE_KEY, NIL_VALUE, STACK_KEY, TAGS_KEY, leaf_message, or_nil},
    normalize::{Entry, normalize},
};

/// The top-level sections of a rendered error, in rendering order.
pub type Sections = IndexMap<&'static str, FieldValue, FxBuildHasher>;

/// A named value inside a [`FieldValue::Group`].
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// The field name.
    pub key: String,
    /// The field value.
    pub value: FieldValue,
}

/// A value in the field tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A float.
    F64(f64),
    /// A point in time.
    Time(DateTime<FixedOffset>),
    /// A span of time.
    Duration(Duration),
    /// An ordered list of values.
    List(Vec<FieldValue>),
    /// An ordered group of named values.
    Group(Vec<Field>),
}

/// Renders `error` into its top-level sections.
///
/// # Examples
///
/// ```
/// use structerr::{
///     Attr, EncodeConfig, StructuredError,
///     encode::fields::{self, FieldValue},
/// };
///
/// let err = StructuredError::new("quota exceeded").with_attrs([Attr::uint64("limit", 10)]);
/// let sections = fields::sections(Some(&err), &EncodeConfig::default());
///
/// let keys: Vec<_> = sections.keys().copied().collect();
/// assert_eq!(keys, ["message", "attrs"]);
/// assert_eq!(sections["message"], FieldValue::Str("quota exceeded".into()));
/// ```
pub fn sections(error: Option<&StructuredError>, config: &EncodeConfig) -> Sections {
    build(error, 0, config)
}

fn build(error: Option<&StructuredError>, depth: usize, config: &EncodeConfig) -> Sections {
    let mut sections = Sections::default();
    let Some(error) = error else {
        sections.insert(MESSAGE_KEY, FieldValue::Str(NIL_VALUE.to_owned()));
        return sections;
    };

    sections.insert(MESSAGE_KEY, FieldValue::Str(or_nil(error.message()).to_owned()));
    if !error.tags().is_empty() {
        let tags = error
            .tags()
            .iter()
            .map(|tag| FieldValue::Str(tag.trim().to_owned()))
            .collect();
        sections.insert(TAGS_KEY, FieldValue::List(tags));
    }
    if !error.attrs().is_empty() {
        sections.insert(ATTRS_KEY, FieldValue::Group(attr_fields(error.attrs())));
    }
    if !error.errors().is_empty() {
        let errors = normalize(error.errors(), depth, config)
            .iter()
            .map(|entry| match entry {
                Entry::Structured(structured) => {
                    FieldValue::Group(into_fields(build(Some(*structured), depth + 1, config)))
                }
                entry => FieldValue::Group(vec![Field {
                    key: MESSAGE_KEY.to_owned(),
                    value: FieldValue::Str(leaf_message(entry)),
                }]),
            })
            .collect();
        sections.insert(ERRORS_KEY, FieldValue::List(errors));
    }
    if let Some(stack) = error.stack().filter(|stack| !stack.is_empty()) {
        sections.insert(
            STACK_KEY,
            FieldValue::Str(String::from_utf8_lossy(stack).into_owned()),
        );
    }
    sections
}

/// Converts top-level sections into a nested group.
pub fn into_fields(sections: Sections) -> Vec<Field> {
    sections
        .into_iter()
        .map(|(key, value)| Field {
            key: key.to_owned(),
            value,
        })
        .collect()
}

fn attr_fields(attrs: &[Attr]) -> Vec<Field> {
    attrs
        .iter()
        .map(|attr| Field {
            key: attr.key().to_owned(),
            value: attr_value(attr.value()),
        })
        .collect()
}

fn list<T>(values: &[T], f: impl Fn(&T) -> FieldValue) -> FieldValue {
    FieldValue::List(values.iter().map(f).collect())
}

fn attr_value(value: &AttrValue) -> FieldValue {
    match value {
        AttrValue::Any(value) => FieldValue::Str(format!("{value:?}")),
        AttrValue::Object(children) => FieldValue::Group(attr_fields(children)),
        AttrValue::Bool(value) => FieldValue::Bool(*value),
        AttrValue::Bools(values) => list(values, |v| FieldValue::Bool(*v)),
        AttrValue::Time(value) => FieldValue::Time(*value),
        AttrValue::Times(values) => list(values, |v| FieldValue::Time(*v)),
        AttrValue::Duration(value) => FieldValue::Duration(*value),
        AttrValue::Durations(values) => list(values, |v| FieldValue::Duration(*v)),
        // isize is at most 64 bits wide on every supported target.
        AttrValue::Int(value) => FieldValue::I64(*value as i64),
        AttrValue::Ints(values) => list(values, |v| FieldValue::I64(*v as i64)),
        AttrValue::Int64(value) => FieldValue::I64(*value),
        AttrValue::Int64s(values) => list(values, |v| FieldValue::I64(*v)),
        AttrValue::Uint64(value) => FieldValue::U64(*value),
        AttrValue::Uint64s(values) => list(values, |v| FieldValue::U64(*v)),
        AttrValue::Float64(value) => FieldValue::F64(*value),
        AttrValue::Float64s(values) => list(values, |v| FieldValue::F64(*v)),
        AttrValue::String(value) => FieldValue::Str(value.clone()),
        AttrValue::Strings(values) => list(values, |v| FieldValue::Str(v.trim().to_owned())),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(value) => f.write_str(value),
            FieldValue::Bool(value) => fmt::Display::fmt(value, f),
            FieldValue::I64(value) => fmt::Display::fmt(value, f),
            FieldValue::U64(value) => fmt::Display::fmt(value, f),
            FieldValue::F64(value) => fmt::Display::fmt(value, f),
            FieldValue::Time(value) => fmt::Display::fmt(value, f),
            FieldValue::Duration(value) => fmt::Debug::fmt(value, f),
            FieldValue::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            FieldValue::Group(fields) => {
                f.write_str("{")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", field.key, field.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Str(value) => serializer.serialize_str(value),
            FieldValue::Bool(value) => serializer.serialize_bool(*value),
            FieldValue::I64(value) => serializer.serialize_i64(*value),
            FieldValue::U64(value) => serializer.serialize_u64(*value),
            FieldValue::F64(value) => serializer.serialize_f64(*value),
            FieldValue::Time(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
            }
            FieldValue::Duration(value) => {
                serializer.serialize_u64(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
            }
            FieldValue::List(values) => serializer.collect_seq(values),
            FieldValue::Group(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for field in fields {
                    map.serialize_entry(&field.key, &field.value)?;
                }
                map.end()
            }
        }
    }
}
