//! JSON encoding and decoding.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "message": "request failed",
//!   "tags": ["http"],
//!   "attrs": [{"status": 503}, {"hosts": ["a", "b"]}],
//!   "errors": [{"message": "connection reset"}],
//!   "stack": "bWFpbgo="
//! }
//! ```
//!
//! Only `message` is always present. Each attribute is a single-member
//! object, so duplicate keys survive. Times are RFC 3339 strings, durations
//! are integer nanoseconds, groups are nested objects and the stack is
//! standard base64.
//!
//! Decoding accepts absent sections and rebuilds attributes by looking at the
//! JSON value: booleans, integers, floats and strings map to their scalar
//! variant, homogeneous arrays to the plural variant, objects to
//! [`AttrValue::Object`], and anything else to an [`AttrValue::Any`] holding
//! the raw [`serde_json::Value`]. Times and durations come back as strings
//! and integers. Every decoded cause is a [`StructuredError`].

use core::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{self, SerializeMap},
};
use serde_json::Value;
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    Attr, AttrValue, EncodeConfig, ErrorRef, StructuredError,
    attr::AnyValue,
    encode::{ATTRS_KEY, ERRORS_KEY, MESSAGE_KEY, NIL_VALUE, STACK_KEY, TAGS_KEY, leaf_message, or_nil},
    normalize::{Entry, normalize},
};

/// Errors produced by the JSON encoder and decoder.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// An attribute value could not be represented as JSON.
    #[error("failed to encode structured error as JSON")]
    Encode(#[source] serde_json::Error),
    /// The input was not a valid encoded structured error.
    #[error("failed to decode structured error from JSON")]
    Decode(#[source] serde_json::Error),
}

/// Encodes `error` as a JSON string.
///
/// # Errors
///
/// Returns [`JsonError::Encode`] if an [`AttrValue::Any`] value cannot be
/// represented as JSON, or if a float attribute is NaN or infinite. No
/// partial output is produced.
///
/// # Examples
///
/// ```
/// use structerr::{Attr, EncodeConfig, StructuredError, encode::json};
///
/// let err = StructuredError::new("bad input").with_attrs([Attr::int("n", 42)]);
/// let encoded = json::to_string(Some(&err), &EncodeConfig::default())?;
/// assert_eq!(encoded, r#"{"message":"bad input","attrs":[{"n":42}]}"#);
/// # Ok::<(), json::JsonError>(())
/// ```
pub fn to_string(error: Option<&StructuredError>, config: &EncodeConfig) -> Result<String, JsonError> {
    serde_json::to_string(&JsonView::new(error, config)).map_err(JsonError::Encode)
}

/// Encodes `error` as JSON bytes.
///
/// # Errors
///
/// See [`to_string`].
pub fn to_vec(error: Option<&StructuredError>, config: &EncodeConfig) -> Result<Vec<u8>, JsonError> {
    serde_json::to_vec(&JsonView::new(error, config)).map_err(JsonError::Encode)
}

/// Decodes an error from a JSON string.
///
/// # Errors
///
/// Returns [`JsonError::Decode`] on malformed input.
pub fn from_str(input: &str) -> Result<StructuredError, JsonError> {
    decode(serde_json::Deserializer::from_str(input)).map_err(JsonError::Decode)
}

/// Decodes an error from JSON bytes.
///
/// # Errors
///
/// Returns [`JsonError::Decode`] on malformed input.
pub fn from_slice(input: &[u8]) -> Result<StructuredError, JsonError> {
    decode(serde_json::Deserializer::from_slice(input)).map_err(JsonError::Decode)
}

// Every nested cause adds two levels of JSON nesting, so serde_json's fixed
// recursion limit is lower than what the encoder produces at the default
// depth. The stack grows on demand instead.
fn decode<'de, R: serde_json::de::Read<'de>>(
    mut deserializer: serde_json::Deserializer<R>,
) -> Result<StructuredError, serde_json::Error> {
    deserializer.disable_recursion_limit();
    let error = StructuredError::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(error)
}

/// A serializable view of an optional error with an explicit configuration.
///
/// This is what [`StructuredError`]'s own `Serialize` implementation uses with
/// the default configuration. It works with any `serde` serializer, not just
/// `serde_json`.
#[derive(Copy, Clone, Debug)]
pub struct JsonView<'a> {
    error: Option<&'a StructuredError>,
    depth: usize,
    config: EncodeConfig,
}

impl<'a> JsonView<'a> {
    /// Creates a view of `error` rendered with `config`.
    pub fn new(error: Option<&'a StructuredError>, config: &EncodeConfig) -> Self {
        Self {
            error,
            depth: 0,
            config: *config,
        }
    }
}

impl Serialize for JsonView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let Some(error) = self.error else {
            map.serialize_entry(MESSAGE_KEY, NIL_VALUE)?;
            return map.end();
        };

        map.serialize_entry(MESSAGE_KEY, or_nil(error.message()))?;
        if !error.tags().is_empty() {
            map.serialize_entry(TAGS_KEY, error.tags())?;
        }
        if !error.attrs().is_empty() {
            map.serialize_entry(ATTRS_KEY, &AttrList(error.attrs()))?;
        }
        if !error.errors().is_empty() {
            let entries = EntryList {
                entries: normalize(error.errors(), self.depth, &self.config),
                depth: self.depth + 1,
                config: self.config,
            };
            map.serialize_entry(ERRORS_KEY, &entries)?;
        }
        if let Some(stack) = error.stack().filter(|stack| !stack.is_empty()) {
            map.serialize_entry(STACK_KEY, &STANDARD.encode(stack))?;
        }
        map.end()
    }
}

struct EntryList<'a> {
    entries: Vec<Entry<'a>>,
    depth: usize,
    config: EncodeConfig,
}

impl Serialize for EntryList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|entry| EntryView {
            entry,
            depth: self.depth,
            config: self.config,
        }))
    }
}

struct EntryView<'a, 'b> {
    entry: &'b Entry<'a>,
    depth: usize,
    config: EncodeConfig,
}

impl Serialize for EntryView<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.entry {
            Entry::Structured(structured) => JsonView {
                error: Some(*structured),
                depth: self.depth,
                config: self.config,
            }
            .serialize(serializer),
            entry => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(MESSAGE_KEY, &leaf_message(entry))?;
                map.end()
            }
        }
    }
}

struct AttrList<'a>(&'a [Attr]);

impl Serialize for AttrList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(SingleAttr))
    }
}

/// One attribute as a single-member object.
struct SingleAttr<'a>(&'a Attr);

impl Serialize for SingleAttr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.key(), &ValueView(self.0.value()))?;
        map.end()
    }
}

struct ValueView<'a>(&'a AttrValue);

fn rfc3339(time: &chrono::DateTime<chrono::FixedOffset>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

// JSON has no literal for NaN or infinities.
fn finite<S: Serializer>(value: f64) -> Result<f64, S::Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(<S::Error as ser::Error>::custom(format_args!(
            "non-finite float {value} has no JSON representation"
        )))
    }
}

fn nanos(duration: &core::time::Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl Serialize for ValueView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            AttrValue::Any(value) => value
                .to_json()
                .map_err(<S::Error as ser::Error>::custom)?
                .serialize(serializer),
            AttrValue::Object(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for child in children {
                    map.serialize_entry(child.key(), &ValueView(child.value()))?;
                }
                map.end()
            }
            AttrValue::Bool(value) => serializer.serialize_bool(*value),
            AttrValue::Bools(values) => values.serialize(serializer),
            AttrValue::Time(value) => serializer.serialize_str(&rfc3339(value)),
            AttrValue::Times(values) => serializer.collect_seq(values.iter().map(rfc3339)),
            AttrValue::Duration(value) => serializer.serialize_u64(nanos(value)),
            AttrValue::Durations(values) => serializer.collect_seq(values.iter().map(nanos)),
            AttrValue::Int(value) => value.serialize(serializer),
            AttrValue::Ints(values) => values.serialize(serializer),
            AttrValue::Int64(value) => serializer.serialize_i64(*value),
            AttrValue::Int64s(values) => values.serialize(serializer),
            AttrValue::Uint64(value) => serializer.serialize_u64(*value),
            AttrValue::Uint64s(values) => values.serialize(serializer),
            AttrValue::Float64(value) => serializer.serialize_f64(finite::<S>(*value)?),
            AttrValue::Float64s(values) => serializer.collect_seq(
                values
                    .iter()
                    .map(|value| finite::<S>(*value))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            AttrValue::String(value) => serializer.serialize_str(value),
            AttrValue::Strings(values) => values.serialize(serializer),
        }
    }
}

impl Serialize for StructuredError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JsonView::new(Some(self), &EncodeConfig::default()).serialize(serializer)
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Wire {
    message: String,
    tags: Vec<String>,
    attrs: Vec<AttrGroup>,
    errors: Vec<StructuredError>,
    stack: Option<String>,
}

impl<'de> Deserialize<'de> for StructuredError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Wire::deserialize(deserializer)?;
        let message = if wire.message == NIL_VALUE {
            String::new()
        } else {
            wire.message
        };
        let mut error = StructuredError::new(message)
            .with_tags(wire.tags)
            .with_attrs(wire.attrs.into_iter().flat_map(|group| group.0))
            .with_errors(wire.errors.into_iter().map(ErrorRef::new));
        if let Some(stack) = wire.stack {
            let stack = STANDARD
                .decode(stack)
                .map_err(<D::Error as de::Error>::custom)?;
            error = error.with_stack(stack);
        }
        Ok(error)
    }
}

/// The members of one JSON object, in order, as attributes.
struct AttrGroup(Vec<Attr>);

impl<'de> Deserialize<'de> for AttrGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupVisitor;

        impl<'de> Visitor<'de> for GroupVisitor {
            type Value = AttrGroup;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of attributes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<AttrGroup, A::Error> {
                let mut attrs = Vec::with_capacity(map.size_hint().unwrap_or(1));
                while let Some((key, value)) = map.next_entry::<String, DecodedValue>()? {
                    attrs.push(Attr::new(key, value.0));
                }
                Ok(AttrGroup(attrs))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

/// An attribute value with its variant inferred from the JSON value.
struct DecodedValue(AttrValue);

fn any_value(value: Value) -> AttrValue {
    AttrValue::Any(Arc::new(value).unsize(unsize::Coercion!(to dyn AnyValue)))
}

fn all<T>(values: &[Value], get: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    values.iter().map(get).collect()
}

fn classify_array(values: Vec<Value>) -> AttrValue {
    if values.is_empty() {
        return any_value(Value::Array(values));
    }
    if let Some(bools) = all(&values, Value::as_bool) {
        return AttrValue::Bools(bools);
    }
    if let Some(ints) = all(&values, Value::as_i64) {
        return AttrValue::Int64s(ints);
    }
    if let Some(uints) = all(&values, Value::as_u64) {
        return AttrValue::Uint64s(uints);
    }
    if let Some(floats) = all(&values, Value::as_f64) {
        return AttrValue::Float64s(floats);
    }
    if let Some(strings) = all(&values, |v| v.as_str().map(str::to_owned)) {
        return AttrValue::Strings(strings);
    }
    any_value(Value::Array(values))
}

impl<'de> Deserialize<'de> for DecodedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = DecodedValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an attribute value")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<DecodedValue, E> {
                Ok(DecodedValue(AttrValue::Bool(value)))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<DecodedValue, E> {
                Ok(DecodedValue(AttrValue::Int64(value)))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<DecodedValue, E> {
                Ok(DecodedValue(match i64::try_from(value) {
                    Ok(value) => AttrValue::Int64(value),
                    Err(_) => AttrValue::Uint64(value),
                }))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<DecodedValue, E> {
                Ok(DecodedValue(AttrValue::Float64(value)))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<DecodedValue, E> {
                Ok(DecodedValue(AttrValue::String(value.to_owned())))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<DecodedValue, E> {
                Ok(DecodedValue(AttrValue::String(value)))
            }

            fn visit_unit<E: de::Error>(self) -> Result<DecodedValue, E> {
                Ok(DecodedValue(any_value(Value::Null)))
            }

            fn visit_none<E: de::Error>(self) -> Result<DecodedValue, E> {
                self.visit_unit()
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DecodedValue, A::Error> {
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(value) = seq.next_element::<Value>()? {
                    values.push(value);
                }
                Ok(DecodedValue(classify_array(values)))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DecodedValue, A::Error> {
                let mut children = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, DecodedValue>()? {
                    children.push(Attr::new(key, value.0));
                }
                Ok(DecodedValue(AttrValue::Object(children)))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
