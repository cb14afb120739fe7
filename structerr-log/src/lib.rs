#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! [`log`] key-value support for structerr errors.
//!
//! [`LogFields`] exposes the sections of a [`StructuredError`] as a
//! [`log::kv::Source`], so they can be attached to any `log` record. Scalars
//! become native `log` values; lists and groups are passed through the `serde`
//! bridge and keep their structure for loggers that understand it.
//!
//! # Example
//!
//! ```rust
//! use structerr::{Attr, StructuredError};
//!
//! let err = StructuredError::new("upload failed")
//!     .with_attrs([Attr::uint64("bytes", 4096)])
//!     .with_tags(["storage"]);
//!
//! structerr_log::log_error(log::Level::Error, "uploads", Some(&err));
//! ```
//!
//! Or attach the fields to a record you build yourself:
//!
//! ```rust
//! use log::kv::Source;
//! use structerr::{EncodeConfig, StructuredError};
//! use structerr_log::LogFields;
//!
//! let err = StructuredError::new("upload failed");
//! let fields = LogFields::new(Some(&err), &EncodeConfig::default());
//! assert_eq!(fields.count(), 1);
//! ```

use log::kv::{self, Key, Value, VisitSource};
use structerr::{
    EncodeConfig, StructuredError,
    encode::fields::{self, FieldValue, Sections},
};

/// The sections of an error as `log` key-value pairs.
///
/// Keys are a subset of `message`, `tags`, `attrs`, `errors` and `stack`, in
/// that order.
#[derive(Clone, Debug)]
pub struct LogFields {
    sections: Sections,
}

impl LogFields {
    /// Renders `error` into log fields.
    pub fn new(error: Option<&StructuredError>, config: &EncodeConfig) -> Self {
        Self {
            sections: fields::sections(error, config),
        }
    }

    /// The rendered sections.
    pub fn sections(&self) -> &Sections {
        &self.sections
    }
}

impl From<&StructuredError> for LogFields {
    fn from(error: &StructuredError) -> Self {
        Self::new(Some(error), &EncodeConfig::default())
    }
}

fn to_value(value: &FieldValue) -> Value<'_> {
    match value {
        FieldValue::Str(value) => Value::from(value.as_str()),
        FieldValue::Bool(value) => Value::from(*value),
        FieldValue::I64(value) => Value::from(*value),
        FieldValue::U64(value) => Value::from(*value),
        FieldValue::F64(value) => Value::from(*value),
        FieldValue::Time(_) | FieldValue::Duration(_) | FieldValue::List(_) | FieldValue::Group(_) => {
            Value::from_serde(value)
        }
    }
}

impl kv::Source for LogFields {
    fn visit<'kvs>(&'kvs self, visitor: &mut dyn VisitSource<'kvs>) -> Result<(), kv::Error> {
        for (key, value) in &self.sections {
            visitor.visit_pair(Key::from_str(key), to_value(value))?;
        }
        Ok(())
    }

    fn get(&self, key: Key<'_>) -> Option<Value<'_>> {
        self.sections.get(key.as_str()).map(to_value)
    }

    fn count(&self) -> usize {
        self.sections.len()
    }
}

/// Logs `error` through the installed logger, with the default
/// [`EncodeConfig`].
///
/// The record's message is the error message and its key-values are the
/// error's [`LogFields`]. Nothing is rendered if the logger has the level
/// disabled for `target`.
pub fn log_error(level: log::Level, target: &str, error: Option<&StructuredError>) {
    log_error_with(level, target, error, &EncodeConfig::default());
}

/// Like [`log_error`], with an explicit [`EncodeConfig`].
pub fn log_error_with(
    level: log::Level,
    target: &str,
    error: Option<&StructuredError>,
    config: &EncodeConfig,
) {
    let logger = log::logger();
    let metadata = log::Metadata::builder().level(level).target(target).build();
    if !logger.enabled(&metadata) {
        return;
    }

    let fields = LogFields::new(error, config);
    let message = match fields.sections.get(structerr::encode::MESSAGE_KEY) {
        Some(FieldValue::Str(message)) => message.as_str(),
        _ => structerr::NIL_VALUE,
    };
    logger.log(
        &log::Record::builder()
            .metadata(metadata)
            .args(format_args!("{message}"))
            .key_values(&fields)
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use log::kv::Source;
    use structerr::{Attr, cause};

    use super::*;

    #[derive(Default)]
    struct Collected(Vec<(String, String)>);

    impl<'kvs> VisitSource<'kvs> for Collected {
        fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
            self.0.push((key.to_string(), value.to_string()));
            Ok(())
        }
    }

    fn collect(fields: &LogFields) -> Vec<(String, String)> {
        let mut collected = Collected::default();
        fields.visit(&mut collected).unwrap();
        collected.0
    }

    #[test]
    fn test_keys_follow_section_order() {
        let err = StructuredError::new("boom")
            .with_stack("main\n")
            .with_attrs([Attr::int64("n", 42)])
            .with_tags(["t"])
            .with_errors([cause(std::io::Error::other("disk"))]);
        let keys: Vec<_> = collect(&LogFields::from(&err))
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, ["message", "tags", "attrs", "errors", "stack"]);
    }

    #[test]
    fn test_scalar_values_are_native() {
        let fields = LogFields::from(&StructuredError::new("boom"));
        let message = fields.get(Key::from_str("message")).unwrap();
        assert_eq!(message.to_borrowed_str(), Some("boom"));
        assert!(fields.get(Key::from_str("stack")).is_none());
    }

    #[test]
    fn test_absent_error_is_sentinel() {
        let collected = collect(&LogFields::new(None, &EncodeConfig::default()));
        assert_eq!(collected, [("message".to_owned(), structerr::NIL_VALUE.to_owned())]);
    }

    struct CapturingLogger(Mutex<Vec<(String, usize)>>);

    impl log::Log for CapturingLogger {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.target() == "structerr-log-test"
        }

        fn log(&self, record: &log::Record<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((record.args().to_string(), record.key_values().count()));
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger(Mutex::new(Vec::new()));

    #[test]
    fn test_log_error_emits_record() {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);

        let err = StructuredError::new("write failed").with_tags(["io"]);
        log_error(log::Level::Warn, "structerr-log-test", Some(&err));
        log_error(log::Level::Warn, "elsewhere", Some(&err));

        let records = LOGGER.0.lock().unwrap();
        assert_eq!(*records, [("write failed".to_owned(), 2)]);
    }
}
