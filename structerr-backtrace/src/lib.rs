#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Stack trace capture for structerr errors.
//!
//! A [`StructuredError`] stores its stack as opaque bytes. This crate captures
//! the current call stack, filters out frames that are rarely useful, and
//! renders it as text suitable for [`StructuredError::with_stack`].
//!
//! # Quick Start
//!
//! ```rust
//! use structerr::StructuredError;
//! use structerr_backtrace::StackExt;
//!
//! let err = StructuredError::new("something broke").with_captured_stack();
//! assert!(err.stack().is_some());
//! ```
//!
//! Capture a stack without attaching it to anything:
//!
//! ```rust
//! use structerr_backtrace::{Backtrace, BacktraceFilter};
//!
//! if let Some(backtrace) = Backtrace::capture(&BacktraceFilter::DEFAULT) {
//!     let rendered = backtrace.render(false);
//!     println!("{}", String::from_utf8_lossy(&rendered));
//! }
//! ```
//!
//! # Output
//!
//! Each frame takes two lines: the function name without its module path,
//! then the tab-indented source location. Runs of frames from uninteresting
//! crates collapse into a single line.
//!
//! ```text
//! load_config
//! 	/home/me/my_app/src/config.rs:42
//! ... omitted 4 frame(s) from crate 'tokio' ...
//! main
//! 	/home/me/my_app/src/main.rs:7
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables all filtering and shows all frames
//! - `STRUCTERR_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Show full file paths instead of shortened paths
//!
//! The `RUST_BACKTRACE=full` setting implies `full_paths`.

use std::{
    borrow::Cow,
    fmt::{self, Write as _},
    panic::Location,
    sync::OnceLock,
};

use backtrace::BytesOrWideString;
use structerr::StructuredError;

/// A captured, filtered stack backtrace.
///
/// # Examples
///
/// ```rust
/// use structerr_backtrace::{Backtrace, BacktraceFilter};
///
/// if let Some(backtrace) = Backtrace::capture(&BacktraceFilter::DEFAULT) {
///     println!("captured {} entries", backtrace.len());
/// }
/// ```
#[derive(Debug)]
pub struct Backtrace {
    entries: Vec<Entry>,
    omitted: usize,
}

#[derive(Debug)]
enum Entry {
    Frame(Frame),
    Omitted { count: usize, crate_name: &'static str },
}

#[derive(Debug)]
struct Frame {
    symbol: String,
    path: SourcePath,
    line: Option<u32>,
}

/// A source file path, with the crate it belongs to when that is known.
#[derive(Debug)]
struct SourcePath {
    raw: String,
    crate_name: Option<Cow<'static, str>>,
    // Byte offset where the shortened form of `raw` starts.
    short_from: Option<usize>,
}

/// Settings controlling which frames are kept.
///
/// ```rust
/// use structerr_backtrace::BacktraceFilter;
///
/// let filter = BacktraceFilter {
///     // Hide framework frames in the middle
///     skipped_middle_crates: &["tokio", "hyper", "tower"],
///     // Show only the most relevant 10 frames
///     max_entry_count: 10,
///     ..BacktraceFilter::DEFAULT
/// };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BacktraceFilter {
    /// Crates whose frames are hidden when they appear at the beginning of a
    /// backtrace.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose frames are collapsed when they appear in the middle of a
    /// backtrace.
    pub skipped_middle_crates: &'static [&'static str],
    /// Crates whose frames are hidden when they appear at the end of a
    /// backtrace.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of entries to include in the backtrace.
    pub max_entry_count: usize,
    /// Whether to render full file paths.
    pub show_full_path: bool,
}

impl BacktraceFilter {
    /// Default backtrace filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "structerr",
            "structerr-backtrace",
            "core",
            "std",
            "alloc",
        ],
        skipped_middle_crates: &["std", "core", "alloc", "tokio"],
        skipped_final_crates: &["std", "core", "alloc", "tokio"],
        max_entry_count: 20,
        show_full_path: false,
    };

    /// Keeps every frame.
    pub const UNFILTERED: Self = Self {
        skipped_initial_crates: &[],
        skipped_middle_crates: &[],
        skipped_final_crates: &[],
        max_entry_count: usize::MAX,
        show_full_path: true,
    };

    /// The default filter adjusted by environment variables.
    ///
    /// See the [crate documentation](crate) for the variables read.
    pub fn from_env() -> Self {
        let env = StructerrEnvOptions::get();
        if env.rust_backtrace_full {
            Self::UNFILTERED
        } else {
            Self {
                show_full_path: env.show_full_path,
                ..Self::DEFAULT
            }
        }
    }
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct StructerrEnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
}

impl StructerrEnvOptions {
    fn get() -> &'static Self {
        static STRUCTERR_FLAGS: OnceLock<StructerrEnvOptions> = OnceLock::new();

        STRUCTERR_FLAGS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut show_full_path = rust_backtrace_full;
            if let Some(var) = std::env::var_os("STRUCTERR_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("full_paths") {
                        show_full_path = true;
                    }
                }
            }
            StructerrEnvOptions {
                rust_backtrace_full,
                show_full_path,
            }
        })
    }
}

/// Returns the last path segment of a demangled symbol, skipping turbofish
/// generics and qualified-path prefixes such as `<T as Trait>`.
fn short_function_name(symbol: &str) -> &str {
    let mut angle_depth = 0usize;
    let mut segment_start = 0;
    let mut name = symbol;
    let mut prev = '\0';

    for (i, c) in symbol.char_indices() {
        match c {
            '<' => angle_depth += 1,
            // `->` inside a generic argument list is not a closing bracket.
            '>' if prev != '-' => angle_depth = angle_depth.saturating_sub(1),
            ':' if prev == ':' && angle_depth == 0 => {
                let segment = &symbol[segment_start..i - 1];
                if !segment.is_empty() && !segment.starts_with('<') {
                    name = segment;
                }
                segment_start = i + 1;
            }
            _ => {}
        }
        prev = c;
    }

    match &symbol[segment_start..] {
        last if last.is_empty() || last.starts_with('<') => name,
        last => last,
    }
}

const fn get_crate_matcher(location: &'static Location<'static>) -> Option<(&'static str, usize)> {
    let file = location.file();

    let Some(prefix_len) = file.len().checked_sub("/src/lib.rs".len()) else {
        return None;
    };

    let (prefix, suffix) = file.split_at(prefix_len);
    // Compile-time check that the location points at a crate root.
    if std::path::MAIN_SEPARATOR == '/' {
        assert!(suffix.eq_ignore_ascii_case("/src/lib.rs"));
    } else {
        assert!(suffix.eq_ignore_ascii_case(r#"/src\lib.rs"#));
    }

    let (matcher_prefix, _) = file.split_at(prefix_len + 4);

    let mut splitter_prefix = prefix;
    while !splitter_prefix.is_empty() {
        let (new_prefix, last_char) = splitter_prefix.split_at(splitter_prefix.len() - 1);
        splitter_prefix = new_prefix;
        if last_char.eq_ignore_ascii_case(std::path::MAIN_SEPARATOR_STR) {
            break;
        }
    }

    Some((matcher_prefix, splitter_prefix.len()))
}

const STRUCTERR_BACKTRACE_MATCHER: Option<(&str, usize)> = get_crate_matcher(Location::caller());
const STRUCTERR_MATCHER: Option<(&str, usize)> =
    get_crate_matcher(structerr::__private::STRUCTERR_LOCATION);

impl Backtrace {
    /// Captures the current stack backtrace, applying `filter`.
    ///
    /// Returns `None` if no frame could be resolved.
    pub fn capture(filter: &BacktraceFilter) -> Option<Self> {
        let mut collector = Collector::new(filter);
        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                // Frames without a symbol name or file name carry no information.
                if let (Some(name), Some(file)) = (symbol.name(), symbol.filename_raw()) {
                    collector.push(Frame {
                        symbol: format!("{name:#}"),
                        path: SourcePath::new(file),
                        line: symbol.lineno(),
                    });
                }
            });
            true
        });
        collector.finish()
    }

    /// The number of rendered entries, counting each collapsed run of
    /// omitted frames as one.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if every frame was filtered out.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the backtrace as the bytes stored in a structured error's
    /// stack.
    pub fn render(&self, show_full_path: bool) -> Vec<u8> {
        let mut out = String::new();
        // Writing into a `String` does not fail.
        let _ = self.write(&mut out, show_full_path);
        out.into_bytes()
    }

    fn write(&self, out: &mut String, show_full_path: bool) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                Entry::Omitted { count, crate_name } => {
                    writeln!(out, "... omitted {count} frame(s) from crate '{crate_name}' ...")?;
                }
                Entry::Frame(frame) => {
                    writeln!(out, "{}", short_function_name(&frame.symbol))?;
                    let path = &frame.path;
                    match path.short_from {
                        Some(start) if !show_full_path => write!(out, "\t[..]/{}", &path.raw[start..])?,
                        _ => write!(out, "\t{}", path.raw)?,
                    }
                    if let Some(line) = frame.line {
                        write!(out, ":{line}")?;
                    }
                    out.push('\n');
                }
            }
        }
        if self.omitted > 0 {
            writeln!(
                out,
                "note: {} frame(s) omitted. For a complete backtrace, set RUST_BACKTRACE=full.",
                self.omitted
            )?;
        }
        Ok(())
    }
}

/// A run of consecutive frames from a crate listed in
/// [`BacktraceFilter::skipped_middle_crates`]. A run of one frame is kept as
/// that frame.
struct Run {
    crate_name: &'static str,
    count: usize,
    first: Option<Frame>,
}

/// Applies a [`BacktraceFilter`] to frames, most recent first.
struct Collector<'a> {
    filter: &'a BacktraceFilter,
    entries: Vec<Entry>,
    omitted: usize,
    leading: bool,
    run: Option<Run>,
}

impl<'a> Collector<'a> {
    fn new(filter: &'a BacktraceFilter) -> Self {
        Self {
            filter,
            entries: Vec::new(),
            omitted: 0,
            leading: !filter.skipped_initial_crates.is_empty(),
            run: None,
        }
    }

    fn push(&mut self, frame: Frame) {
        if self.entries.len() >= self.filter.max_entry_count {
            self.omitted += 1;
            return;
        }

        let crate_name = frame.path.crate_name.as_deref();
        if self.leading {
            if crate_name.is_some_and(|name| self.filter.skipped_initial_crates.contains(&name)) {
                self.omitted += 1;
                return;
            }
            self.leading = false;
        }

        if let Some(run) = &mut self.run
            && crate_name == Some(run.crate_name)
        {
            run.first = None;
            run.count += 1;
            self.omitted += 1;
            return;
        }
        self.close_run();

        let skipped = crate_name.and_then(|name| {
            self.filter
                .skipped_middle_crates
                .iter()
                .copied()
                .find(|&skipped| skipped == name)
        });
        match skipped {
            Some(crate_name) => {
                self.omitted += 1;
                self.run = Some(Run {
                    crate_name,
                    count: 1,
                    first: Some(frame),
                });
            }
            None => self.entries.push(Entry::Frame(frame)),
        }
    }

    fn close_run(&mut self) {
        if let Some(run) = self.run.take() {
            self.entries.push(match run.first {
                Some(frame) => Entry::Frame(frame),
                None => Entry::Omitted {
                    count: run.count,
                    crate_name: run.crate_name,
                },
            });
        }
    }

    fn is_trailing_noise(&self, entry: &Entry) -> bool {
        let final_crates = self.filter.skipped_final_crates;
        match entry {
            Entry::Frame(frame) => {
                frame
                    .path
                    .crate_name
                    .as_deref()
                    .is_some_and(|name| final_crates.contains(&name))
                    || matches!(
                        frame.symbol.as_str(),
                        "__libc_start_call_main" | "__libc_start_main_impl"
                    )
            }
            Entry::Omitted { crate_name, .. } => final_crates.contains(crate_name),
        }
    }

    fn finish(mut self) -> Option<Backtrace> {
        self.close_run();
        while let Some(last) = self.entries.last()
            && self.is_trailing_noise(last)
        {
            self.omitted += match self.entries.pop() {
                Some(Entry::Omitted { count, .. }) => count,
                _ => 1,
            };
        }

        if self.entries.is_empty() && self.omitted == 0 {
            None
        } else {
            Some(Backtrace {
                entries: self.entries,
                omitted: self.omitted,
            })
        }
    }
}

impl SourcePath {
    fn new(path: BytesOrWideString<'_>) -> Self {
        let raw = path.to_str_lossy().into_owned();
        let (crate_name, short_from) = match classify(&raw) {
            Some((name, start)) => (Some(name), Some(start)),
            None => (None, None),
        };
        Self {
            raw,
            crate_name,
            short_from,
        }
    }
}

/// Finds the crate a source path belongs to, and where the part of the path
/// worth printing starts.
fn classify(path: &str) -> Option<(Cow<'static, str>, usize)> {
    static PATTERNS: OnceLock<[regex::Regex; 2]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            // Standard library sources, either from a rustup component:
            //   .../lib/rustlib/src/rust/library/{std|core|alloc}/src/...
            // or as remapped by rustc:
            //   /rustc/{commit}/library/{std|core|alloc}/src/...
            regex::Regex::new(
                r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
            )
            .expect("built-in regex pattern for std library paths should be valid"),
            // Registry crates:
            //   .../.cargo/registry/src/{index}-{hash}/{crate}-{version}/src/...
            regex::Regex::new(
                r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
            )
            .expect("built-in regex pattern for cargo registry paths should be valid"),
        ]
    });

    for pattern in patterns {
        if let Some(name) = pattern.captures(path).and_then(|captures| captures.get(1)) {
            return Some((Cow::Owned(name.as_str().to_owned()), name.start()));
        }
    }

    [
        (STRUCTERR_MATCHER, "structerr"),
        (STRUCTERR_BACKTRACE_MATCHER, "structerr-backtrace"),
    ]
    .into_iter()
    .find_map(|(matcher, name)| {
        let (crate_root, parent_len) = matcher?;
        path.starts_with(crate_root)
            .then_some((Cow::Borrowed(name), parent_len + 1))
    })
}

/// Captures the current stack with the environment-derived filter and
/// renders it.
///
/// Returns an empty vector if no frame could be resolved.
pub fn capture_stack() -> Vec<u8> {
    let filter = BacktraceFilter::from_env();
    Backtrace::capture(&filter)
        .map(|backtrace| backtrace.render(filter.show_full_path))
        .unwrap_or_default()
}

/// Extension trait for attaching captured stacks to errors.
///
/// # Examples
///
/// ```rust
/// use structerr::StructuredError;
/// use structerr_backtrace::{BacktraceFilter, StackExt};
///
/// fn might_fail() -> Result<(), StructuredError> {
///     Err(StructuredError::new("operation failed"))
/// }
///
/// let result = might_fail().with_captured_stack();
/// assert!(result.unwrap_err().stack().is_some());
///
/// let filter = BacktraceFilter {
///     max_entry_count: 5,
///     ..BacktraceFilter::DEFAULT
/// };
/// let err = StructuredError::new("detailed").with_captured_stack_filtered(&filter);
/// ```
pub trait StackExt: Sized {
    /// Sets the stack to the current call stack, filtered according to the
    /// environment.
    fn with_captured_stack(self) -> Self {
        self.with_captured_stack_filtered(&BacktraceFilter::from_env())
    }

    /// Sets the stack to the current call stack, filtered by `filter`.
    fn with_captured_stack_filtered(self, filter: &BacktraceFilter) -> Self;
}

impl StackExt for StructuredError {
    fn with_captured_stack_filtered(self, filter: &BacktraceFilter) -> Self {
        match Backtrace::capture(filter) {
            Some(backtrace) => self.with_stack(backtrace.render(filter.show_full_path)),
            None => self,
        }
    }
}

impl<V> StackExt for Result<V, StructuredError> {
    fn with_captured_stack_filtered(self, filter: &BacktraceFilter) -> Self {
        self.map_err(|error| error.with_captured_stack_filtered(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(symbol: &str, crate_name: Option<&'static str>) -> Frame {
        Frame {
            symbol: symbol.to_owned(),
            path: SourcePath {
                raw: format!("/src/{symbol}.rs"),
                crate_name: crate_name.map(Cow::Borrowed),
                short_from: None,
            },
            line: None,
        }
    }

    fn collect(filter: &BacktraceFilter, frames: Vec<Frame>) -> Backtrace {
        let mut collector = Collector::new(filter);
        for frame in frames {
            collector.push(frame);
        }
        collector.finish().unwrap()
    }

    fn rendered(backtrace: &Backtrace) -> String {
        String::from_utf8(backtrace.render(false)).unwrap()
    }

    #[test]
    fn test_short_function_name() {
        assert_eq!(short_function_name("my_app::config::load"), "load");
        assert_eq!(
            short_function_name("<alloc::vec::Vec<T> as core::ops::Drop>::drop"),
            "drop"
        );
        assert_eq!(short_function_name("demo::worker::<fn() -> u8>"), "worker");
        assert_eq!(short_function_name("app::main::{{closure}}"), "{{closure}}");
        assert_eq!(short_function_name("main"), "main");
    }

    #[test]
    fn test_classify_registry_and_std_paths() {
        let (name, start) = classify(
            "/home/u/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/indexmap-2.12.1/src/map.rs",
        )
        .unwrap();
        assert_eq!(name, "indexmap");
        assert!(start > 0);

        let std_path = format!("/rustc/{}/library/core/src/result.rs", "a".repeat(40));
        let (name, start) = classify(&std_path).unwrap();
        assert_eq!(name, "core");
        assert_eq!(&std_path[start..], "core/src/result.rs");

        assert!(classify("/work/app/src/main.rs").is_none());
    }

    #[test]
    fn test_unfiltered_capture_is_not_empty() {
        let backtrace = Backtrace::capture(&BacktraceFilter::UNFILTERED).unwrap();
        assert!(!backtrace.is_empty());
        assert!(!backtrace.render(true).is_empty());
    }

    #[test]
    fn test_render_layout() {
        let backtrace = Backtrace {
            entries: vec![
                Entry::Frame(Frame {
                    symbol: "app::run".to_owned(),
                    path: SourcePath {
                        raw: "/work/app/src/run.rs".to_owned(),
                        crate_name: None,
                        short_from: Some("/work/".len()),
                    },
                    line: Some(12),
                }),
                Entry::Omitted {
                    count: 3,
                    crate_name: "std",
                },
            ],
            omitted: 0,
        };
        assert_eq!(
            rendered(&backtrace),
            "run\n\t[..]/app/src/run.rs:12\n... omitted 3 frame(s) from crate 'std' ...\n"
        );
        assert!(
            String::from_utf8(backtrace.render(true))
                .unwrap()
                .contains("\t/work/app/src/run.rs:12\n")
        );
    }

    #[test]
    fn test_filter_trims_and_collapses() {
        let filter = BacktraceFilter {
            skipped_initial_crates: &["backtrace"],
            skipped_middle_crates: &["tokio"],
            skipped_final_crates: &["std"],
            max_entry_count: 20,
            show_full_path: false,
        };
        let backtrace = collect(
            &filter,
            vec![
                frame("trace", Some("backtrace")),
                frame("app::fail", None),
                frame("tokio::poll", Some("tokio")),
                frame("tokio::run", Some("tokio")),
                frame("app::handler", None),
                frame("tokio::spawn", Some("tokio")),
                frame("app::main", None),
                frame("std::rt::lang_start", Some("std")),
            ],
        );

        assert_eq!(
            rendered(&backtrace),
            "fail\n\t/src/app::fail.rs\n\
             ... omitted 2 frame(s) from crate 'tokio' ...\n\
             handler\n\t/src/app::handler.rs\n\
             spawn\n\t/src/tokio::spawn.rs\n\
             main\n\t/src/app::main.rs\n\
             note: 5 frame(s) omitted. For a complete backtrace, set RUST_BACKTRACE=full.\n"
        );
    }

    #[test]
    fn test_max_entry_count() {
        let filter = BacktraceFilter {
            max_entry_count: 2,
            ..BacktraceFilter::UNFILTERED
        };
        let backtrace = collect(
            &filter,
            vec![frame("a", None), frame("b", None), frame("c", None)],
        );
        assert_eq!(backtrace.len(), 2);
        assert_eq!(backtrace.omitted, 1);
    }

    #[test]
    fn test_stack_ext_sets_stack() {
        let err = StructuredError::new("x").with_captured_stack_filtered(&BacktraceFilter::UNFILTERED);
        assert!(err.stack().is_some_and(|stack| !stack.is_empty()));
    }
}
