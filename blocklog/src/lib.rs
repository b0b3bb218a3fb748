//! Low-overhead single-threaded logging engine with deferred rendering.
//!
//! # Usage
//!
//! `blocklog` separates recording a message from rendering it. Message
//! templates are compiled once, up front, into a [`CompiledFormat`]. Logging
//! a message then only appends a handful of tagged slots (the format handle,
//! the level and one slot per argument) to an in-memory block buffer. Text is
//! produced later, when [`Logger::flush`] runs the level filter and hands the
//! surviving messages to the [`Emitter`].
//!
//! Because the in-memory level and the write level are separate, a process
//! can record `INFO` messages cheaply and write only `WARN` and above, while
//! still being able to dump everything it recorded when something goes wrong
//! (see [`Logger::emit_on_issue_notify`]).
//!
//! ## Example
//!
//! ```rust
//! use blocklog::{config, info, warn, StringFlusher};
//!
//! # fn main() {
//! let flusher = StringFlusher::new();
//! let output = flusher.handle();
//!
//! // by default messages are recorded from INFO and written from WARN
//! let registry = config().app_name("shop").flusher(flusher).build();
//! let logger = registry.logger("cart");
//!
//! logger.add_format("added", "added ${0:n} x ${1:s}").unwrap();
//! logger.add_format("stock", "low stock: ${0:g}").unwrap();
//!
//! info!(logger, "added", 2, "apple");
//! warn!(logger, "stock", vec!["apple", "pear"]);
//!
//! logger.flush().unwrap();
//! assert_eq!(output.take(), "[WARN] stock> low stock: [\"apple\", \"pear\"]\n");
//! # }
//! ```
//!
//! # Format templates
//!
//! A template is a single line of text with embedded directives:
//!
//! | directive | meaning |
//! |-----------|---------|
//! | `##`, `$$` | literal `#` / `$` |
//! | `#ip_addr`, `#app_name`, `#module_name`, `#msg_name`, `#wall_time`, `#logical_time`, `#callback_id`, `#request_id` | value taken from the logging context |
//! | `${i:b}`, `${i:n}`, `${i:s}` | argument `i` as a boolean, number or string |
//! | `${i:g}` | argument `i` of any kind, records and sequences expanded two levels deep |
//! | `${i:o<d,l>}`, `${i:a<d,l>}` | argument `i` as a record or sequence, expanded `d` levels deep with at most `l` items per level (`*` for unbounded) |
//!
//! Arguments that are missing or of the wrong kind never fail the call,
//! they render as `"<BadFormat>"`. See the [`format`] module for details.
//!
//! Record and sequence layouts can also be compiled into templates with
//! [`Logger::add_layout_format`]: every string in the layout that starts with
//! a directive stays live, everything else is rendered as JSON-like text.
//!
//! # Structured arguments
//!
//! Arguments are converted through [`ToValue`], implemented for primitives,
//! strings, options, collections and [`DateTime<Utc>`]. It can be derived for
//! plain structs:
//!
//! ```rust
//! use blocklog::{config, info, NoopFlusher, ToValue};
//!
//! #[derive(ToValue)]
//! struct Order {
//!     id: u64,
//!     items: Vec<String>,
//! }
//!
//! let registry = config().flusher(NoopFlusher).build();
//! let logger = registry.root();
//! logger.add_format("order", "order ${0:o<1,*>}").unwrap();
//! info!(logger, "order", Order { id: 7, items: vec![] });
//! ```
//!
//! Expansion guards against self-referencing records and sequences, which
//! render as `"<Cycle>"`.
//!
//! # Log filtering
//!
//! There are two levels of filtering. At compile time, the
//! `max_level_*` Cargo features fix [`level::STATIC_MAX_LEVEL`] and the
//! logging macros skip anything above it without evaluating arguments. At
//! runtime, every logger has a memory level and the registry has a write
//! level, both set through [`Config`]. See [`level`] for the levels and their
//! containment rules.
//!
//! # Output
//!
//! The emitter renders into a [`Writer`](emit::Writer). The default
//! [`BufferedWriter`](emit::BufferedWriter) accumulates text and passes it to
//! a [`Flush`] destination:
//!
//! * [`StdoutFlusher`] (default)
//! * [`StderrFlusher`]
//! * [`FileFlusher`]
//! * [`StringFlusher`]
//! * [`NoopFlusher`]
//!
//! A custom writer can defer draining: the emitter then suspends and
//! [`Logger::flush`] returns [`FlushError::DrainPending`] until the writer
//! completes the [`DrainSignal`](emit::DrainSignal) it was handed.
//!
//! ```rust
//! use blocklog::{config, emit::layout, error, StringFlusher};
//!
//! let flusher = StringFlusher::new();
//! let output = flusher.handle();
//! let registry = config()
//!     .flusher(flusher)
//!     .layout(layout().with_name(false))
//!     .build();
//! let logger = registry.root();
//! logger.add_format("boom", "request #request_id failed").unwrap();
//!
//! logger.set_request_id(42);
//! error!(logger, "boom");
//! logger.flush().unwrap();
//! assert_eq!(output.take(), "[ERROR] request 42 failed\n");
//! ```
//!
//! [`CompiledFormat`]: crate::format::CompiledFormat
//! [`Emitter`]: crate::emit::Emitter

/// Macros for logging through a [`Logger`].
mod macros;

/// Utility functions.
mod utils;

/// Tagged block buffer, encoder and level filter.
pub mod buffer;
/// Registry configuration.
pub mod config;
/// Logging context read by expandos, and clocks.
pub mod context;
/// Rendering of buffered messages.
pub mod emit;
/// Template compilation.
pub mod format;
/// Contains logging levels and filters.
pub mod level;
/// Named loggers and the registry they share.
pub mod logger;
/// Values that can be logged.
pub mod value;

pub use chrono::{DateTime, Utc};

pub use config::{config, Config};
pub use logger::{FlushError, FlushResult, Logger, LoggerError, LoggerRegistry, PendingDump};
pub use value::{ToValue, Value};

pub use blocklog_flush::{
    file_flusher::FileFlusher,
    noop_flusher::NoopFlusher,
    stderr_flusher::StderrFlusher,
    stdout_flusher::StdoutFlusher,
    string_flusher::{StringFlusher, StringHandle},
    Flush,
};
