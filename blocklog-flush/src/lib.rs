//! ## `Flush` trait
//!
//! Destination for text that the blocklog emitter has finished rendering,
//! i.e. writing to a file, writing to stdout, capturing into a string.
//!
//! The emitter never talks to a `Flush` directly. It renders into a buffered
//! writer, and the writer hands over everything it accumulated whenever it
//! drains.
//!
//! ## Example usage of `Flush`
//!
//! ```rust
//! use blocklog_flush::Flush;
//! # use blocklog_flush::string_flusher::StringFlusher;
//! # fn render(line: &str) -> String { format!("{}\n", line) }
//! let mut flusher = StringFlusher::new();
//! let output = flusher.handle();
//!
//! for line in ["first", "second"] {
//!     // flusher implements `Flush` trait
//!     flusher.flush_one(render(line)).unwrap();
//! }
//!
//! assert_eq!(output.take(), "first\nsecond\n");
//! ```

use std::io;

/// Flushes to a file
pub mod file_flusher;
/// No-op Flush, does nothing
pub mod noop_flusher;
/// Flushes to stderr through `eprint!` macro
pub mod stderr_flusher;
/// Flushes to stdout through `print!` macro
pub mod stdout_flusher;
/// Captures everything flushed into a shared string
pub mod string_flusher;

/// Simple trait that allows an underlying implementation of Flush to
/// perform some type of IO operation, i.e. writing to file, writing to
/// stdout, etc
pub trait Flush {
    /// Takes a chunk of rendered log text (one or more complete lines) and
    /// potentially performs I/O operations such as writing to a file or to
    /// stdout
    fn flush_one(&mut self, display: String) -> io::Result<()>;
}

impl<F: Flush + ?Sized> Flush for Box<F> {
    fn flush_one(&mut self, display: String) -> io::Result<()> {
        (**self).flush_one(display)
    }
}
