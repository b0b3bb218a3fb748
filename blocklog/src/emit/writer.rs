use std::{cell::Cell, fmt::Write as _, rc::Rc};

use blocklog_flush::{stdout_flusher::StdoutFlusher, Flush};

/// Bytes a [`BufferedWriter`] accumulates before asking to be drained.
pub const DEFAULT_DRAIN_THRESHOLD: usize = 4096;

/// Text sink the emitter renders into.
///
/// A writer may buffer freely. After each complete message the emitter asks
/// [`needs_to_drain`](Writer::needs_to_drain), and if so hands over a
/// [`DrainSignal`] through [`drain`](Writer::drain). Emission resumes only
/// once that signal has been completed, which may happen inside `drain` or
/// at any later point.
///
/// # Examples
///
/// ```rust
/// use blocklog::emit::{DrainSignal, Writer};
///
/// #[derive(Default)]
/// struct Lines {
///     current: String,
///     done: Vec<String>,
/// }
///
/// impl Writer for Lines {
///     fn emit_char(&mut self, c: char) {
///         self.current.push(c);
///     }
///
///     fn emit_str(&mut self, s: &str) {
///         self.current.push_str(s);
///     }
///
///     fn needs_to_drain(&self) -> bool {
///         self.current.len() > 80
///     }
///
///     fn drain(&mut self, signal: DrainSignal) {
///         self.done.push(std::mem::take(&mut self.current));
///         signal.complete();
///     }
/// }
/// ```
pub trait Writer {
    fn emit_char(&mut self, c: char);

    fn emit_str(&mut self, s: &str);

    /// Emits `s[start..end]`. Out of range spans emit nothing.
    fn emit_str_span(&mut self, s: &str, start: usize, end: usize) {
        if let Some(span) = s.get(start..end) {
            self.emit_str(span);
        }
    }

    /// Emits formatted text. Writers backed by a [`std::fmt::Write`] should
    /// override this to skip the intermediate string.
    fn emit_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.emit_str(s),
            None => self.emit_str(&args.to_string()),
        }
    }

    fn needs_to_drain(&self) -> bool;

    /// Flushes buffered output. `signal` must be completed exactly once.
    fn drain(&mut self, signal: DrainSignal);
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn emit_char(&mut self, c: char) {
        (**self).emit_char(c)
    }

    fn emit_str(&mut self, s: &str) {
        (**self).emit_str(s)
    }

    fn emit_str_span(&mut self, s: &str, start: usize, end: usize) {
        (**self).emit_str_span(s, start, end)
    }

    fn emit_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        (**self).emit_fmt(args)
    }

    fn needs_to_drain(&self) -> bool {
        (**self).needs_to_drain()
    }

    fn drain(&mut self, signal: DrainSignal) {
        (**self).drain(signal)
    }
}

/// One-shot completion handed to [`Writer::drain`].
#[must_use = "emission stays suspended until the signal is completed"]
pub struct DrainSignal {
    done: Rc<Cell<bool>>,
}

impl DrainSignal {
    /// Reports the drain as finished.
    pub fn complete(self) {
        self.done.set(true);
    }
}

/// Emitter side of a [`DrainSignal`].
pub struct DrainWatch {
    done: Rc<Cell<bool>>,
}

impl DrainWatch {
    pub fn is_complete(&self) -> bool {
        self.done.get()
    }

    /// The signal was dropped without being completed.
    pub fn is_abandoned(&self) -> bool {
        !self.done.get() && Rc::strong_count(&self.done) == 1
    }
}

/// Creates a linked signal and watch.
pub fn drain_signal() -> (DrainSignal, DrainWatch) {
    let done = Rc::new(Cell::new(false));
    (
        DrainSignal {
            done: Rc::clone(&done),
        },
        DrainWatch { done },
    )
}

/// Default [`Writer`]: buffers text in a `String` and hands it to a
/// [`Flush`] destination on every drain.
///
/// Draining completes synchronously. Failures of the destination are
/// reported through `tracing` and the text is dropped.
pub struct BufferedWriter {
    buf: String,
    threshold: usize,
    flusher: Box<dyn Flush>,
}

impl BufferedWriter {
    pub fn new(flusher: impl Flush + 'static) -> BufferedWriter {
        Self::with_threshold(flusher, DEFAULT_DRAIN_THRESHOLD)
    }

    pub fn with_threshold(flusher: impl Flush + 'static, threshold: usize) -> BufferedWriter {
        BufferedWriter {
            buf: String::with_capacity(threshold),
            threshold,
            flusher: Box::new(flusher),
        }
    }

    /// Text rendered but not yet flushed.
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    /// Writes buffer to underlying flusher.
    fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let chunk = std::mem::replace(&mut self.buf, String::with_capacity(self.threshold));
        if let Err(e) = self.flusher.flush_one(chunk) {
            tracing::warn!(error = %e, "failed to flush rendered log output");
        }
    }
}

impl Default for BufferedWriter {
    fn default() -> Self {
        Self::new(StdoutFlusher)
    }
}

impl Writer for BufferedWriter {
    #[inline]
    fn emit_char(&mut self, c: char) {
        self.buf.push(c);
    }

    #[inline]
    fn emit_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn emit_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        // only a misbehaving Display impl can fail here
        if let Err(e) = self.buf.write_fmt(args) {
            tracing::warn!(error = %e, "failed to format log value");
        }
    }

    fn needs_to_drain(&self) -> bool {
        self.buf.len() >= self.threshold
    }

    fn drain(&mut self, signal: DrainSignal) {
        self.flush();
        signal.complete();
    }
}
