//! Rendering of encoded messages into text.
//!
//! The [`Emitter`] walks a [`TaggedBuffer`] slot by slot with an explicit
//! frame stack: one frame for the message being rendered, plus one per open
//! record or sequence. Literal template text is interleaved from the
//! message's [`CompiledFormat`], values come from the buffer.
//!
//! After every complete message the emitter asks its [`Writer`] whether it
//! needs to drain. If it does, emission is suspended and
//! [`Emitter::resume`] returns [`EmitStatus::Pending`] until the writer
//! completes the [`DrainSignal`] it was handed. The next call picks up at
//! the exact next slot.
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use blocklog::{
//!     buffer::TaggedBuffer,
//!     context::{FixedClock, GlobalContext, MacroContext},
//!     emit::{layout, BufferedWriter, EmitStatus, Emitter},
//!     format::CompiledFormat,
//!     level::Level,
//!     value::ToValue,
//!     StringFlusher,
//! };
//! # use chrono::{TimeZone, Utc};
//!
//! let globals = GlobalContext::new("app", "127.0.0.1");
//! let module: Rc<str> = Rc::from("main");
//! let clock = FixedClock(Utc.timestamp_nanos(0));
//! let ctx = MacroContext::new(&globals, &module, &clock);
//!
//! let format = Rc::new(CompiledFormat::compile("greet", "hello ${0:s}").unwrap());
//! let mut buffer = TaggedBuffer::new();
//! buffer.log_message(&ctx, Level::Info, &format, &["world".to_value()]);
//!
//! let flusher = StringFlusher::new();
//! let output = flusher.handle();
//! let mut writer = BufferedWriter::new(flusher);
//! let mut emitter = Emitter::new(layout());
//!
//! assert_eq!(emitter.resume(&mut buffer, &mut writer), EmitStatus::Done);
//! assert_eq!(output.take(), "[INFO] greet> hello world\n");
//! assert!(buffer.is_empty());
//! ```

mod writer;

use std::rc::Rc;

pub use writer::{
    drain_signal, BufferedWriter, DrainSignal, DrainWatch, Writer, DEFAULT_DRAIN_THRESHOLD,
};

use crate::{
    buffer::{Cursor, Entry, Scalar, TaggedBuffer},
    format::{CompiledFormat, FormatEntryTag},
    level::Level,
};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Controls the text written around each message.
///
/// By default a message renders as `[LEVEL] name> text` followed by `\n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    level: bool,
    name: bool,
    terminator: String,
}

impl Layout {
    /// Toggles whether to print the level label.
    pub fn with_level(self, level: bool) -> Self {
        Self { level, ..self }
    }

    /// Toggles whether to print the format name.
    pub fn with_name(self, name: bool) -> Self {
        Self { name, ..self }
    }

    /// Text written after every message.
    pub fn with_terminator(self, terminator: impl Into<String>) -> Self {
        Self {
            terminator: terminator.into(),
            ..self
        }
    }

    /// Message text and terminator only.
    pub fn bare() -> Layout {
        Layout::default().with_level(false).with_name(false)
    }

    fn write_preamble(&self, w: &mut dyn Writer, name: &str, level: Level) {
        if self.level {
            w.emit_char('[');
            w.emit_str(level.label());
            w.emit_str("] ");
        }
        if self.name {
            w.emit_str(name);
            w.emit_str("> ");
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            level: true,
            name: true,
            terminator: "\n".to_string(),
        }
    }
}

/// Returns the default [`Layout`], to be customized further.
pub fn layout() -> Layout {
    Layout::default()
}

/// Outcome of [`Emitter::resume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitStatus {
    /// The buffer was fully rendered, drained and cleared.
    Done,
    /// Waiting on the writer to complete a drain.
    Pending,
}

enum Frame {
    Message {
        format: Rc<CompiledFormat>,
        /// Index of the next format entry to render.
        next: usize,
    },
    Record {
        needs_comma: bool,
        /// A property name was written, its value comes next.
        awaiting_value: bool,
    },
    Sequence {
        needs_comma: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AfterDrain {
    Continue,
    Finish,
}

enum State {
    Idle,
    Running,
    Draining { watch: DrainWatch, then: AfterDrain },
}

/// Stack machine rendering a [`TaggedBuffer`] through a [`Writer`].
pub struct Emitter {
    layout: Layout,
    frames: Vec<Frame>,
    cursor: Cursor,
    state: State,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl Emitter {
    pub fn new(layout: Layout) -> Emitter {
        Emitter {
            layout,
            frames: Vec::new(),
            cursor: Cursor::default(),
            state: State::Idle,
            on_complete: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    /// Installs a callback fired once the current run is finished.
    pub fn on_complete(&mut self, callback: impl FnOnce() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// No run is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Renders `buffer` from where the previous call stopped.
    ///
    /// Returns [`EmitStatus::Pending`] while a drain is outstanding; call
    /// again, with the same buffer, once the writer has completed it. When
    /// the buffer is exhausted the writer is drained one final time, the
    /// buffer is cleared and the completion callback runs.
    pub fn resume(&mut self, buffer: &mut TaggedBuffer, writer: &mut dyn Writer) -> EmitStatus {
        if let State::Idle = self.state {
            self.state = State::Running;
        }

        loop {
            if let State::Draining { watch, then } = &self.state {
                if !watch.is_complete() {
                    if !watch.is_abandoned() {
                        return EmitStatus::Pending;
                    }
                    tracing::warn!("writer dropped its drain signal without completing it");
                }
                let then = *then;
                self.state = State::Running;
                if then == AfterDrain::Finish {
                    self.finish(buffer);
                    return EmitStatus::Done;
                }
            }

            let Some((at, entry)) = buffer.entry_from(self.cursor) else {
                if !self.frames.is_empty() {
                    tracing::warn!(
                        depth = self.frames.len(),
                        "log buffer ended inside a message"
                    );
                    self.frames.clear();
                }
                self.start_drain(writer, AfterDrain::Finish);
                continue;
            };

            self.cursor = at.advanced();
            if self.step(entry, writer) && writer.needs_to_drain() {
                self.start_drain(writer, AfterDrain::Continue);
            }
        }
    }

    fn start_drain(&mut self, writer: &mut dyn Writer, then: AfterDrain) {
        let (signal, watch) = drain_signal();
        self.state = State::Draining { watch, then };
        writer.drain(signal);
    }

    fn finish(&mut self, buffer: &mut TaggedBuffer) {
        buffer.clear();
        self.cursor = Cursor::default();
        self.frames.clear();
        self.state = State::Idle;
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }

    /// Consumes one slot. Returns `true` when it ended a message.
    fn step(&mut self, entry: &Entry, w: &mut dyn Writer) -> bool {
        match entry {
            Entry::MsgFormat(format) => {
                if !self.frames.is_empty() {
                    tracing::warn!(
                        format = format.name(),
                        "message started inside an unfinished message"
                    );
                    self.frames.clear();
                }
                self.frames.push(Frame::Message {
                    format: Rc::clone(format),
                    next: 0,
                });
            }
            Entry::MsgLevel(level) => {
                if let Some(Frame::Message { format, next }) = self.frames.last_mut() {
                    self.layout.write_preamble(w, format.name(), *level);
                    w.emit_str(format.prefix());
                    write_literals(&**format, next, w);
                }
            }
            Entry::MsgEnd => {
                while let Some(frame) = self.frames.pop() {
                    if let Frame::Message { .. } = frame {
                        break;
                    }
                    tracing::warn!("unclosed bracket at end of message");
                }
                w.emit_str(&self.layout.terminator);
                return true;
            }
            Entry::ObjectOpen => {
                self.begin_value(w);
                w.emit_char('{');
                self.frames.push(Frame::Record {
                    needs_comma: false,
                    awaiting_value: false,
                });
            }
            Entry::ArrayOpen => {
                self.begin_value(w);
                w.emit_char('[');
                self.frames.push(Frame::Sequence { needs_comma: false });
            }
            Entry::ObjectClose => self.close(w, '}'),
            Entry::ArrayClose => self.close(w, ']'),
            Entry::PropertyName(name) => {
                if let Some(Frame::Record {
                    needs_comma,
                    awaiting_value,
                }) = self.frames.last_mut()
                {
                    if *needs_comma {
                        w.emit_str(", ");
                    }
                    *needs_comma = true;
                    *awaiting_value = true;
                }
                emit_quoted(w, name);
                w.emit_str(": ");
            }
            value => {
                let nested = self.begin_value(w);
                render_value(value, nested, w);
                self.end_value(w);
            }
        }

        false
    }

    /// Writes the separator a value needs inside its enclosing record or
    /// sequence. Returns whether there is such an enclosing frame.
    fn begin_value(&mut self, w: &mut dyn Writer) -> bool {
        match self.frames.last_mut() {
            Some(Frame::Record {
                needs_comma,
                awaiting_value,
            }) => {
                if *awaiting_value {
                    *awaiting_value = false;
                } else {
                    if *needs_comma {
                        w.emit_str(", ");
                    }
                    *needs_comma = true;
                }
                true
            }
            Some(Frame::Sequence { needs_comma }) => {
                if *needs_comma {
                    w.emit_str(", ");
                }
                *needs_comma = true;
                true
            }
            _ => false,
        }
    }

    fn close(&mut self, w: &mut dyn Writer, bracket: char) {
        match self.frames.last() {
            Some(Frame::Record { .. }) | Some(Frame::Sequence { .. }) => {
                self.frames.pop();
            }
            _ => {
                tracing::warn!(%bracket, "closing bracket without an open one");
                return;
            }
        }
        w.emit_char(bracket);
        self.end_value(w);
    }

    /// After a complete value at message level, writes the template text up
    /// to the next value.
    fn end_value(&mut self, w: &mut dyn Writer) {
        let Some(Frame::Message { format, next }) = self.frames.last_mut() else {
            return;
        };
        if *next >= format.entries().len() {
            tracing::warn!(
                format = format.name(),
                "more values than the format has entries"
            );
            return;
        }
        let span = format.trailing_span(*next);
        w.emit_str_span(format.template(), span.start, span.end);
        *next += 1;
        write_literals(&**format, next, w);
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

/// Writes consecutive literal entries starting at `next`, with the text that
/// follows each of them. Literals have no slot in the buffer.
fn write_literals(format: &CompiledFormat, next: &mut usize, w: &mut dyn Writer) {
    while let Some(FormatEntryTag::Literal(c)) = format.entries().get(*next).map(|e| e.tag) {
        w.emit_char(c.as_char());
        let span = format.trailing_span(*next);
        w.emit_str_span(format.template(), span.start, span.end);
        *next += 1;
    }
}

fn render_value(entry: &Entry, nested: bool, w: &mut dyn Writer) {
    match entry {
        Entry::Plain(scalar) => render_scalar(scalar, nested, w),
        Entry::BadFormatArg => w.emit_str("\"<BadFormat>\""),
        Entry::OpaqueValue => w.emit_str("\"<Value>\""),
        Entry::OpaqueRecord => w.emit_str("\"<Object>\""),
        Entry::OpaqueSequence => w.emit_str("\"<Array>\""),
        Entry::CycleDetected => w.emit_str("\"<Cycle>\""),
        Entry::LengthBoundHit => w.emit_str("\"<LengthBoundHit>\""),
        structural => tracing::debug!(tag = ?structural.tag(), "not a value, skipped"),
    }
}

fn render_scalar(scalar: &Scalar, nested: bool, w: &mut dyn Writer) {
    match scalar {
        Scalar::Null => w.emit_str("null"),
        Scalar::Bool(b) => w.emit_str(if *b { "true" } else { "false" }),
        Scalar::Number(n) => w.emit_fmt(format_args!("{}", n)),
        Scalar::Text(s) if nested => emit_quoted(w, s),
        Scalar::Text(s) => w.emit_str(s),
        Scalar::Time(t) if nested => w.emit_fmt(format_args!("\"{}\"", t.format(TIME_FORMAT))),
        Scalar::Time(t) => w.emit_fmt(format_args!("{}", t.format(TIME_FORMAT))),
        Scalar::Callable(name) if nested => w.emit_fmt(format_args!("\"[Function {}]\"", name)),
        Scalar::Callable(name) => w.emit_fmt(format_args!("[Function {}]", name)),
    }
}

fn emit_quoted(w: &mut dyn Writer, s: &str) {
    w.emit_char('"');
    let mut rest = s;
    while let Some(idx) = rest.find(|c: char| c == '"' || c == '\\') {
        w.emit_str(&rest[..idx]);
        w.emit_char('\\');
        w.emit_str(&rest[idx..idx + 1]);
        rest = &rest[idx + 1..];
    }
    w.emit_str(rest);
    w.emit_char('"');
}
