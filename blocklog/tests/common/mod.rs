// Not every test file uses every helper
#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use blocklog::{
    buffer::TaggedBuffer,
    context::{FixedClock, GlobalContext, MacroContext},
    emit::{DrainSignal, EmitStatus, Emitter, Layout, Writer},
    format::CompiledFormat,
    level::Level,
    value::Value,
};
use chrono::{DateTime, TimeZone, Utc};

pub(crate) const APP_NAME: &str = "app";
pub(crate) const IP_ADDR: &str = "10.0.0.1";
pub(crate) const MODULE_NAME: &str = "core";

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

pub(crate) fn compiled(name: &str, template: &str) -> Rc<CompiledFormat> {
    Rc::new(CompiledFormat::compile(name, template).unwrap())
}

/// Fixed logging context for driving the encoder directly.
pub(crate) struct Harness {
    globals: GlobalContext,
    module: Rc<str>,
    clock: FixedClock,
}

impl Harness {
    pub(crate) fn new() -> Harness {
        Harness {
            globals: GlobalContext::new(APP_NAME, IP_ADDR),
            module: Rc::from(MODULE_NAME),
            clock: FixedClock(fixed_time()),
        }
    }

    pub(crate) fn encode(
        &self,
        buffer: &mut TaggedBuffer,
        level: Level,
        format: &Rc<CompiledFormat>,
        args: &[Value],
    ) {
        let ctx = MacroContext::new(&self.globals, &self.module, &self.clock);
        buffer.log_message(&ctx, level, format, args);
    }
}

/// Renders `buffer` to completion and returns the text.
pub(crate) fn render(buffer: &mut TaggedBuffer, layout: Layout) -> String {
    let mut writer = CaptureWriter::default();
    let mut emitter = Emitter::new(layout);
    assert_eq!(emitter.resume(buffer, &mut writer), EmitStatus::Done);
    writer.drained.concat()
}

/// Bare layout without a terminator: only the message text.
pub(crate) fn text_only() -> Layout {
    Layout::bare().with_terminator("")
}

/// Writer keeping every drained chunk, draining synchronously.
#[derive(Default)]
pub(crate) struct CaptureWriter {
    pub(crate) current: String,
    pub(crate) drained: Vec<String>,
    pub(crate) threshold: Option<usize>,
}

impl Writer for CaptureWriter {
    fn emit_char(&mut self, c: char) {
        self.current.push(c);
    }

    fn emit_str(&mut self, s: &str) {
        self.current.push_str(s);
    }

    fn needs_to_drain(&self) -> bool {
        matches!(self.threshold, Some(n) if self.current.len() >= n)
    }

    fn drain(&mut self, signal: DrainSignal) {
        if !self.current.is_empty() {
            self.drained.push(std::mem::take(&mut self.current));
        }
        signal.complete();
    }
}

#[derive(Default)]
struct DeferredState {
    written: String,
    in_flight: Option<(String, DrainSignal)>,
    drains: usize,
}

/// Writer that holds on to its drain signal until the test completes it,
/// like a sink waiting on slow I/O.
pub(crate) struct DeferredWriter {
    buf: String,
    threshold: usize,
    state: Rc<RefCell<DeferredState>>,
}

/// Test side of a [`DeferredWriter`].
#[derive(Clone)]
pub(crate) struct DeferredHandle {
    state: Rc<RefCell<DeferredState>>,
}

pub(crate) fn deferred_writer(threshold: usize) -> (DeferredWriter, DeferredHandle) {
    let state = Rc::new(RefCell::new(DeferredState::default()));
    (
        DeferredWriter {
            buf: String::new(),
            threshold,
            state: Rc::clone(&state),
        },
        DeferredHandle { state },
    )
}

impl Writer for DeferredWriter {
    fn emit_char(&mut self, c: char) {
        self.buf.push(c);
    }

    fn emit_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn needs_to_drain(&self) -> bool {
        self.buf.len() >= self.threshold
    }

    fn drain(&mut self, signal: DrainSignal) {
        let chunk = std::mem::take(&mut self.buf);
        let mut state = self.state.borrow_mut();
        state.drains += 1;
        state.in_flight = Some((chunk, signal));
    }
}

impl DeferredHandle {
    pub(crate) fn is_draining(&self) -> bool {
        self.state.borrow().in_flight.is_some()
    }

    /// Completes the outstanding drain. Returns `false` if there was none.
    pub(crate) fn complete(&self) -> bool {
        let mut state = self.state.borrow_mut();
        match state.in_flight.take() {
            Some((chunk, signal)) => {
                state.written.push_str(&chunk);
                signal.complete();
                true
            }
            None => false,
        }
    }

    pub(crate) fn written(&self) -> String {
        self.state.borrow().written.clone()
    }

    pub(crate) fn drains(&self) -> usize {
        self.state.borrow().drains
    }
}
