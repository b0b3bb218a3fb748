//! Named loggers sharing one in-memory buffer and one output writer.
//!
//! A [`LoggerRegistry`] is the composition root: it owns the hot buffer that
//! every logger appends to, the pending buffer the level filter copies into
//! on [`Logger::flush`], the [`Emitter`] and the [`Writer`]. Loggers are
//! cheap handles into it.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use crate::{
    buffer::TaggedBuffer,
    config::{Config, Output},
    context::{Clock, GlobalContext, MacroContext},
    emit::{EmitStatus, Emitter, Writer},
    format::{CompileError, CompiledFormat},
    level::Level,
    utils::unlikely,
    value::Value,
};

/// Errors returned while setting up loggers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoggerError {
    #[error("logger `{logger}` already defines format `{name}`")]
    DuplicateFormat { logger: String, name: String },
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("cannot replace the writer while an emission is in flight")]
    EmissionInFlight,
}

/// Errors that can be presented when flushing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushError {
    /// Nothing passed the write level and no emission is in flight.
    Empty,
    /// The writer has not completed its drain yet, flush again later.
    DrainPending,
}

pub type FlushResult = Result<(), FlushError>;

struct Shared {
    globals: GlobalContext,
    clock: Box<dyn Clock>,
    hot: TaggedBuffer,
    pending: TaggedBuffer,
    emitter: Emitter,
    writer: Box<dyn Writer>,
    write_level: Level,
    memory_level: Level,
    loggers: HashMap<Rc<str>, Rc<LoggerState>>,
    closed: bool,
}

struct LoggerState {
    name: Rc<str>,
    memory_level: Cell<Level>,
    formats: RefCell<HashMap<Rc<str>, Rc<CompiledFormat>>>,
}

/// Owns the buffers, emitter and writer shared by a family of loggers.
///
/// Built from a [`Config`], usually through [`Config::build`].
pub struct LoggerRegistry {
    shared: Rc<RefCell<Shared>>,
    app_name: Rc<str>,
}

impl LoggerRegistry {
    pub fn new(config: Config) -> LoggerRegistry {
        let memory_level = config.effective_memory_level();
        let Config {
            app_name,
            ip_addr,
            write_level,
            output,
            drain_threshold,
            clock,
            layout,
            ..
        } = config;

        let shared = Shared {
            globals: GlobalContext::new(&app_name, &ip_addr),
            clock,
            hot: TaggedBuffer::new(),
            pending: TaggedBuffer::new(),
            emitter: Emitter::new(layout),
            writer: Config::make_writer(output, drain_threshold),
            write_level,
            memory_level,
            loggers: HashMap::new(),
            closed: false,
        };

        LoggerRegistry {
            shared: Rc::new(RefCell::new(shared)),
            app_name: Rc::from(app_name),
        }
    }

    /// Returns the logger registered under `name`, creating it at the
    /// registry's memory level on first use. Every call with the same name
    /// returns a handle to the same logger.
    pub fn logger(&self, name: &str) -> Logger {
        self.get_or_create(name, None)
    }

    /// Like [`logger`](LoggerRegistry::logger), but also sets the logger's
    /// memory level. The level is widened to the write level if needed.
    pub fn logger_with_level(&self, name: &str, memory_level: Level) -> Logger {
        self.get_or_create(name, Some(memory_level))
    }

    /// Logger named after the application.
    pub fn root(&self) -> Logger {
        let name = Rc::clone(&self.app_name);
        self.logger(&name)
    }

    pub fn write_level(&self) -> Level {
        self.shared.borrow().write_level
    }

    /// Replaces the output writer. Only possible between emission runs.
    pub fn set_writer(&self, writer: impl Writer + 'static) -> Result<(), LoggerError> {
        let mut shared = self.shared.borrow_mut();
        if !shared.emitter.is_idle() {
            return Err(LoggerError::EmissionInFlight);
        }
        shared.writer = Box::new(writer);
        Ok(())
    }

    /// Filters and renders whatever is buffered, see [`Logger::flush`].
    pub fn flush(&self) -> FlushResult {
        flush_shared(&self.shared)
    }

    /// Stops recording and writes out everything recorded before the call.
    ///
    /// Messages logged afterwards, through any handle, are dropped. If the
    /// writer defers a drain, [`FlushError::DrainPending`] is returned and
    /// `close` must be called again once the drain has completed; nothing
    /// recorded before the first call is lost in between.
    pub fn close(&self) -> FlushResult {
        match self.shared.try_borrow_mut() {
            Ok(mut shared) => shared.closed = true,
            // called from inside the writer's drain
            Err(_) => return Err(FlushError::DrainPending),
        }

        // a run suspended before closing may leave newer messages behind
        loop {
            match flush_shared(&self.shared) {
                Ok(()) => continue,
                Err(FlushError::Empty) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.borrow().closed
    }

    fn get_or_create(&self, name: &str, memory_level: Option<Level>) -> Logger {
        let mut shared = self.shared.borrow_mut();
        let write_level = shared.write_level;
        let level = memory_level.map(|level| level.union(write_level));

        if let Some(state) = shared.loggers.get(name) {
            if let Some(level) = level {
                state.memory_level.set(level);
            }
            return Logger {
                shared: Rc::clone(&self.shared),
                state: Rc::clone(state),
            };
        }

        let name: Rc<str> = Rc::from(name);
        let state = Rc::new(LoggerState {
            name: Rc::clone(&name),
            memory_level: Cell::new(level.unwrap_or(shared.memory_level)),
            formats: RefCell::new(HashMap::new()),
        });
        shared.loggers.insert(name, Rc::clone(&state));
        tracing::debug!(logger = %state.name, level = %state.memory_level.get(), "created logger");

        Logger {
            shared: Rc::clone(&self.shared),
            state,
        }
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

/// Handle to a named logger.
///
/// Clones, and handles obtained from the registry under the same name, all
/// refer to the same logger and see the same formats.
#[derive(Clone)]
pub struct Logger {
    shared: Rc<RefCell<Shared>>,
    state: Rc<LoggerState>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn memory_level(&self) -> Level {
        self.state.memory_level.get()
    }

    /// Whether a message at `level` would be recorded.
    #[inline]
    pub fn is_enabled(&self, level: Level) -> bool {
        level != Level::Off && level.is_enabled_under(self.state.memory_level.get())
    }

    pub fn has_format(&self, name: &str) -> bool {
        self.state.formats.borrow().contains_key(name)
    }

    /// Compiles `template` and registers it under `name`.
    pub fn add_format(&self, name: &str, template: &str) -> Result<(), LoggerError> {
        self.register(name, |name| CompiledFormat::compile(name, template))
    }

    /// Compiles a record or sequence layout and registers it under `name`.
    pub fn add_layout_format(&self, name: &str, layout: &Value) -> Result<(), LoggerError> {
        self.register(name, |name| CompiledFormat::compile_layout(name, layout))
    }

    /// Registers several text templates, stopping at the first failure.
    pub fn add_formats<'a, I>(&self, formats: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        formats
            .into_iter()
            .try_for_each(|(name, template)| self.add_format(name, template))
    }

    fn register<F>(&self, name: &str, compile: F) -> Result<(), LoggerError>
    where
        F: FnOnce(&str) -> Result<CompiledFormat, CompileError>,
    {
        if self.has_format(name) {
            let err = LoggerError::DuplicateFormat {
                logger: self.name().to_string(),
                name: name.to_string(),
            };
            tracing::warn!(error = %err, "format not registered");
            return Err(err);
        }

        let format = compile(name).map_err(|e| {
            tracing::warn!(logger = self.name(), error = %e, "format not registered");
            LoggerError::from(e)
        })?;

        self.state
            .formats
            .borrow_mut()
            .insert(Rc::from(name), Rc::new(format));
        Ok(())
    }

    /// Records a message at `level` using the format registered as
    /// `format_name`.
    ///
    /// Never fails: unknown formats and logging from inside a flush are
    /// reported through `tracing` and the message is dropped.
    pub fn log(&self, level: Level, format_name: &str, args: &[Value]) {
        if !self.is_enabled(level) {
            return;
        }

        let format = match self.state.formats.borrow().get(format_name) {
            Some(format) => Rc::clone(format),
            None => {
                tracing::warn!(
                    logger = self.name(),
                    format = format_name,
                    "no such format, message dropped"
                );
                return;
            }
        };

        let Ok(mut guard) = self.shared.try_borrow_mut() else {
            tracing::error!(
                logger = self.name(),
                format = format_name,
                "logged while the registry was busy, message dropped"
            );
            return;
        };
        let shared = &mut *guard;
        if unlikely(shared.closed) {
            return;
        }

        let ctx = MacroContext::new(&shared.globals, &self.state.name, &*shared.clock);
        shared.hot.log_message(&ctx, level, &format, args);
    }

    pub fn fatal(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Fatal, format_name, args)
    }

    pub fn error(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Error, format_name, args)
    }

    pub fn warn(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Warn, format_name, args)
    }

    pub fn info(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Info, format_name, args)
    }

    pub fn debug(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Debug, format_name, args)
    }

    pub fn trace(&self, format_name: &str, args: &[Value]) {
        self.log(Level::Trace, format_name, args)
    }

    /// Advances the counter reported by `#logical_time`.
    pub fn increment_logical_time(&self) {
        self.with_globals(|g| g.logical_time += 1);
    }

    pub fn logical_time(&self) -> u64 {
        self.shared.borrow().globals.logical_time
    }

    pub fn request_id(&self) -> i64 {
        self.shared.borrow().globals.request_id
    }

    pub fn set_request_id(&self, request_id: i64) {
        self.with_globals(|g| g.request_id = request_id);
    }

    pub fn callback_id(&self) -> i64 {
        self.shared.borrow().globals.callback_id
    }

    pub fn set_callback_id(&self, callback_id: i64) {
        self.with_globals(|g| g.callback_id = callback_id);
    }

    fn with_globals(&self, f: impl FnOnce(&mut GlobalContext)) {
        match self.shared.try_borrow_mut() {
            Ok(mut shared) => f(&mut shared.globals),
            Err(_) => tracing::error!(
                logger = self.name(),
                "context updated while the registry was busy, ignored"
            ),
        }
    }

    /// Writes out everything recorded so far that passes the write level.
    ///
    /// When no emission is in flight, the hot buffer is filtered into the
    /// pending buffer and cleared. The emitter then renders the pending
    /// buffer until it is done or the writer defers a drain, in which case
    /// [`FlushError::DrainPending`] is returned and the next call continues
    /// where this one stopped.
    pub fn flush(&self) -> FlushResult {
        flush_shared(&self.shared)
    }

    /// Renders every message currently in memory, whatever its level, into
    /// `writer`. The hot buffer is left untouched.
    ///
    /// Returns a [`PendingDump`] if `writer` deferred a drain before the dump
    /// was complete.
    pub fn emit_on_issue_notify(&self, writer: &mut dyn Writer) -> Option<PendingDump> {
        let mut dump = {
            let Ok(shared) = self.shared.try_borrow() else {
                tracing::error!(logger = self.name(), "issue dump requested while busy");
                return None;
            };
            let mut buffer = TaggedBuffer::new();
            shared.hot.copy_retained(Level::All, &mut buffer);
            PendingDump {
                buffer,
                emitter: Emitter::new(shared.emitter.layout().clone()),
            }
        };

        match dump.resume(writer) {
            EmitStatus::Done => None,
            EmitStatus::Pending => Some(dump),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.state.name)
            .field("memory_level", &self.state.memory_level.get())
            .finish()
    }
}

/// Remainder of an issue dump whose writer deferred a drain.
#[must_use = "the rest of the dump is only written by calling `resume`"]
pub struct PendingDump {
    buffer: TaggedBuffer,
    emitter: Emitter,
}

impl PendingDump {
    pub fn resume(&mut self, writer: &mut dyn Writer) -> EmitStatus {
        self.emitter.resume(&mut self.buffer, writer)
    }
}

fn flush_shared(shared: &RefCell<Shared>) -> FlushResult {
    let Ok(mut guard) = shared.try_borrow_mut() else {
        // called from inside the writer's drain
        return Err(FlushError::DrainPending);
    };
    let shared = &mut *guard;

    if shared.emitter.is_idle() {
        shared
            .hot
            .process_for_write(shared.write_level, &mut shared.pending);
        if shared.pending.is_empty() {
            return Err(FlushError::Empty);
        }
    }

    match shared.emitter.resume(&mut shared.pending, &mut *shared.writer) {
        EmitStatus::Done => Ok(()),
        EmitStatus::Pending => Err(FlushError::DrainPending),
    }
}

#[cfg(test)]
mod tests {
    use blocklog_flush::string_flusher::StringFlusher;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{config, context::FixedClock, value::ToValue};

    fn registry() -> (LoggerRegistry, blocklog_flush::string_flusher::StringHandle) {
        let flusher = StringFlusher::new();
        let out = flusher.handle();
        let registry = config()
            .app_name("svc")
            .flusher(flusher)
            .clock(FixedClock(Utc.timestamp_nanos(0)))
            .build();
        (registry, out)
    }

    #[test]
    fn same_name_is_aliased() {
        let (registry, _) = registry();
        let a = registry.logger("db");
        let b = registry.logger("db");
        a.add_format("open", "opened ${0:s}").unwrap();
        assert!(b.has_format("open"));
        assert!(!registry.logger("net").has_format("open"));
        assert_eq!(registry.root().name(), "svc");
    }

    #[test]
    fn duplicate_format_is_rejected() {
        let (registry, _) = registry();
        let logger = registry.root();
        logger.add_format("x", "one").unwrap();
        assert_eq!(
            logger.add_format("x", "two"),
            Err(LoggerError::DuplicateFormat {
                logger: "svc".to_string(),
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn compile_failure_is_returned() {
        let (registry, _) = registry();
        let err = registry.root().add_format("bad", "a\nb").unwrap_err();
        assert!(matches!(err, LoggerError::Compile(_)));
        assert!(!registry.root().has_format("bad"));
    }

    #[test]
    fn memory_level_never_below_write_level() {
        let (registry, _) = registry();
        let logger = registry.logger_with_level("quiet", Level::Fatal);
        assert_eq!(logger.memory_level(), Level::Warn);
        let logger = registry.logger_with_level("chatty", Level::Trace);
        assert_eq!(logger.memory_level(), Level::Trace);
        assert!(!logger.is_enabled(Level::Off));
    }

    #[test]
    fn flush_writes_only_write_level() {
        let (registry, out) = registry();
        let logger = registry.root();
        logger.add_format("n", "n=${0:n}").unwrap();
        logger.info("n", &[1i32.to_value()]);
        logger.error("n", &[2i32.to_value()]);

        assert_eq!(logger.flush(), Ok(()));
        assert_eq!(out.take(), "[ERROR] n> n=2\n");
        assert_eq!(logger.flush(), Err(FlushError::Empty));
    }

    #[test]
    fn unknown_format_is_dropped() {
        let (registry, out) = registry();
        let logger = registry.root();
        logger.error("missing", &[]);
        assert_eq!(logger.flush(), Err(FlushError::Empty));
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn context_setters() {
        let (registry, _) = registry();
        let logger = registry.root();
        assert_eq!(logger.request_id(), -1);
        logger.set_request_id(7);
        logger.set_callback_id(9);
        logger.increment_logical_time();
        logger.increment_logical_time();

        let other = registry.logger("other");
        assert_eq!(other.request_id(), 7);
        assert_eq!(other.callback_id(), 9);
        assert_eq!(other.logical_time(), 2);
    }

    #[test]
    fn close_flushes_and_stops_logging() {
        let (registry, out) = registry();
        let logger = registry.root();
        logger.add_format("bye", "bye").unwrap();
        logger.warn("bye", &[]);
        assert_eq!(registry.close(), Ok(()));
        assert!(registry.is_closed());
        assert_eq!(out.take(), "[WARN] bye> bye\n");

        logger.warn("bye", &[]);
        assert_eq!(logger.flush(), Err(FlushError::Empty));
    }
}
