use std::cell::Cell;

use blocklog::{
    config, debug,
    emit::{layout, DrainSignal, Writer},
    error, info,
    level::Level,
    log, trace,
    value::{Record, Value},
    warn, FlushError, LoggerError, StringFlusher, StringHandle, ToValue,
};

mod common;

use common::{deferred_writer, fixed_time, CaptureWriter};

fn string_registry(write_level: Level) -> (blocklog::LoggerRegistry, StringHandle) {
    let flusher = StringFlusher::new();
    let out = flusher.handle();
    let registry = config()
        .app_name("svc")
        .ip_addr("192.168.1.20")
        .write_level(write_level)
        .flusher(flusher)
        .clock(blocklog::context::FixedClock(fixed_time()))
        .build();
    (registry, out)
}

fn counted(calls: &Cell<u32>) -> u32 {
    calls.set(calls.get() + 1);
    calls.get()
}

#[test]
fn macros_record_and_flush() {
    let (registry, out) = string_registry(Level::Info);
    let logger = registry.logger("http");
    logger
        .add_formats([
            ("req", "#ip_addr #module_name ${0:s} ${1:n}"),
            ("ok", "served in ${0:n}ms"),
            ("fail", "failed: ${0:g}"),
        ])
        .unwrap();

    info!(logger, "req", "GET", 200);
    debug!(logger, "ok", 3);
    warn!(logger, "ok", 1.5);
    error!(logger, "fail", Value::record([("code", 500i32.to_value())]));

    assert_eq!(logger.flush(), Ok(()));
    assert_eq!(
        out.lines(),
        [
            "[INFO] req> 192.168.1.20 http GET 200",
            "[WARN] ok> served in 1.5ms",
            "[ERROR] fail> failed: {\"code\": 500}",
        ]
    );
}

#[test]
fn disabled_levels_skip_arguments() {
    let (registry, _) = string_registry(Level::Warn);
    let logger = registry.logger_with_level("lazy", Level::Info);
    logger.add_format("n", "${0:n}").unwrap();

    let calls = Cell::new(0);
    trace!(logger, "n", counted(&calls));
    debug!(logger, "n", counted(&calls));
    assert_eq!(calls.get(), 0);

    log!(logger, Level::Info, "n", counted(&calls));
    assert_eq!(calls.get(), 1);
}

#[test]
fn only_write_level_reaches_the_writer() {
    let (registry, out) = string_registry(Level::Error);
    let logger = registry.logger_with_level("db", Level::Trace);
    logger.add_format("q", "query ${0:s}").unwrap();

    logger.trace("q", &["a".to_value()]);
    logger.info("q", &["b".to_value()]);
    logger.error("q", &["c".to_value()]);
    logger.fatal("q", &["d".to_value()]);

    assert_eq!(registry.flush(), Ok(()));
    assert_eq!(out.lines(), ["[ERROR] q> query c", "[FATAL] q> query d"]);
    assert_eq!(registry.flush(), Err(FlushError::Empty));
}

#[test]
fn expandos_follow_context_updates() {
    let (registry, out) = string_registry(Level::Info);
    let logger = registry.root();
    logger
        .add_format(
            "ctx",
            "#app_name #msg_name #logical_time #request_id #callback_id #wall_time",
        )
        .unwrap();

    logger.info("ctx", &[]);
    logger.increment_logical_time();
    logger.set_request_id(12);
    logger.set_callback_id(3);
    logger.info("ctx", &[]);

    logger.flush().unwrap();
    assert_eq!(
        out.lines(),
        [
            "[INFO] ctx> svc ctx 0 -1 -1 2024-01-02T03:04:05.000Z",
            "[INFO] ctx> svc ctx 1 12 3 2024-01-02T03:04:05.000Z",
        ]
    );
}

#[test]
fn layout_formats() {
    let (registry, out) = string_registry(Level::Info);
    let logger = registry.root();

    let layout = Record::new();
    layout.insert("id", "${0:n}".to_value());
    layout.insert("app", "#app_name".to_value());
    layout.insert("note", "fixed".to_value());
    logger
        .add_layout_format("req", &Value::from(layout))
        .unwrap();

    info!(logger, "req", 7);
    logger.flush().unwrap();
    assert_eq!(
        out.take(),
        "[INFO] req> { \"id\": 7, \"app\": svc, \"note\": \"fixed\" }\n"
    );

    assert!(matches!(
        logger.add_layout_format("scalar", &"${0:n}".to_value()),
        Err(LoggerError::Compile(_))
    ));
}

#[test]
fn flush_resumes_after_deferred_drains() {
    let (writer, handle) = deferred_writer(1);
    let registry = config()
        .write_level(Level::Info)
        .writer(writer)
        .layout(layout().with_level(false))
        .build();
    let logger = registry.logger("jobs");
    logger.add_format("run", "run ${0:n}").unwrap();

    info!(logger, "run", 1);
    info!(logger, "run", 2);

    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert!(handle.is_draining());
    assert_eq!(handle.written(), "");

    // nothing moves until the writer completes
    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert_eq!(
        registry.set_writer(CaptureWriter::default()),
        Err(LoggerError::EmissionInFlight)
    );

    // recorded while the emission is suspended, written by a later run
    info!(logger, "run", 3);

    assert!(handle.complete());
    assert_eq!(handle.written(), "run> run 1\n");
    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert!(handle.complete());
    assert_eq!(handle.written(), "run> run 1\nrun> run 2\n");

    // final drain at the end of the run
    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert!(handle.complete());
    assert_eq!(logger.flush(), Ok(()));
    assert_eq!(handle.drains(), 3);

    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert!(handle.complete());
    assert_eq!(logger.flush(), Err(FlushError::DrainPending));
    assert!(handle.complete());
    assert_eq!(logger.flush(), Ok(()));
    assert_eq!(handle.written(), "run> run 1\nrun> run 2\nrun> run 3\n");
}

#[test]
fn close_waits_for_deferred_drains() {
    let (writer, handle) = deferred_writer(1);
    let registry = config()
        .write_level(Level::Info)
        .writer(writer)
        .layout(layout().with_level(false))
        .build();
    let logger = registry.logger("jobs");
    logger.add_format("run", "run ${0:n}").unwrap();

    info!(logger, "run", 1);
    info!(logger, "run", 2);
    assert_eq!(logger.flush(), Err(FlushError::DrainPending));

    // recorded while suspended, still owed by close
    info!(logger, "run", 3);

    assert_eq!(registry.close(), Err(FlushError::DrainPending));
    assert!(registry.is_closed());
    info!(logger, "run", 4);

    while registry.close() == Err(FlushError::DrainPending) {
        assert!(handle.complete());
    }
    assert!(!handle.is_draining());
    assert_eq!(handle.written(), "run> run 1\nrun> run 2\nrun> run 3\n");
    assert_eq!(logger.flush(), Err(FlushError::Empty));
}

#[test]
fn issue_dump_renders_everything_in_memory() {
    let (registry, out) = string_registry(Level::Error);
    let logger = registry.logger_with_level("pay", Level::Trace);
    logger.add_format("step", "step ${0:s}").unwrap();

    logger.debug("step", &["auth".to_value()]);
    logger.info("step", &["charge".to_value()]);

    let mut dump = CaptureWriter::default();
    assert!(logger.emit_on_issue_notify(&mut dump).is_none());
    assert_eq!(
        dump.drained.concat(),
        "[DEBUG] step> step auth\n[INFO] step> step charge\n"
    );

    // the hot buffer is untouched by the dump
    assert_eq!(logger.flush(), Err(FlushError::Empty));
    assert_eq!(out.contents(), "");

    let mut dump = CaptureWriter::default();
    assert!(logger.emit_on_issue_notify(&mut dump).is_none());
    assert_eq!(dump.drained.concat(), "");
}

#[test]
fn issue_dump_can_be_resumed() {
    struct Holding {
        text: String,
        held: Option<DrainSignal>,
    }

    impl Writer for Holding {
        fn emit_char(&mut self, c: char) {
            self.text.push(c);
        }

        fn emit_str(&mut self, s: &str) {
            self.text.push_str(s);
        }

        fn needs_to_drain(&self) -> bool {
            true
        }

        fn drain(&mut self, signal: DrainSignal) {
            self.held = Some(signal);
        }
    }

    let (registry, _) = string_registry(Level::Error);
    let logger = registry.logger_with_level("pay", Level::Info);
    logger.add_format("step", "step").unwrap();
    logger.info("step", &[]);
    logger.info("step", &[]);

    let mut writer = Holding {
        text: String::new(),
        held: None,
    };
    let mut dump = logger.emit_on_issue_notify(&mut writer).unwrap();
    assert_eq!(writer.text, "[INFO] step> step\n");

    while let Some(signal) = writer.held.take() {
        signal.complete();
        dump.resume(&mut writer);
    }
    assert_eq!(writer.text, "[INFO] step> step\n[INFO] step> step\n");
}

#[test]
fn registration_errors() {
    let (registry, _) = string_registry(Level::Warn);
    let logger = registry.root();

    assert!(matches!(
        logger.add_format("bad", "#nope"),
        Err(LoggerError::Compile(_))
    ));
    assert!(matches!(
        logger.add_formats([("a", "ok"), ("b", "${x:n}"), ("c", "never")]),
        Err(LoggerError::Compile(_))
    ));
    assert!(logger.has_format("a"));
    assert!(!logger.has_format("c"));

    // a failed registration does not disturb the others
    logger.add_format("b", "fine ${0:b}").unwrap();
    assert!(matches!(
        logger.add_format("a", "again"),
        Err(LoggerError::DuplicateFormat { .. })
    ));
}

#[test]
fn aliased_handles_share_formats() {
    let (registry, out) = string_registry(Level::Warn);
    registry.logger("api").add_format("e", "e").unwrap();
    warn!(registry.logger("api"), "e");
    registry.flush().unwrap();
    assert_eq!(out.take(), "[WARN] e> e\n");
}
