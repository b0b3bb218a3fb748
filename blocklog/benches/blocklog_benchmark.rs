use std::rc::Rc;

use blocklog::{
    buffer::TaggedBuffer,
    context::{GlobalContext, MacroContext, SystemClock},
    emit::{layout, BufferedWriter, Emitter},
    format::CompiledFormat,
    level::Level,
    value::Value,
    NoopFlusher, ToValue,
};
use criterion::{black_box, criterion_group, criterion_main, Bencher, Criterion};
use minstant::Instant;

/// Times `$loop_f` over all iterations, then runs `$cleanup_f` outside the
/// measured section.
macro_rules! loop_with_cleanup {
    ($bencher:expr, $loop_f:expr, $cleanup_f:expr) => {{
        $bencher.iter_custom(|iters| {
            let start = Instant::now();

            for _i in 0..iters {
                $loop_f;
            }

            let end = Instant::now() - start;

            $cleanup_f;

            end
        })
    }};
}

#[derive(ToValue, Clone)]
struct SmallStruct {
    symbol: &'static str,
    id: u64,
    side: &'static str,
}

#[derive(ToValue, Clone)]
struct BigStruct {
    vec: Vec<i32>,
    some: &'static str,
}

struct Fixture {
    globals: GlobalContext,
    module: Rc<str>,
    clock: SystemClock,
}

impl Fixture {
    fn new() -> Fixture {
        Fixture {
            globals: GlobalContext::new("bench", "127.0.0.1"),
            module: Rc::from("bench"),
            clock: SystemClock::new(),
        }
    }

    fn ctx(&self) -> MacroContext<'_> {
        MacroContext::new(&self.globals, &self.module, &self.clock)
    }
}

fn format(template: &str) -> Rc<CompiledFormat> {
    // templates below are known to compile
    Rc::new(CompiledFormat::compile("bench", template).unwrap())
}

fn small() -> SmallStruct {
    SmallStruct {
        symbol: "SOME_PAIR",
        id: 12345678,
        side: "ask",
    }
}

fn big() -> BigStruct {
    BigStruct {
        vec: vec![1; 100],
        some: "The quick brown fox jumps over the lazy dog",
    }
}

fn bench_encode_literal(b: &mut Bencher) {
    let fixture = Fixture::new();
    let fmt = format("Simple format string without arguments");
    let mut buffer = TaggedBuffer::new();
    loop_with_cleanup!(
        b,
        buffer.log_message(&fixture.ctx(), Level::Info, &fmt, &[]),
        buffer.clear()
    );
}

fn bench_encode_single_slot(b: &mut Bencher) {
    let fixture = Fixture::new();
    let fmt = format("order ${0:s} qty ${1:n} ok ${2:b} at #wall_time");
    let args = [
        "SOME_PAIR".to_value(),
        123i32.to_value(),
        true.to_value(),
    ];
    let mut buffer = TaggedBuffer::new();
    loop_with_cleanup!(
        b,
        buffer.log_message(&fixture.ctx(), Level::Info, &fmt, black_box(&args)),
        buffer.clear()
    );
}

fn bench_encode_small_struct(b: &mut Bencher) {
    let fixture = Fixture::new();
    let fmt = format("Some data ${0:o}");
    let bs = black_box(small());
    let mut buffer = TaggedBuffer::new();
    loop_with_cleanup!(
        b,
        buffer.log_message(&fixture.ctx(), Level::Info, &fmt, &[bs.to_value()]),
        buffer.clear()
    );
}

fn bench_encode_big_struct(b: &mut Bencher) {
    let fixture = Fixture::new();
    let fmt = format("Some data ${0:o<2,*>}");
    let value: Value = black_box(big()).to_value();
    let mut buffer = TaggedBuffer::new();
    loop_with_cleanup!(
        b,
        buffer.log_message(
            &fixture.ctx(),
            Level::Info,
            &fmt,
            std::slice::from_ref(&value)
        ),
        buffer.clear()
    );
}

fn bench_filter_and_emit(b: &mut Bencher) {
    let fixture = Fixture::new();
    let fmt_small = format("Some data ${0:o}");
    let fmt_plain = format("order ${0:s} qty ${1:n}");
    let value = small().to_value();
    let args = ["SOME_PAIR".to_value(), 123i32.to_value()];

    let mut hot = TaggedBuffer::new();
    let mut pending = TaggedBuffer::new();
    let mut emitter = Emitter::new(layout());
    let mut writer = BufferedWriter::new(NoopFlusher);

    b.iter(|| {
        for i in 0..64 {
            let level = if i % 2 == 0 { Level::Warn } else { Level::Debug };
            hot.log_message(&fixture.ctx(), level, &fmt_small, std::slice::from_ref(&value));
            hot.log_message(&fixture.ctx(), level, &fmt_plain, &args);
        }
        hot.process_for_write(Level::Info, &mut pending);
        black_box(emitter.resume(&mut pending, &mut writer));
    });
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Encode");
    group.bench_function("bench literal", bench_encode_literal);
    group.bench_function("bench single slot", bench_encode_single_slot);
    group.bench_function("bench SmallStruct", bench_encode_small_struct);
    group.bench_function("bench BigStruct", bench_encode_big_struct);
    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Emit");
    group.bench_function("bench filter and emit", bench_filter_and_emit);
    group.finish();
}

criterion_group!(benches, bench_encode, bench_emit);
criterion_main!(benches);
