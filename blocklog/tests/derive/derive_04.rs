// Derived values can be logged through the macros.
use blocklog::{config, info, NoopFlusher, ToValue};

#[derive(ToValue)]
struct Quote {
    bid: f64,
    ask: f64,
}

fn main() {
    let registry = config().flusher(NoopFlusher).build();
    let logger = registry.root();
    logger.add_format("quote", "quote ${0:o<1,2>}").unwrap();
    info!(logger, "quote", Quote { bid: 1.0, ask: 1.5 });
    logger.flush().unwrap_err();
}
