// Unit struct becomes an empty record.
use blocklog::{value::Value, ToValue};

#[derive(ToValue)]
struct Heartbeat;

fn main() {
    let Value::Record(record) = Heartbeat.to_value() else {
        panic!("expected a record");
    };
    assert!(record.is_empty());
}
