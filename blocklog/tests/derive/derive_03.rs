// Borrowed fields and generic parameters.
use blocklog::{value::Value, ToValue};

#[derive(ToValue)]
struct Tagged<'a, T> {
    tag: &'a str,
    value: T,
}

fn main() {
    let tag = String::from("depth");
    let tagged = Tagged {
        tag: &tag,
        value: vec![1u32, 2, 3],
    };
    let Value::Record(record) = tagged.to_value() else {
        panic!("expected a record");
    };
    assert!(matches!(record.get("value"), Some(Value::Sequence(_))));
}
