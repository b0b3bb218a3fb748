// Tuple fields become a sequence.
use blocklog::{value::Value, ToValue};

#[derive(ToValue)]
struct Point(f32, f32, f32);

fn main() {
    let Value::Sequence(sequence) = Point(0.5, 1.0, -2.0).to_value() else {
        panic!("expected a sequence");
    };
    assert_eq!(sequence.len(), 3);
}
