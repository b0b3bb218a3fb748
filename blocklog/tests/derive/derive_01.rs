// Named fields become record properties, in declaration order.
use blocklog::{value::Value, ToValue};

#[derive(ToValue)]
struct Login {
    user: String,
    attempts: u8,
}

fn main() {
    let login = Login {
        user: "ann".to_string(),
        attempts: 2,
    };
    let Value::Record(record) = login.to_value() else {
        panic!("expected a record");
    };
    assert_eq!(record.len(), 2);
    assert_eq!(&*record.fields()[0].0, "user");
    assert_eq!(&*record.fields()[1].0, "attempts");
}
