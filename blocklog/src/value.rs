//! Values passed as logging arguments.
//!
//! Every argument is converted into a [`Value`] once, at the call boundary,
//! through [`ToValue`]. From then on the encoder only matches on the enum.
//!
//! Records and sequences are reference counted and use interior mutability,
//! so graphs that point back at themselves can be built and logged; the
//! encoder detects such cycles by allocation identity.
//!
//! ```rust
//! use blocklog::value::{Record, ToValue, Value};
//!
//! let request = Record::new();
//! request.insert("url", "/index.html".to_value());
//! request.insert("attempt", 3i32.to_value());
//! let request = Value::from(request);
//!
//! assert!(matches!(request, Value::Record(_)));
//! ```

use std::{
    cell::{Ref, RefCell},
    collections::{BTreeMap, HashMap},
    fmt::Display,
    rc::Rc,
};

use chrono::{DateTime, Utc};

pub use blocklog_macros::ToValue;

/// A numeric argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) if x.is_nan() => f.write_str("NaN"),
            Number::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // -0 prints as 0
            Number::Float(x) if *x == 0.0 => f.write_str("0"),
            Number::Float(x) if x.abs() >= 1e21 || x.abs() < 1e-6 => {
                let exp = format!("{:e}", x);
                match exp.split_once('e') {
                    Some((mantissa, power)) if !power.starts_with('-') => {
                        write!(f, "{}e+{}", mantissa, power)
                    }
                    _ => f.write_str(&exp),
                }
            }
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A logged argument.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    Text(Rc<str>),
    Instant(DateTime<Utc>),
    Record(Rc<Record>),
    Sequence(Rc<Sequence>),
    /// A function-like value; only its name is kept.
    Callable(Rc<str>),
    /// Anything the logger has no rendering for.
    Opaque,
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Value {
        Value::Text(Rc::from(s.as_ref()))
    }

    pub fn callable(name: impl AsRef<str>) -> Value {
        Value::Callable(Rc::from(name.as_ref()))
    }

    /// Builds a record from `(name, value)` pairs, keeping their order.
    pub fn record<K, I>(fields: I) -> Value
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let record = Record::new();
        for (name, value) in fields {
            record.insert(name, value);
        }
        Value::Record(Rc::new(record))
    }

    pub fn sequence<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Sequence(Rc::new(Sequence::from_iter(items)))
    }

    /// Short type name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Instant(_) => "instant",
            Value::Record(_) => "record",
            Value::Sequence(_) => "sequence",
            Value::Callable(_) => "callable",
            Value::Opaque => "opaque",
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Rc::new(record))
    }
}

impl From<Sequence> for Value {
    fn from(sequence: Sequence) -> Self {
        Value::Sequence(Rc::new(sequence))
    }
}

/// Insertion-ordered named fields.
#[derive(Default)]
pub struct Record {
    fields: RefCell<Vec<(Rc<str>, Value)>>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    pub fn with_capacity(capacity: usize) -> Record {
        Record {
            fields: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    /// Appends a field, replacing the value in place if the name exists.
    pub fn insert(&self, name: impl AsRef<str>, value: Value) {
        let name = name.as_ref();
        let mut fields = self.fields.borrow_mut();
        match fields.iter_mut().find(|(n, _)| &**n == name) {
            Some((_, slot)) => *slot = value,
            None => fields.push((Rc::from(name), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .borrow()
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fields(&self) -> Ref<'_, Vec<(Rc<str>, Value)>> {
        self.fields.borrow()
    }
}

/// Ordered items.
#[derive(Default)]
pub struct Sequence {
    items: RefCell<Vec<Value>>,
}

impl Sequence {
    pub fn new() -> Sequence {
        Sequence::default()
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }
}

// Records may contain themselves, so debug output stays shallow.
impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record").field("len", &self.len()).finish()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence").field("len", &self.len()).finish()
    }
}

impl FromIterator<Value> for Sequence {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Sequence {
            items: RefCell::new(iter.into_iter().collect()),
        }
    }
}

/// Conversion of host values into a [`Value`].
///
/// Can be derived for structs: named fields become a record, tuple fields a
/// sequence.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_to_value_int {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Number(Number::Int(*self as i64))
                }
            }
        )*
    };
}

impl_to_value_int!(i8, i16, i32, i64, u8, u16, u32, isize);

macro_rules! impl_to_value_wide_int {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(i) => Value::Number(Number::Int(i)),
                        Err(_) => Value::Number(Number::Float(*self as f64)),
                    }
                }
            }
        )*
    };
}

impl_to_value_wide_int!(u64, usize);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Number(Number::Float(*self as f64))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Number(Number::Float(*self))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::text(self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::text(self)
    }
}

impl ToValue for Rc<str> {
    fn to_value(&self) -> Value {
        Value::Text(Rc::clone(self))
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Instant(*self)
    }
}

impl ToValue for Rc<Record> {
    fn to_value(&self) -> Value {
        Value::Record(Rc::clone(self))
    }
}

impl ToValue for Rc<Sequence> {
    fn to_value(&self) -> Value {
        Value::Sequence(Rc::clone(self))
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::sequence(self.iter().map(ToValue::to_value))
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<K: AsRef<str>, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::record(self.iter().map(|(k, v)| (k, v.to_value())))
    }
}

impl<K: AsRef<str>, V: ToValue, S> ToValue for HashMap<K, V, S> {
    fn to_value(&self) -> Value {
        Value::record(self.iter().map(|(k, v)| (k, v.to_value())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_script_numbers() {
        assert_eq!(Number::Float(5.0).to_string(), "5");
        assert_eq!(Number::Float(0.25).to_string(), "0.25");
        assert_eq!(Number::Int(-3).to_string(), "-3");
        assert_eq!(Number::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Number::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn extreme_floats_use_exponent_form() {
        assert_eq!(Number::Float(-0.0).to_string(), "0");
        assert_eq!(Number::Float(1e300).to_string(), "1e+300");
        assert_eq!(Number::Float(-2.5e21).to_string(), "-2.5e+21");
        assert_eq!(Number::Float(1.5e-7).to_string(), "1.5e-7");
        assert_eq!(Number::Float(1e20).to_string(), "100000000000000000000");
        assert_eq!(Number::Float(0.000001).to_string(), "0.000001");
    }

    #[test]
    fn record_keeps_insertion_order() {
        let record = Record::new();
        record.insert("zeta", 1i32.to_value());
        record.insert("alpha", 2i32.to_value());
        record.insert("zeta", 3i32.to_value());

        let names: Vec<_> = record.fields().iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert!(matches!(
            record.get("zeta"),
            Some(Value::Number(Number::Int(3)))
        ));
    }

    #[test]
    fn wide_integers_fall_back_to_float() {
        assert!(matches!(
            u64::MAX.to_value(),
            Value::Number(Number::Float(_))
        ));
        assert!(matches!(
            7usize.to_value(),
            Value::Number(Number::Int(7))
        ));
    }

    #[test]
    fn containers_convert_recursively() {
        let value = vec![Some(1i32), None].to_value();
        let Value::Sequence(seq) = value else {
            panic!("expected a sequence");
        };
        let items = seq.items();
        assert!(matches!(items[0], Value::Number(Number::Int(1))));
        assert!(matches!(items[1], Value::Null));
    }
}
