//! Dynamic argument and return values.
//!
//! Every value that crosses the interception boundary (arguments, return values,
//! out/ref slots) is carried as a [`Value`]. Shims convert between their Rust
//! signatures and `Value` through `From<T> for Value` and [`FromValue`].

use crate::domain::fake::FakeObject;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dynamically typed argument or return value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// The result of a void call.
    Unit,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// A handle to another faked object.
    #[serde(skip)]
    Fake(FakeObject),
    /// Any other Rust value; compared with its own `PartialEq`.
    #[serde(skip)]
    Opaque(Opaque),
}

impl Value {
    /// Wrap an arbitrary Rust value.
    pub fn opaque<T: OpaqueValue>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_fake(&self) -> Option<&FakeObject> {
        match self {
            Value::Fake(f) => Some(f),
            _ => None,
        }
    }

    /// Convert into a concrete Rust type.
    pub fn to<T: FromValue>(&self) -> Option<T> {
        T::from_value(self.clone())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Fake(a), Value::Fake(b)) => a.id() == b.id(),
            (Value::Opaque(a), Value::Opaque(b)) => a.0.equals(b.0.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Fake(fake) => write!(f, "Faked {}", fake.type_info().name),
            Value::Opaque(o) => f.write_str(&o.0.describe()),
        }
    }
}

/// Object-safe view over an arbitrary comparable Rust value.
pub trait OpaqueValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn equals(&self, other: &dyn OpaqueValue) -> bool;
    fn describe(&self) -> String;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> OpaqueValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &dyn OpaqueValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|o| o == self)
    }

    fn describe(&self) -> String {
        format!("{:?}", self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

#[derive(Clone)]
pub struct Opaque(Arc<dyn OpaqueValue>);

impl Opaque {
    pub fn new<T: OpaqueValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.describe())
    }
}

/// Declared kind of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// void
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
    /// A fakeable type, by name (interface, delegate or unsealed class).
    Fake(String),
    /// Any other Rust type, by name.
    Opaque(String),
    Any,
}

impl ValueKind {
    pub fn is_void(&self) -> bool {
        matches!(self, ValueKind::Unit)
    }

    pub fn is_fakeable(&self) -> bool {
        matches!(self, ValueKind::Fake(_))
    }

    /// True when `value` may be stored in a slot of this kind.
    /// Reference-like kinds accept `Null`.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::Any, _) => true,
            (ValueKind::Unit, Value::Unit) => true,
            (ValueKind::Bool, Value::Bool(_)) => true,
            (ValueKind::Int, Value::Int(_)) => true,
            (ValueKind::Float, Value::Float(_)) => true,
            (ValueKind::Str, Value::Str(_)) => true,
            (ValueKind::List, Value::List(_)) => true,
            (ValueKind::Fake(name), Value::Fake(fake)) => fake.implements(name),
            (ValueKind::Opaque(_), Value::Opaque(_)) => true,
            (ValueKind::Str | ValueKind::List | ValueKind::Fake(_) | ValueKind::Opaque(_), Value::Null) => {
                true
            }
            _ => false,
        }
    }

    /// The language default for the kind (`default(T)`).
    pub fn default_value(&self) -> Value {
        match self {
            ValueKind::Unit => Value::Unit,
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            _ => Value::Null,
        }
    }

    /// What a fake hands back while a call specification is being captured.
    /// Non-null where possible so shims can convert it to their Rust type.
    pub fn placeholder(&self) -> Value {
        match self {
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::List => Value::List(Vec::new()),
            other => other.default_value(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Unit => f.write_str("void"),
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Int => f.write_str("int"),
            ValueKind::Float => f.write_str("float"),
            ValueKind::Str => f.write_str("string"),
            ValueKind::List => f.write_str("list"),
            ValueKind::Fake(name) | ValueKind::Opaque(name) => f.write_str(name),
            ValueKind::Any => f.write_str("any"),
        }
    }
}

/// Conversion out of a [`Value`]; `None` when the value has another shape.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Unit | Value::Null => Some(()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for FakeObject {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Fake(f) => Some(f),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

macro_rules! int_values {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Int(i) => <$t>::try_from(i).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

int_values!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<FakeObject> for Value {
    fn from(v: FakeObject) -> Self {
        Value::Fake(v)
    }
}

impl From<&FakeObject> for Value {
    fn from(v: &FakeObject) -> Self {
        Value::Fake(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
