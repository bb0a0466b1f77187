/// Lox runtime values.
///
/// Numbers, booleans and nil are stored inline. Strings and functions live
/// in the [`Heap`](crate::gc::Heap) and are referenced through typed
/// indices, so a `Value` is always `Copy`.
use crate::gc::{FnRef, Heap, StrRef};
use std::fmt;

/// A Lox value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    /// Interned string; equal contents imply equal handles.
    Str(StrRef),
    Function(FnRef),
}

impl Value {
    // ---- Predicates ----

    #[inline]
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Lox truthiness: only `nil` and `false` are falsey.
    #[inline]
    pub fn is_falsey(self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Whether this value refers to a heap object.
    #[inline]
    pub fn is_object(self) -> bool {
        matches!(self, Value::Str(_) | Value::Function(_))
    }

    // ---- Accessors ----

    #[inline]
    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(self) -> Option<StrRef> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_function(self) -> Option<FnRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// Borrow the heap to produce a printable form of this value.
    pub fn display(self, heap: &Heap) -> ValueDisplay<'_> {
        ValueDisplay { value: self, heap }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Printable view of a [`Value`] resolved against the heap.
pub struct ValueDisplay<'h> {
    value: Value,
    heap: &'h Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => fmt_number(n, f),
            Value::Str(s) => f.write_str(self.heap.str(s)),
            Value::Function(func) => match self.heap.function(func).name {
                Some(name) => write!(f, "<fn {}>", self.heap.str(name)),
                None => f.write_str("<script>"),
            },
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("nan")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{n}")
    }
}
