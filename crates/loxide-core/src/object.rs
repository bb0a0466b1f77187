//! Heap object types other than strings.

use crate::chunk::Chunk;
use crate::gc::StrRef;

/// A compiled function: the unit handed from the compiler to the interpreter.
#[derive(Debug, Default)]
pub struct Function {
    /// `None` for the top-level script.
    pub name: Option<StrRef>,
    pub arity: usize,
    /// Number of upvalue descriptors the closure instruction carries.
    pub upvalue_count: usize,
    pub chunk: Chunk,
}

impl Function {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_script(&self) -> bool {
        self.name.is_none()
    }
}
