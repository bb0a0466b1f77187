//! loxide core types: values, heap objects, chunks and the bytecode instruction set.

pub mod chunk;
pub mod gc;
pub mod object;
pub mod opcode;
pub mod string;
pub mod value;
