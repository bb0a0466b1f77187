//! loxide compiler: scanner and single-pass bytecode compiler for Lox.

pub mod compiler;
pub mod disasm;
pub mod error;
pub mod scanner;
pub mod token;

pub use compiler::compile;
pub use error::{CompileError, CompileErrors};
