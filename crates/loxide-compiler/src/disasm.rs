/// Bytecode disassembler.
///
/// ```text
/// == add ==
/// 0000    1 OP_GET_LOCAL        1
/// 0002    | OP_GET_LOCAL        2
/// 0004    | OP_ADD
/// ```
use loxide_core::chunk::Chunk;
use loxide_core::gc::{FnRef, Heap};
use loxide_core::opcode::{OpCode, OperandFormat};
use std::fmt::{self, Write};

/// Disassemble a function and, after it, every function nested in its constants.
pub fn disassemble(heap: &Heap, function: FnRef) -> String {
    Disassembly { heap, function }.to_string()
}

/// Disassemble one instruction. Returns its text and the offset of the next one.
pub fn disassemble_instruction(heap: &Heap, chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = String::new();
    match write_instruction(&mut out, heap, chunk, offset) {
        Ok(next) => (out, next),
        Err(fmt::Error) => (out, chunk.len()),
    }
}

/// Displays a full listing of a function tree.
pub struct Disassembly<'h> {
    pub heap: &'h Heap,
    pub function: FnRef,
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_function(f, self.heap, self.function)
    }
}

fn write_function(out: &mut impl Write, heap: &Heap, function: FnRef) -> fmt::Result {
    let func = heap.function(function);
    let name = func.name.map_or("<script>", |n| heap.str(n));
    writeln!(out, "== {name} ==")?;

    let chunk = &func.chunk;
    let mut offset = 0;
    while offset < chunk.len() {
        offset = write_instruction(out, heap, chunk, offset)?;
    }

    for nested in chunk.constants.iter().filter_map(|v| v.as_function()) {
        writeln!(out)?;
        write_function(out, heap, nested)?;
    }
    Ok(())
}

fn write_instruction(
    out: &mut impl Write,
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
) -> Result<usize, fmt::Error> {
    write!(out, "{offset:04} ")?;
    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        write!(out, "   | ")?;
    } else {
        match line {
            Some(line) => write!(out, "{line:4} ")?,
            None => write!(out, "   ? ")?,
        }
    }

    let byte = chunk.code[offset];
    let Some(op) = OpCode::from_u8(byte) else {
        writeln!(out, "Unknown opcode {byte}")?;
        return Ok(offset + 1);
    };
    let name = op.name();
    let next = offset + 1 + op.operand_len();
    if next > chunk.len() {
        writeln!(out, "{name} <truncated>")?;
        return Ok(chunk.len());
    }

    match op.format() {
        OperandFormat::Simple => writeln!(out, "{name}")?,
        OperandFormat::Byte => writeln!(out, "{name:<16} {:4}", chunk.code[offset + 1])?,
        OperandFormat::ConstantIndex => {
            let index = chunk.code[offset + 1] as usize;
            write_constant(out, heap, chunk, name, index)?;
        }
        OperandFormat::ConstantIndexLong => {
            let index = chunk.read_u24(offset + 1);
            write_constant(out, heap, chunk, name, index)?;
        }
        OperandFormat::JumpForward => {
            let jump = chunk.read_u16(offset + 1) as usize;
            writeln!(out, "{name:<16} {offset:4} -> {}", next + jump)?;
        }
        OperandFormat::JumpBackward => {
            let jump = chunk.read_u16(offset + 1) as usize;
            match next.checked_sub(jump) {
                Some(target) => writeln!(out, "{name:<16} {offset:4} -> {target}")?,
                None => writeln!(out, "{name:<16} {offset:4} -> <before start>")?,
            }
        }
        OperandFormat::ClosureCaptures => {
            let index = chunk.code[offset + 1] as usize;
            write_constant(out, heap, chunk, name, index)?;
            return write_captures(out, heap, chunk, index, next);
        }
    }
    Ok(next)
}

fn write_constant(
    out: &mut impl Write,
    heap: &Heap,
    chunk: &Chunk,
    name: &str,
    index: usize,
) -> fmt::Result {
    match chunk.constants.get(index) {
        Some(value) => writeln!(out, "{name:<16} {index:4} '{}'", value.display(heap)),
        None => writeln!(out, "{name:<16} {index:4} <missing>"),
    }
}

/// The `(is_local, index)` pairs that follow a closure instruction.
fn write_captures(
    out: &mut impl Write,
    heap: &Heap,
    chunk: &Chunk,
    index: usize,
    mut offset: usize,
) -> Result<usize, fmt::Error> {
    let count = chunk
        .constants
        .get(index)
        .and_then(|v| v.as_function())
        .map_or(0, |f| heap.function(f).upvalue_count);
    for _ in 0..count {
        if offset + 2 > chunk.len() {
            writeln!(out, "{offset:04}      | <truncated>")?;
            return Ok(chunk.len());
        }
        let kind = if chunk.code[offset] == 1 { "local" } else { "upvalue" };
        let slot = chunk.code[offset + 1];
        writeln!(out, "{offset:04}      |                     {kind} {slot}")?;
        offset += 2;
    }
    Ok(offset)
}
