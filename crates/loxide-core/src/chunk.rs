/// Bytecode chunk: instructions, constant pool, and run-length line info.
use crate::opcode::OpCode;
use crate::value::Value;
use thiserror::Error;

/// Largest constant pool a chunk can address (24-bit wide operand).
pub const MAX_CONSTANTS: usize = 1 << 24;

/// Largest index the one-byte constant operand can hold.
pub const MAX_SHORT_CONSTANT: usize = u8::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
}

/// Start of a run of bytes that share a source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineStart {
    pub offset: usize,
    pub line: u32,
}

/// A compiled sequence of bytecode.
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    /// Constant pool. No deduplication: insertion order is the index.
    pub constants: Vec<Value>,
    /// One entry per run of same-line bytes, strictly increasing by offset.
    pub lines: Vec<LineStart>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    // ---- Writing ----

    /// Append a byte produced by source line `line`.
    pub fn write(&mut self, byte: u8, line: u32) {
        let offset = self.code.len();
        self.code.push(byte);
        if self.lines.last().is_some_and(|run| run.line == line) {
            return;
        }
        self.lines.push(LineStart { offset, line });
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append a constant to the pool, returning its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add `value` to the pool and emit the instruction that loads it:
    /// `Constant` with a one-byte index when it fits, otherwise
    /// `ConstantLong` with a three-byte little-endian index.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Result<usize, ChunkError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        let index = self.add_constant(value);
        if index <= MAX_SHORT_CONSTANT {
            self.write_op(OpCode::Constant, line);
            self.write(index as u8, line);
        } else {
            self.write_op(OpCode::ConstantLong, line);
            self.write(index as u8, line);
            self.write((index >> 8) as u8, line);
            self.write((index >> 16) as u8, line);
        }
        Ok(index)
    }

    /// Overwrite the big-endian 16-bit operand at `offset`.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    // ---- Reading ----

    /// Big-endian 16-bit operand at `offset`.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
    }

    /// Little-endian 24-bit operand at `offset`.
    pub fn read_u24(&self, offset: usize) -> usize {
        self.code[offset] as usize
            | (self.code[offset + 1] as usize) << 8
            | (self.code[offset + 2] as usize) << 16
    }

    /// Source line of the byte at `offset`, or `None` if `offset` is past
    /// the end of the code.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        if offset >= self.code.len() {
            return None;
        }
        let runs = &self.lines;
        let (mut lo, mut hi) = (0, runs.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let run = runs[mid];
            if offset < run.offset {
                hi = mid;
            } else if mid + 1 == runs.len() || offset < runs[mid + 1].offset {
                return Some(run.line);
            } else {
                lo = mid + 1;
            }
        }
        None
    }
}
