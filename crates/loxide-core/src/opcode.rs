/// Lox bytecode instruction set.
///
/// Each instruction is a one-byte opcode followed by zero or more operand
/// bytes. The operand layout of every opcode is given by [`OpCode::format`]:
///
/// - constant / name / slot / count operands: 1 byte
/// - `ConstantLong`: 3-byte little-endian constant index
/// - jumps and loops: 2-byte big-endian offset
/// - `Closure`: 1-byte function constant, then one `(is_local, index)` byte
///   pair per upvalue of that function
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Push constant `K[u8]`.
    Constant = 0,
    /// Push constant `K[u24]`.
    ConstantLong,
    Nil,
    True,
    False,
    Pop,
    /// Push stack slot `u8` of the current frame.
    GetLocal,
    SetLocal,
    /// Push the global named by constant `K[u8]`.
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    GetUpvalue,
    SetUpvalue,
    GetProperty,
    SetProperty,
    DelProperty,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    /// Unconditional forward jump.
    Jump,
    /// Forward jump when the top of stack is falsey. Does not pop.
    JumpIfFalse,
    /// Unconditional backward jump.
    Loop,
    /// Call with `u8` arguments.
    Call,
    Closure,
    /// Hoist the top stack slot into a closed upvalue, then pop it.
    CloseUpvalue,
    Return,
    Class,
}

impl OpCode {
    /// Number of opcodes.
    pub const COUNT: usize = 34;

    /// Get the opcode from a u8 value.
    pub fn from_u8(val: u8) -> Option<OpCode> {
        if (val as usize) < Self::COUNT {
            // Safety: OpCode is repr(u8) with contiguous discriminants from 0.
            Some(unsafe { std::mem::transmute::<u8, OpCode>(val) })
        } else {
            None
        }
    }

    /// Operand layout following this opcode.
    pub fn format(&self) -> OperandFormat {
        use OpCode::*;
        use OperandFormat::*;
        match self {
            Constant | GetGlobal | DefineGlobal | SetGlobal | GetProperty | SetProperty
            | DelProperty | Class => ConstantIndex,
            ConstantLong => ConstantIndexLong,
            GetLocal | SetLocal | GetUpvalue | SetUpvalue | Call => Byte,
            Jump | JumpIfFalse => JumpForward,
            Loop => JumpBackward,
            Closure => ClosureCaptures,
            Nil | True | False | Pop | Equal | Greater | Less | Add | Subtract | Multiply
            | Divide | Not | Negate | Print | CloseUpvalue | Return => Simple,
        }
    }

    /// Get the name of this opcode.
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            Constant => "OP_CONSTANT",
            ConstantLong => "OP_CONSTANT_LONG",
            Nil => "OP_NIL",
            True => "OP_TRUE",
            False => "OP_FALSE",
            Pop => "OP_POP",
            GetLocal => "OP_GET_LOCAL",
            SetLocal => "OP_SET_LOCAL",
            GetGlobal => "OP_GET_GLOBAL",
            DefineGlobal => "OP_DEFINE_GLOBAL",
            SetGlobal => "OP_SET_GLOBAL",
            GetUpvalue => "OP_GET_UPVALUE",
            SetUpvalue => "OP_SET_UPVALUE",
            GetProperty => "OP_GET_PROPERTY",
            SetProperty => "OP_SET_PROPERTY",
            DelProperty => "OP_DEL_PROPERTY",
            Equal => "OP_EQUAL",
            Greater => "OP_GREATER",
            Less => "OP_LESS",
            Add => "OP_ADD",
            Subtract => "OP_SUBTRACT",
            Multiply => "OP_MULTIPLY",
            Divide => "OP_DIVIDE",
            Not => "OP_NOT",
            Negate => "OP_NEGATE",
            Print => "OP_PRINT",
            Jump => "OP_JUMP",
            JumpIfFalse => "OP_JUMP_IF_FALSE",
            Loop => "OP_LOOP",
            Call => "OP_CALL",
            Closure => "OP_CLOSURE",
            CloseUpvalue => "OP_CLOSE_UPVALUE",
            Return => "OP_RETURN",
            Class => "OP_CLASS",
        }
    }

    /// Operand bytes following the opcode, excluding closure capture pairs.
    pub fn operand_len(&self) -> usize {
        match self.format() {
            OperandFormat::Simple => 0,
            OperandFormat::Byte | OperandFormat::ConstantIndex | OperandFormat::ClosureCaptures => 1,
            OperandFormat::JumpForward | OperandFormat::JumpBackward => 2,
            OperandFormat::ConstantIndexLong => 3,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

/// Operand layout types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandFormat {
    /// No operands.
    Simple,
    /// One raw byte: slot, upvalue index or argument count.
    Byte,
    /// One-byte constant pool index.
    ConstantIndex,
    /// Three-byte little-endian constant pool index.
    ConstantIndexLong,
    /// Two-byte big-endian forward offset.
    JumpForward,
    /// Two-byte big-endian backward offset.
    JumpBackward,
    /// One-byte function constant plus a capture pair per upvalue.
    ClosureCaptures,
}
