/// Single-pass Lox compiler: source → function object holding bytecode.
///
/// There is no syntax tree. The parser pulls tokens from the scanner and
/// emits bytes into the chunk of the innermost function being compiled.
pub mod expr;
pub mod scope;

use crate::error::{CompileError, CompileErrors, ErrorLocation};
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};
use loxide_core::chunk::MAX_SHORT_CONSTANT;
use loxide_core::gc::{FnRef, GcRoots, Heap};
use loxide_core::opcode::OpCode;
use loxide_core::value::Value;
use scope::{FunctionKind, FunctionStack, FunctionState, Upvalue};

/// Lookahead and error flags shared by every nested function.
struct Parser<'src> {
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    /// Suppresses cascading errors until the next statement boundary.
    panic_mode: bool,
}

/// A compilation session: one per [`compile`] call.
///
/// Holding the heap mutably for the session's lifetime means at most one
/// compilation can be in flight against a heap.
pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    parser: Parser<'src>,
    functions: FunctionStack<'src>,
    heap: &'h mut Heap,
    /// Objects the host keeps alive in the same heap.
    host: &'h dyn GcRoots,
    errors: Vec<CompileError>,
    functions_compiled: usize,
}

/// Compile `source` into a script function allocated in `heap`.
///
/// `roots` reports every object the caller still holds in `heap`; they are
/// marked alongside the compiler's own objects by any collection that runs
/// while compiling. The returned handle is not rooted; callers that allocate
/// again before using it must report it as a root.
pub fn compile(source: &str, heap: &mut Heap, roots: &dyn GcRoots) -> Result<FnRef, CompileErrors> {
    let mut compiler = Compiler::new(source, heap, roots);
    compiler.advance();
    while !compiler.matches(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.finish()
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(source: &'src str, heap: &'h mut Heap, host: &'h dyn GcRoots) -> Self {
        let script = heap.alloc_function(host);
        let placeholder = Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 1,
        };
        Compiler {
            scanner: Scanner::new(source),
            parser: Parser {
                current: placeholder,
                previous: placeholder,
                had_error: false,
                panic_mode: false,
            },
            functions: FunctionStack::new(FunctionState::new(script, FunctionKind::Script)),
            heap,
            host,
            errors: Vec::new(),
            functions_compiled: 0,
        }
    }

    fn finish(mut self) -> Result<FnRef, CompileErrors> {
        self.emit_return();
        let Compiler {
            functions,
            heap,
            parser,
            errors,
            functions_compiled,
            ..
        } = self;
        let (function, _) = store_function(heap, functions.into_script());
        tracing::debug!(
            functions = functions_compiled + 1,
            errors = errors.len(),
            "compile finished"
        );
        if parser.had_error {
            Err(CompileErrors(errors))
        } else {
            Ok(function)
        }
    }

    // ---- Token handling ----

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;
        loop {
            self.parser.current = self.scanner.scan_token();
            if self.parser.current.kind != TokenKind::Error {
                break;
            }
            let message = self.parser.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // ---- Error reporting ----

    fn error(&mut self, message: impl ToString) {
        let token = self.parser.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: impl ToString) {
        let token = self.parser.current;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: impl ToString) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;
        self.parser.had_error = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Lexical,
            _ => ErrorLocation::Token(token.lexeme.to_string()),
        };
        let error = CompileError {
            line: token.line,
            location,
            message: message.to_string(),
        };
        tracing::trace!(%error, "diagnostic");
        self.errors.push(error);
    }

    /// Skip tokens until a likely statement boundary and leave panic mode.
    fn synchronize(&mut self) {
        self.parser.panic_mode = false;
        while self.parser.current.kind != TokenKind::Eof {
            if self.parser.previous.kind == TokenKind::Semicolon {
                return;
            }
            if self.parser.current.kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // ---- Emission ----

    fn current_function(&mut self) -> &mut FunctionState<'src> {
        self.functions.current_mut()
    }

    fn code_len(&self) -> usize {
        self.functions.current().chunk.len()
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line;
        self.current_function().chunk.write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_op_byte(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    fn emit_return(&mut self) {
        self.emit_ops(OpCode::Nil, OpCode::Return);
    }

    /// Emit a load of `value`, short or wide depending on its pool index.
    fn emit_constant(&mut self, value: Value) {
        let line = self.parser.previous.line;
        if let Err(err) = self.current_function().chunk.write_constant(value, line) {
            self.error(err);
        }
    }

    /// Add `value` to the pool for an instruction with a one-byte operand.
    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.current_function().chunk.add_constant(value);
        if index > MAX_SHORT_CONSTANT {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let s = self.heap.intern(name, &SessionRoots::new(self.host, &self.functions));
        self.make_constant(Value::Str(s))
    }

    // ---- Jumps ----

    /// Emit a jump with a placeholder offset; returns the operand's offset.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.code_len() - 2
    }

    /// Point the jump operand at `offset` to the current end of code.
    fn patch_jump(&mut self, offset: usize) {
        let jump = self.code_len() - offset - 2;
        match u16::try_from(jump) {
            Ok(jump) => self.current_function().chunk.patch_u16(offset, jump),
            Err(_) => self.error("Too much code to jump over."),
        }
    }

    /// Emit a backward jump to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.code_len() - loop_start + 2;
        let operand = match u16::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => {
                self.error("Loop body too large.");
                u16::MAX
            }
        };
        let [hi, lo] = operand.to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    // ---- Scopes and variables ----

    fn begin_scope(&mut self) {
        self.current_function().begin_scope();
    }

    fn end_scope(&mut self) {
        for captured in self.current_function().end_scope() {
            self.emit_op(if captured {
                OpCode::CloseUpvalue
            } else {
                OpCode::Pop
            });
        }
    }

    /// Record a local for the identifier just consumed. Globals are late-bound
    /// and need no declaration.
    fn declare_variable(&mut self) {
        if self.functions.current().scope_depth == 0 {
            return;
        }
        let name = self.parser.previous.lexeme;
        if let Err(err) = self.current_function().declare_local(name) {
            self.error(err);
        }
    }

    /// Consume a variable name. Returns its name constant for globals, 0 for locals.
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.functions.current().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.parser.previous.lexeme)
    }

    fn mark_initialized(&mut self) {
        self.current_function().mark_initialized();
    }

    fn define_variable(&mut self, global: u8) {
        if self.functions.current().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_byte(OpCode::DefineGlobal, global);
    }

    // ---- Declarations ----

    fn declaration(&mut self) {
        if self.matches(TokenKind::Class) {
            self.class_declaration();
        } else if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let name_constant = self.identifier_constant(self.parser.previous.lexeme);
        self.declare_variable();

        self.emit_op_byte(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        // The body may refer to the function itself.
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");

        self.define_variable(global);
    }

    // ---- Functions ----

    /// Compile a parameter list and body into a new function, then emit the
    /// closure that creates it at runtime.
    fn function(&mut self, kind: FunctionKind) {
        let function = self
            .heap
            .alloc_function(&SessionRoots::new(self.host, &self.functions));
        self.functions.push(FunctionState::new(function, kind));
        // Interned after the push so the new function is rooted.
        let name = self.heap.intern(
            self.parser.previous.lexeme,
            &SessionRoots::new(self.host, &self.functions),
        );
        self.heap.function_mut(function).name = Some(name);

        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                self.current_function().arity += 1;
                if self.functions.current().arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let Some((function, upvalues)) = self.end_function() else {
            return;
        };
        let constant = self.make_constant(Value::Function(function));
        self.emit_op_byte(OpCode::Closure, constant);
        for upvalue in upvalues {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    /// Close the current nested function and return to its parent. The
    /// script has no parent and is closed by `finish` instead.
    fn end_function(&mut self) -> Option<(FnRef, Vec<Upvalue>)> {
        self.emit_return();
        let state = self.functions.pop()?;
        let (function, upvalues) = store_function(self.heap, state);
        self.functions_compiled += 1;
        let name = Value::Function(function).display(self.heap);
        tracing::trace!(%name, upvalues = upvalues.len(), "function compiled");
        Some((function, upvalues))
    }

    // ---- Statements ----

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::Del) {
            self.del_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    /// `del target.property;`
    fn del_statement(&mut self) {
        self.consume(TokenKind::Identifier, "Expect variable name after 'del'.");
        let target = self.parser.previous.lexeme;
        self.named_variable(target, false);
        self.consume(TokenKind::Dot, "Expect '.' after variable name.");
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.parser.previous.lexeme);
        self.emit_op_byte(OpCode::DelProperty, name);
        self.consume(TokenKind::Semicolon, "Expect ';' after property.");
    }

    fn return_statement(&mut self) {
        if self.functions.current().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }

        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.code_len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // No initializer.
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.code_len();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            // The increment runs after the body: jump over it now, loop back to it later.
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.code_len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }
}

/// The host's roots plus every function still being compiled.
struct SessionRoots<'a, 'src> {
    host: &'a dyn GcRoots,
    functions: &'a FunctionStack<'src>,
}

impl<'a, 'src> SessionRoots<'a, 'src> {
    fn new(host: &'a dyn GcRoots, functions: &'a FunctionStack<'src>) -> Self {
        SessionRoots { host, functions }
    }
}

impl GcRoots for SessionRoots<'_, '_> {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
        self.host.visit_roots(visit);
        self.functions.visit_roots(visit);
    }
}

/// Move a finished function's chunk and counts into its heap object.
fn store_function(heap: &mut Heap, state: FunctionState<'_>) -> (FnRef, Vec<Upvalue>) {
    let upvalues = state.upvalues.to_vec();
    let object = heap.function_mut(state.function);
    object.arity = state.arity;
    object.upvalue_count = upvalues.len();
    object.chunk = state.chunk;
    (state.function, upvalues)
}
