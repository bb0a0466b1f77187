/// Precedence-climbing expression compilation.
///
/// Every token kind maps to a [`ParseRule`]: an optional prefix handler, an
/// optional infix handler, and the binding power of the token when it
/// appears in infix position.
use super::{Compiler, SessionRoots};
use crate::token::TokenKind;
use loxide_core::opcode::OpCode;
use loxide_core::value::Value;

/// Binding power, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// The next-stronger level, used for left-associative right operands.
    pub fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

/// A prefix or infix parse handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseFn {
    Grouping,
    Call,
    Dot,
    Unary,
    Binary,
    Variable,
    String,
    Number,
    Literal,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

impl ParseRule {
    const fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }
}

/// Parse rule for a token kind.
pub fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn as F;
    use TokenKind as T;
    match kind {
        T::LeftParen => ParseRule::new(Some(F::Grouping), Some(F::Call), Precedence::Call),
        T::Dot => ParseRule::new(None, Some(F::Dot), Precedence::Call),
        T::Minus => ParseRule::new(Some(F::Unary), Some(F::Binary), Precedence::Term),
        T::Plus => ParseRule::new(None, Some(F::Binary), Precedence::Term),
        T::Slash | T::Star => ParseRule::new(None, Some(F::Binary), Precedence::Factor),
        T::Bang => ParseRule::new(Some(F::Unary), None, Precedence::None),
        T::BangEqual | T::EqualEqual => ParseRule::new(None, Some(F::Binary), Precedence::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            ParseRule::new(None, Some(F::Binary), Precedence::Comparison)
        }
        T::Identifier => ParseRule::new(Some(F::Variable), None, Precedence::None),
        T::String => ParseRule::new(Some(F::String), None, Precedence::None),
        T::Number => ParseRule::new(Some(F::Number), None, Precedence::None),
        T::And => ParseRule::new(None, Some(F::And), Precedence::And),
        T::Or => ParseRule::new(None, Some(F::Or), Precedence::Or),
        T::False | T::Nil | T::True => ParseRule::new(Some(F::Literal), None, Precedence::None),
        _ => ParseRule::new(None, None, Precedence::None),
    }
}

impl<'src> Compiler<'src, '_> {
    pub(super) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// Compile an expression whose operators bind at least as tightly as `precedence`.
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.parser.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        self.apply(prefix, can_assign);

        while precedence <= rule(self.parser.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.parser.previous.kind).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, handler: ParseFn, can_assign: bool) {
        match handler {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Call => self.call(),
            ParseFn::Dot => self.dot(can_assign),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::String => self.string(),
            ParseFn::Number => self.number(),
            ParseFn::Literal => self.literal(),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
        }
    }

    // ---- Prefix handlers ----

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        match self.parser.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let lexeme = self.parser.previous.lexeme;
        // Strip the surrounding quotes.
        let contents = &lexeme[1..lexeme.len() - 1];
        let s = self
            .heap
            .intern(contents, &SessionRoots::new(self.host, &self.functions));
        self.emit_constant(Value::Str(s));
    }

    fn literal(&mut self) {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => {}
        }
    }

    fn unary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.parser.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    /// Emit a read of `name`, or a write when followed by `=` in an
    /// assignable position. Locals win over upvalues, upvalues over globals.
    pub(super) fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let (get, set, arg) = match self.functions.current().resolve_local(name) {
            Ok(Some(slot)) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            Err(err) => {
                self.error(err);
                (OpCode::GetLocal, OpCode::SetLocal, 0)
            }
            Ok(None) => {
                let level = self.functions.level();
                match self.functions.resolve_upvalue(level, name) {
                    Ok(Some(index)) => (OpCode::GetUpvalue, OpCode::SetUpvalue, index),
                    Err(err) => {
                        self.error(err);
                        (OpCode::GetUpvalue, OpCode::SetUpvalue, 0)
                    }
                    Ok(None) => {
                        let constant = self.identifier_constant(name);
                        (OpCode::GetGlobal, OpCode::SetGlobal, constant)
                    }
                }
            }
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_byte(set, arg);
        } else {
            self.emit_op_byte(get, arg);
        }
    }

    // ---- Infix handlers ----

    fn binary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());

        match operator {
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => {}
        }
    }

    fn call(&mut self) {
        let arg_count = self.argument_list();
        self.emit_op_byte(OpCode::Call, arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: usize = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count.min(255) as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.parser.previous.lexeme);

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_byte(OpCode::SetProperty, name);
        } else {
            self.emit_op_byte(OpCode::GetProperty, name);
        }
    }

    /// Short-circuit `and`: skip the right operand when the left is falsey.
    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    /// Short-circuit `or`: skip the right operand when the left is truthy.
    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }
}
