//! Single-pass parser over the flat token list.
//!
//! Operands go on one stack and pending operators on another. An infix
//! operator first folds every pending operator that binds at least as
//! tightly (prefix operators always do), so the tree comes out
//! precedence-correct in one left-to-right scan with no recursion per token.
//! Parentheses and `{{ }}` interpolations become [`UnaryOp::Group`] nodes.
//!
//! A `?` is folded only once its right-hand side is complete, which must then
//! be a `:` node.

use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::lexer::{Token, TokenKind, tokenize, tokenize_at};
use crate::expression::template::tokenize_literal;
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::MAX_DEPTH;

/// Parse expression source such as `$a + $$b * 2` or `a ? "$x" : y`.
#[tracing::instrument(level = "trace")]
pub fn parse_expression(src: &str) -> SpecbindResult<Expr> {
    parse(&tokenize(src)?)
}

/// Parse template text such as `Hello $name` or `{{ n > 1 ? "s" : "" }}`.
#[tracing::instrument(level = "trace")]
pub fn parse_template(src: &str) -> SpecbindResult<Expr> {
    parse(&tokenize_literal(src, 0)?)
}

/// Build the expression tree for `tokens`.
pub fn parse(tokens: &[Token]) -> SpecbindResult<Expr> {
    parse_at(tokens, 0, 0)
}

fn parse_at(tokens: &[Token], offset: usize, nesting: usize) -> SpecbindResult<Expr> {
    if nesting > MAX_DEPTH {
        return Err(SpecbindError::syntax(
            offset,
            format!("interpolations nested deeper than {MAX_DEPTH}"),
        ));
    }
    let mut parser = Parser {
        nesting,
        operands: Vec::new(),
        frames: Vec::new(),
        expect_operand: true,
    };
    for token in tokens {
        parser.step(token)?;
    }
    parser.finish(offset)
}

/// A pending operator or open parenthesis.
enum Frame<'t> {
    Open(&'t Token),
    Prefix(UnaryOp, &'t Token),
    Infix(BinaryOp, &'t Token),
}

struct Parser<'t> {
    nesting: usize,
    operands: Vec<Expr>,
    frames: Vec<Frame<'t>>,
    expect_operand: bool,
}

impl<'t> Parser<'t> {
    fn step(&mut self, token: &'t Token) -> SpecbindResult<()> {
        match token.kind {
            TokenKind::Space => Ok(()),
            TokenKind::LPar => {
                self.operand_slot(token)?;
                self.frames.push(Frame::Open(token));
                Ok(())
            }
            TokenKind::RPar => self.close(token),
            TokenKind::Expr => {
                self.operand_slot(token)?;
                let inner = parse_at(
                    &tokenize_at(&token.src, token.offset)?,
                    token.offset,
                    self.nesting + 1,
                )?;
                self.push_operand(Expr::unary(UnaryOp::Group, inner));
                Ok(())
            }
            TokenKind::Var | TokenKind::Prop | TokenKind::Lit => {
                self.operand_slot(token)?;
                self.push_operand(Expr::leaf(token)?);
                Ok(())
            }
            TokenKind::Una => {
                self.operand_slot(token)?;
                self.frames
                    .push(Frame::Prefix(UnaryOp::from_token(token)?, token));
                Ok(())
            }
            TokenKind::AddSub if self.expect_operand => {
                self.frames
                    .push(Frame::Prefix(UnaryOp::from_token(token)?, token));
                Ok(())
            }
            TokenKind::AddSub
            | TokenKind::Comp
            | TokenKind::MulDiv
            | TokenKind::Tern
            | TokenKind::Colon
            | TokenKind::Concat => self.infix(token),
        }
    }

    /// An operand may start here only when no complete operand is pending.
    fn operand_slot(&self, token: &Token) -> SpecbindResult<()> {
        match self.operands.last() {
            Some(last) if !self.expect_operand => Err(SpecbindError::syntax(
                token.offset,
                format!("unexpected \"{}\" after {last}", token.src),
            )),
            _ => Ok(()),
        }
    }

    fn push_operand(&mut self, expr: Expr) {
        self.operands.push(expr);
        self.expect_operand = false;
    }

    fn infix(&mut self, token: &'t Token) -> SpecbindResult<()> {
        if self.expect_operand {
            return Err(SpecbindError::syntax(
                token.offset,
                format!("\"{}\" is missing its left operand", token.src),
            ));
        }
        let op = BinaryOp::from_token(token)?;
        while let Some(frame) = self.frames.last() {
            let folds = match frame {
                Frame::Prefix(..) => true,
                Frame::Infix(pending, _) => binds_before(*pending, op),
                Frame::Open(_) => false,
            };
            if !folds {
                break;
            }
            self.fold()?;
        }
        self.frames.push(Frame::Infix(op, token));
        self.expect_operand = true;
        Ok(())
    }

    fn close(&mut self, token: &Token) -> SpecbindResult<()> {
        if !self.frames.iter().any(|f| matches!(f, Frame::Open(_))) {
            return Err(SpecbindError::syntax(token.offset, "unexpected \")\""));
        }
        if self.expect_operand {
            return Err(self.missing_operand());
        }
        while !matches!(self.frames.last(), Some(Frame::Open(_))) {
            self.fold()?;
        }
        self.frames.pop();
        let inner = self.pop_operand()?;
        self.push_operand(Expr::unary(UnaryOp::Group, inner));
        Ok(())
    }

    fn finish(mut self, offset: usize) -> SpecbindResult<Expr> {
        if let Some(open) = self.frames.iter().find_map(|f| match f {
            Frame::Open(open) => Some(open),
            _ => None,
        }) {
            return Err(SpecbindError::syntax(open.offset, "unbalanced parentheses"));
        }
        if self.expect_operand {
            return Err(match self.frames.last() {
                Some(_) => self.missing_operand(),
                None => SpecbindError::syntax(offset, "empty expression"),
            });
        }
        while !self.frames.is_empty() {
            self.fold()?;
        }
        self.pop_operand()
    }

    /// The error for an operand slot left empty by the innermost pending frame.
    fn missing_operand(&self) -> SpecbindError {
        match self.frames.last() {
            Some(Frame::Open(open)) => SpecbindError::syntax(open.offset, "empty parentheses"),
            Some(Frame::Prefix(_, token) | Frame::Infix(_, token)) => SpecbindError::syntax(
                token.offset,
                format!("\"{}\" is missing its right operand", token.src),
            ),
            None => SpecbindError::syntax(0, "empty expression"),
        }
    }

    fn pop_operand(&mut self) -> SpecbindResult<Expr> {
        self.operands
            .pop()
            .ok_or_else(|| SpecbindError::syntax(0, "empty expression"))
    }

    /// Apply the innermost pending operator to the operands it covers.
    fn fold(&mut self) -> SpecbindResult<()> {
        let expr = match self.frames.pop() {
            Some(Frame::Prefix(op, _)) => Expr::unary(op, self.pop_operand()?),
            Some(Frame::Infix(op, token)) => {
                let rhs = self.pop_operand()?;
                let lhs = self.pop_operand()?;
                if op == BinaryOp::Tern
                    && !matches!(
                        rhs,
                        Expr::Binary {
                            op: BinaryOp::Colon,
                            ..
                        }
                    )
                {
                    return Err(SpecbindError::syntax(
                        token.offset,
                        "\"?\" is missing its \":\" branch",
                    ));
                }
                Expr::binary(op, lhs, rhs)
            }
            Some(Frame::Open(open)) => {
                return Err(SpecbindError::syntax(open.offset, "unbalanced parentheses"));
            }
            None => return Ok(()),
        };
        self.operands.push(expr);
        Ok(())
    }
}

/// Whether a pending `pending` operator is applied before a following `next`:
/// it binds tighter, or equally with left associativity.
fn binds_before(pending: BinaryOp, next: BinaryOp) -> bool {
    next.precedence() < pending.precedence()
        || (next.precedence() == pending.precedence() && !pending.is_right_assoc())
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
