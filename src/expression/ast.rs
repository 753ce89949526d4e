use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::expression::lexer::{Token, TokenKind};
use crate::expression::template::unquote;
use crate::foundation::error::{SpecbindError, SpecbindResult};
use crate::foundation::value::{MAX_DEPTH, Value, format_number};

/// Names an expression depends on, as accepted by
/// [`Binding::resolve`](crate::Binding::resolve).
pub type FieldSet = BTreeSet<String>;

/// Member consulted for the enclosing scope when the data object has no
/// binding parent.
pub const PARENT_KEY: &str = "parent";

/// Parsed expression tree. Nodes own their children; trees are immutable once
/// parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant number, string, boolean or null.
    Literal(Value),
    /// Scope reference as written, sigils included (`$name`, `$$name`, `name`, `$`).
    Variable(String),
    /// `@name` member of the spec row, stored without the `@`.
    Property(String),
    /// Prefix operator or grouping.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Infix operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand. For `?` this is always a `:` node.
        rhs: Box<Expr>,
    },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Parentheses: evaluates to the operand.
    Group,
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Pos,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `?`
    Tern,
    /// `:`
    Colon,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `..`
    Concat,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl UnaryOp {
    pub(crate) fn from_token(token: &Token) -> SpecbindResult<Self> {
        match token.src.as_str() {
            "(" => Ok(Self::Group),
            "!" => Ok(Self::Not),
            "-" => Ok(Self::Neg),
            "+" => Ok(Self::Pos),
            other => Err(SpecbindError::syntax(
                token.offset,
                format!("\"{other}\" is not a prefix operator"),
            )),
        }
    }

    fn apply(self, v: Value) -> Value {
        match self {
            Self::Group => v,
            Self::Not => Value::Bool(!v.is_truthy()),
            Self::Neg => Value::Number(-v.to_number()),
            Self::Pos => Value::Number(v.to_number()),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Group => "",
            Self::Not => "!",
            Self::Neg => "-",
            Self::Pos => "+",
        }
    }
}

impl BinaryOp {
    pub(crate) fn from_token(token: &Token) -> SpecbindResult<Self> {
        Ok(match token.src.as_str() {
            "?" => Self::Tern,
            ":" => Self::Colon,
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "+" => Self::Add,
            "-" => Self::Sub,
            ".." => Self::Concat,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            other => {
                return Err(SpecbindError::syntax(
                    token.offset,
                    format!("\"{other}\" is not an infix operator"),
                ));
            }
        })
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Tern | Self::Colon => 1,
            Self::Or => 2,
            Self::And => 3,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Ge | Self::Le => 4,
            Self::Add | Self::Sub => 5,
            Self::Concat => 6,
            Self::Mul | Self::Div | Self::Rem => 7,
        }
    }

    /// `?` and `:` group to the right; everything else to the left.
    pub fn is_right_assoc(self) -> bool {
        matches!(self, Self::Tern | Self::Colon)
    }

    /// Source text of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Tern => "?",
            Self::Colon => ":",
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Concat => "..",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// Strict operators over already evaluated operands.
    fn apply(self, a: &Value, b: &Value) -> SpecbindResult<Value> {
        Ok(match self {
            Self::Eq => Value::Bool(a.loose_eq(b)),
            Self::Ne => Value::Bool(!a.loose_eq(b)),
            Self::Gt => Value::Bool(compare(a, b) == Some(Ordering::Greater)),
            Self::Lt => Value::Bool(compare(a, b) == Some(Ordering::Less)),
            Self::Ge => Value::Bool(matches!(
                compare(a, b),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            Self::Le => Value::Bool(matches!(
                compare(a, b),
                Some(Ordering::Less | Ordering::Equal)
            )),
            Self::Add => match (a, b) {
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Value::Str(a.to_text() + &b.to_text())
                }
                _ => Value::Number(a.to_number() + b.to_number()),
            },
            Self::Sub => Value::Number(a.to_number() - b.to_number()),
            Self::Mul => Value::Number(a.to_number() * b.to_number()),
            Self::Div => Value::Number(a.to_number() / b.to_number()),
            Self::Rem => Value::Number(a.to_number() % b.to_number()),
            Self::Concat => Value::Str(a.to_text() + &b.to_text()),
            Self::Tern | Self::Colon | Self::And | Self::Or => {
                return Err(SpecbindError::evaluation(format!(
                    "\"{}\" cannot be applied eagerly",
                    self.symbol()
                )));
            }
        })
    }
}

/// Strings compare lexically with each other; everything else numerically.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

impl Expr {
    /// Leaf node for a `Var`, `Prop` or `Lit` token.
    pub(crate) fn leaf(token: &Token) -> SpecbindResult<Self> {
        match token.kind {
            TokenKind::Var => Ok(Self::Variable(token.src.clone())),
            TokenKind::Prop => Ok(Self::Property(
                token.src.trim_start_matches('@').to_owned(),
            )),
            TokenKind::Lit => Self::literal(token),
            _ => Err(SpecbindError::syntax(
                token.offset,
                format!("\"{}\" is not an operand", token.src),
            )),
        }
    }

    fn literal(token: &Token) -> SpecbindResult<Self> {
        let src = token.src.as_str();
        let value = match src {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            s if s.starts_with(['"', '\'', '`']) => Value::Str(unquote(s)),
            s => Value::Number(s.parse().map_err(|_| {
                SpecbindError::syntax(token.offset, format!("invalid number \"{s}\""))
            })?),
        };
        Ok(Self::Literal(value))
    }

    pub(crate) fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub(crate) fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate against `data` (the scope object variables resolve in) and
    /// `this` (the spec row `@` properties resolve in).
    pub fn exec(&self, data: &Value, this: &Value) -> SpecbindResult<Value> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Variable(src) => resolve_variable(src, data),
            Self::Property(name) => Ok(member(this, name)),
            Self::Unary { op, operand } => Ok(op.apply(operand.exec(data, this)?)),
            Self::Binary { op, lhs, rhs } => match op {
                BinaryOp::Tern => {
                    let Self::Binary {
                        op: BinaryOp::Colon,
                        lhs: then,
                        rhs: otherwise,
                    } = rhs.as_ref()
                    else {
                        return Err(SpecbindError::evaluation("\"?\" without a \":\" branch"));
                    };
                    if lhs.exec(data, this)?.is_truthy() {
                        then.exec(data, this)
                    } else {
                        otherwise.exec(data, this)
                    }
                }
                BinaryOp::Colon => Err(SpecbindError::evaluation("\":\" outside a ternary")),
                BinaryOp::And => {
                    let a = lhs.exec(data, this)?;
                    if a.is_truthy() { rhs.exec(data, this) } else { Ok(a) }
                }
                BinaryOp::Or => {
                    let a = lhs.exec(data, this)?;
                    if a.is_truthy() { Ok(a) } else { rhs.exec(data, this) }
                }
                op => op.apply(&lhs.exec(data, this)?, &rhs.exec(data, this)?),
            },
        }
    }

    /// The names this expression reads from its scope, in the form
    /// [`Binding::resolve`](crate::Binding::resolve) accepts: one leading `$`
    /// is dropped, so `$$name` stays `$name` and resolves in the parent.
    /// `@` properties and bare-sigil scope references are not fields.
    ///
    /// The remaining sigils are kept so each name routes to its owning scope;
    /// use `trim_start_matches('$')` for the bare member name.
    pub fn fields(&self) -> FieldSet {
        let mut out = FieldSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut FieldSet) {
        match self {
            Self::Literal(_) | Self::Property(_) => {}
            Self::Variable(src) => {
                if !src.trim_start_matches('$').is_empty() {
                    out.insert(src.strip_prefix('$').unwrap_or(src).to_owned());
                }
            }
            Self::Unary { operand, .. } => operand.collect_fields(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
        }
    }
}

fn resolve_variable(src: &str, data: &Value) -> SpecbindResult<Value> {
    let name = src.trim_start_matches('$');
    let depth = src.len() - name.len();
    if depth == 0 {
        return Ok(member(data, name));
    }
    if depth > MAX_DEPTH {
        return Err(SpecbindError::recursion(format!(
            "\"{src}\" is deeper than {MAX_DEPTH} scopes"
        )));
    }

    let mut scope = data.clone();
    for _ in 1..depth {
        scope = parent_scope(&scope).ok_or_else(|| {
            SpecbindError::evaluation(format!("no enclosing scope for \"{src}\""))
        })?;
    }
    if name.is_empty() {
        Ok(scope)
    } else {
        Ok(member(&scope, name))
    }
}

/// The binding parent when one is wired, else the `parent` member.
fn parent_scope(scope: &Value) -> Option<Value> {
    let object = scope.as_object()?;
    if let Some(parent) = object.binding().and_then(|b| b.parent()) {
        return Some(Value::Object(parent.object().clone()));
    }
    match object.get(PARENT_KEY) {
        v @ Value::Object(_) => Some(v),
        _ => None,
    }
}

fn member(scope: &Value, name: &str) -> Value {
    scope.as_object().map(|o| o.get(name)).unwrap_or_default()
}

impl fmt::Display for Expr {
    /// Fully parenthesized form, used for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::Str(s)) => write!(f, "{s:?}"),
            Self::Literal(Value::Number(n)) => f.write_str(&format_number(*n)),
            Self::Literal(Value::Null) => f.write_str("null"),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Variable(src) => f.write_str(src),
            Self::Property(name) => write!(f, "@{name}"),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.symbol()),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/ast.rs"]
mod tests;
