use crate::expression::template::tokenize_literal;
use crate::foundation::error::{SpecbindError, SpecbindResult};

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Whitespace run. Skipped by the parser.
    Space,
    /// `$name`, `$$name`, `$` or a bare identifier.
    Var,
    /// `@name`: member of the originating spec row.
    Prop,
    /// Number, re-quoted string, or `true` / `false` / `null`.
    Lit,
    /// `+` or `-`, binary or unary depending on position.
    AddSub,
    /// `== != >= <= && || > <`.
    Comp,
    /// `* / %`.
    MulDiv,
    /// `!`.
    Una,
    /// `(`.
    LPar,
    /// `)`.
    RPar,
    /// `?`.
    Tern,
    /// `:`.
    Colon,
    /// `..`.
    Concat,
    /// Source of a `{{ ... }}` interpolation, tokenized when parsed.
    Expr,
}

/// One lexeme with the byte offset it starts at in the outermost source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Matched text. For [`TokenKind::Expr`] this is the interpolation body.
    pub src: String,
    /// Byte offset into the source passed to [`tokenize`].
    pub offset: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, src: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            src: src.into(),
            offset,
        }
    }
}

type Rule = (TokenKind, fn(&str) -> usize);

/// Ordered rule table. The longest match wins; ties go to the earlier rule.
const RULES: [Rule; 13] = [
    (TokenKind::Space, match_space),
    (TokenKind::Var, match_var),
    (TokenKind::Prop, match_prop),
    (TokenKind::Lit, match_lit),
    (TokenKind::AddSub, match_addsub),
    (TokenKind::Comp, match_comp),
    (TokenKind::MulDiv, match_muldiv),
    (TokenKind::Una, match_una),
    (TokenKind::LPar, match_lpar),
    (TokenKind::RPar, match_rpar),
    (TokenKind::Tern, match_tern),
    (TokenKind::Colon, match_colon),
    (TokenKind::Concat, match_concat),
];

const KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// Tokenize expression source.
///
/// Quoted strings are not emitted as one token: their contents go through
/// [`tokenize_literal`] so `$var` and `{{ expr }}` inside them become live
/// references.
pub fn tokenize(code: &str) -> SpecbindResult<Vec<Token>> {
    tokenize_at(code, 0)
}

/// [`tokenize`] for a fragment starting at byte `offset` of a larger source.
pub(crate) fn tokenize_at(code: &str, offset: usize) -> SpecbindResult<Vec<Token>> {
    let mut out = Vec::new();
    let mut pos = 0usize;

    while pos < code.len() {
        let rest = &code[pos..];
        let (kind, len) = RULES
            .iter()
            .fold((None, 0), |best, &(kind, rule)| match rule(rest) {
                n if n > best.1 => (Some(kind), n),
                _ => best,
            });
        let Some(kind) = kind else {
            let snippet: String = rest.chars().take(20).collect();
            return Err(SpecbindError::syntax(
                offset + pos,
                format!("unexpected input \"{snippet}\""),
            ));
        };

        let src = &rest[..len];
        if kind == TokenKind::Lit && is_quote(src.as_bytes()[0]) {
            out.extend(tokenize_literal(&src[1..len - 1], offset + pos + 1)?);
        } else {
            out.push(Token::new(kind, src, offset + pos));
        }
        pos += len;
    }

    Ok(out)
}

pub(crate) fn is_quote(b: u8) -> bool {
    matches!(b, b'"' | b'\'' | b'`')
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn match_space(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(s.len(), |(i, _)| i)
}

fn ident_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
            bytes.iter().take_while(|b| is_ident_byte(**b)).count()
        }
        _ => 0,
    }
}

fn match_var(s: &str) -> usize {
    let sigils = s.bytes().take_while(|b| *b == b'$').count();
    if sigils > 0 {
        return sigils + s[sigils..].bytes().take_while(|b| is_ident_byte(*b)).count();
    }
    let len = ident_len(s);
    if KEYWORDS.contains(&&s[..len]) { 0 } else { len }
}

fn match_prop(s: &str) -> usize {
    match s.strip_prefix('@') {
        Some(rest) => match rest.bytes().take_while(|b| is_ident_byte(*b)).count() {
            0 => 0,
            n => n + 1,
        },
        None => 0,
    }
}

fn match_lit(s: &str) -> usize {
    let len = ident_len(s);
    if len > 0 {
        return if KEYWORDS.contains(&&s[..len]) { len } else { 0 };
    }
    match s.as_bytes().first() {
        Some(b) if b.is_ascii_digit() => match_number(s.as_bytes()),
        Some(b) if is_quote(*b) => quoted_len(s.as_bytes()),
        _ => 0,
    }
}

/// `\d+(\.\d+)?([eE][+-]?\d+)?`
fn match_number(bytes: &[u8]) -> usize {
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut i = digits(0);
    if bytes.get(i) == Some(&b'.') {
        let frac = digits(i + 1);
        if frac > 0 {
            i += 1 + frac;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp = digits(j);
        if exp > 0 {
            i = j + exp;
        }
    }
    i
}

/// Length of the quoted string at the start of `bytes`, closing quote
/// included, or 0 when it is not terminated.
pub(crate) fn quoted_len(bytes: &[u8]) -> usize {
    let quote = bytes[0];
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    0
}

fn match_addsub(s: &str) -> usize {
    usize::from(s.starts_with(['+', '-']))
}

fn match_comp(s: &str) -> usize {
    if ["==", "!=", ">=", "<=", "&&", "||"]
        .iter()
        .any(|op| s.starts_with(op))
    {
        2
    } else {
        usize::from(s.starts_with(['>', '<']))
    }
}

fn match_muldiv(s: &str) -> usize {
    usize::from(s.starts_with(['*', '/', '%']))
}

fn match_una(s: &str) -> usize {
    usize::from(s.starts_with('!'))
}

fn match_lpar(s: &str) -> usize {
    usize::from(s.starts_with('('))
}

fn match_rpar(s: &str) -> usize {
    usize::from(s.starts_with(')'))
}

fn match_tern(s: &str) -> usize {
    usize::from(s.starts_with('?'))
}

fn match_colon(s: &str) -> usize {
    usize::from(s.starts_with(':'))
}

fn match_concat(s: &str) -> usize {
    if s.starts_with("..") { 2 } else { 0 }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/lexer.rs"]
mod tests;
