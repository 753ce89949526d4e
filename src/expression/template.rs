//! Literal sub-tokenizer: splits template text into constant runs, `$var`
//! references and `{{ expr }}` interpolations, and emits tokens that parse
//! as a single concatenation.

use crate::expression::lexer::{Token, TokenKind, is_ident_byte, is_quote, quoted_len};
use crate::foundation::error::{SpecbindError, SpecbindResult};

#[derive(Debug, PartialEq, Eq)]
enum Part {
    Text { text: String, offset: usize },
    Var { src: String, offset: usize },
    Expr { src: String, offset: usize },
}

/// Tokenize template text (the contents of a quoted literal, or a whole
/// template string). `offset` is where `text` starts in the outer source.
///
/// Parts are joined by `..` and the result is parenthesized when there is more
/// than one part. A template that is a single `$var` gets a leading `""` part
/// so it still evaluates as text; a single `{{ expr }}` keeps its own type.
pub fn tokenize_literal(text: &str, offset: usize) -> SpecbindResult<Vec<Token>> {
    let mut parts = split(text, offset)?;
    if let [Part::Var { offset, .. }] = parts.as_slice() {
        let offset = *offset;
        parts.insert(
            0,
            Part::Text {
                text: String::new(),
                offset,
            },
        );
    }
    if parts.is_empty() {
        return Ok(vec![Token::new(TokenKind::Lit, quote(""), offset)]);
    }

    let wrap = parts.len() > 1;
    let mut out = Vec::with_capacity(parts.len() * 2 + 2);
    if wrap {
        out.push(Token::new(TokenKind::LPar, "(", offset));
    }
    for (i, part) in parts.into_iter().enumerate() {
        let token = match part {
            Part::Text { text, offset } => Token::new(TokenKind::Lit, quote(&text), offset),
            Part::Var { src, offset } => Token::new(TokenKind::Var, src, offset),
            Part::Expr { src, offset } => Token::new(TokenKind::Expr, src, offset),
        };
        if i > 0 {
            out.push(Token::new(TokenKind::Concat, "..", token.offset));
        }
        out.push(token);
    }
    if wrap {
        out.push(Token::new(TokenKind::RPar, ")", offset + text.len()));
    }
    Ok(out)
}

/// Whether `text` contains anything [`tokenize_literal`] would treat as live.
pub fn is_template(text: &str) -> bool {
    text.contains('$') || text.contains("{{")
}

fn split(text: &str, offset: usize) -> SpecbindResult<Vec<Part>> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut buf_start = 0usize;
    let mut i = 0usize;

    let flush = |parts: &mut Vec<Part>, buf: &mut String, start: usize| {
        if !buf.is_empty() {
            parts.push(Part::Text {
                text: std::mem::take(buf),
                offset: offset + start,
            });
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let Some(c) = text[i + 1..].chars().next() else {
                    return Err(SpecbindError::syntax(offset + i, "malformed escape"));
                };
                if buf.is_empty() {
                    buf_start = i;
                }
                buf.push(match c {
                    'n' => '\n',
                    't' => '\t',
                    c => c,
                });
                i += 1 + c.len_utf8();
            }
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                let end = closing_braces(bytes, i + 2)
                    .ok_or_else(|| SpecbindError::syntax(offset + i, "unterminated \"{{\""))?;
                flush(&mut parts, &mut buf, buf_start);
                parts.push(Part::Expr {
                    src: text[i + 2..end].to_owned(),
                    offset: offset + i + 2,
                });
                i = end + 2;
            }
            b'$' => {
                let sigils = bytes[i..].iter().take_while(|b| **b == b'$').count();
                let name = bytes[i + sigils..]
                    .iter()
                    .take_while(|b| is_ident_byte(**b))
                    .count();
                if buf.is_empty() {
                    buf_start = i;
                }
                if name == 0 {
                    buf.push_str(&text[i..i + sigils]);
                } else {
                    flush(&mut parts, &mut buf, buf_start);
                    parts.push(Part::Var {
                        src: text[i..i + sigils + name].to_owned(),
                        offset: offset + i,
                    });
                }
                i += sigils + name;
            }
            _ => {
                let Some(c) = text[i..].chars().next() else {
                    break;
                };
                if buf.is_empty() {
                    buf_start = i;
                }
                buf.push(c);
                i += c.len_utf8();
            }
        }
    }
    flush(&mut parts, &mut buf, buf_start);
    Ok(parts)
}

/// Index of the `}}` closing an interpolation whose body starts at `from`.
/// Quoted strings are skipped and nested `{{ }}` pairs are balanced.
fn closing_braces(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b if is_quote(b) => match quoted_len(&bytes[i..]) {
                0 => return None,
                n => i += n,
            },
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
                i += 2;
            }
            _ => i += 1,
        }
    }
    None
}

/// Re-quote constant text so the literal parser reads it back unchanged.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Inverse of [`quote`] for any quote character the lexer accepts.
pub(crate) fn unquote(src: &str) -> String {
    let inner = src.get(1..src.len().saturating_sub(1)).unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(c) => out.push(c),
            None => {}
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/expression/template.rs"]
mod tests;
