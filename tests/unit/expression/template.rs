use super::*;

fn srcs(text: &str) -> Vec<String> {
    tokenize_literal(text, 0)
        .unwrap()
        .into_iter()
        .map(|t| t.src)
        .collect()
}

#[test]
fn constant_text_is_one_literal() {
    assert_eq!(srcs("hello"), vec!["\"hello\""]);
    assert_eq!(srcs(""), vec!["\"\""]);
    assert!(!is_template("hello"));
}

#[test]
fn mixed_parts_are_concatenated_and_wrapped() {
    assert_eq!(
        srcs("Hi $name!"),
        vec!["(", "\"Hi \"", "..", "$name", "..", "\"!\"", ")"]
    );
    assert!(is_template("Hi $name!"));
}

#[test]
fn single_variable_gets_an_empty_leading_literal() {
    assert_eq!(srcs("$x"), vec!["(", "\"\"", "..", "$x", ")"]);
}

#[test]
fn single_interpolation_stays_unwrapped() {
    let tokens = tokenize_literal("{{ a ? 1 : 2 }}", 10).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Expr);
    assert_eq!(tokens[0].src, " a ? 1 : 2 ");
    assert_eq!(tokens[0].offset, 12);
}

#[test]
fn interpolation_skips_quoted_braces_and_nests() {
    let tokens = tokenize_literal("{{ a ? \"}}\" : \"{{ b }}\" }}!", 0).unwrap();
    let expr = tokens.iter().find(|t| t.kind == TokenKind::Expr).unwrap();
    assert_eq!(expr.src, " a ? \"}}\" : \"{{ b }}\" ");
}

#[test]
fn lone_sigils_stay_literal() {
    assert_eq!(srcs("costs $ 5"), vec!["\"costs $ 5\""]);
}

#[test]
fn escapes() {
    assert_eq!(srcs(r"\$x \{{y}}"), vec!["\"$x {{y}}\""]);
    assert_eq!(srcs(r#"say \"hi\""#), vec![r#""say \"hi\"""#]);
    assert_eq!(unquote(&srcs(r"a\nb")[0]), "a\nb");
}

#[test]
fn malformed_input() {
    let err = tokenize_literal("abc\\", 5).unwrap_err();
    assert!(matches!(err, SpecbindError::Syntax { offset: 8, .. }));
    assert!(tokenize_literal("x {{ y", 0).unwrap_err().is_syntax());
}

#[test]
fn quote_round_trips() {
    for text in ["", "plain", "with \"quotes\"", r"back\slash", "tab\tnewline\n"] {
        assert_eq!(unquote(&quote(text)), text);
    }
}
