use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
}

fn srcs(src: &str) -> Vec<String> {
    tokenize(src)
        .unwrap()
        .into_iter()
        .filter(|t| t.kind != TokenKind::Space)
        .map(|t| t.src)
        .collect()
}

#[test]
fn operators_and_operands() {
    use TokenKind::*;
    assert_eq!(
        kinds("$a+@b*(1-c)"),
        vec![Var, AddSub, Prop, MulDiv, LPar, Lit, AddSub, Var, RPar]
    );
    assert_eq!(kinds("a ? b : c"), vec![Var, Space, Tern, Space, Var, Space, Colon, Space, Var]);
}

#[test]
fn longest_match_wins() {
    assert_eq!(srcs("a>=b"), vec!["a", ">=", "b"]);
    assert_eq!(srcs("a!=!b"), vec!["a", "!=", "!", "b"]);
    assert_eq!(srcs("a..b"), vec!["a", "..", "b"]);
    assert_eq!(srcs("a&&b||c"), vec!["a", "&&", "b", "||", "c"]);
}

#[test]
fn scope_sigils_are_part_of_the_variable() {
    assert_eq!(srcs("$$$c + $0 + $"), vec!["$$$c", "+", "$0", "+", "$"]);
}

#[test]
fn numbers() {
    assert_eq!(srcs("1.5e3 + 2 + 10e"), vec!["1.5e3", "+", "2", "+", "10", "e"]);
    assert_eq!(srcs("1..2"), vec!["1", "..", "2"]);
}

#[test]
fn keywords_are_literals_but_prefixes_are_not() {
    let tokens = tokenize("true truthy null").unwrap();
    let non_space: Vec<_> = tokens.iter().filter(|t| t.kind != TokenKind::Space).collect();
    assert_eq!(non_space[0].kind, TokenKind::Lit);
    assert_eq!(non_space[1].kind, TokenKind::Var);
    assert_eq!(non_space[2].kind, TokenKind::Lit);
}

#[test]
fn quoted_strings_go_through_the_literal_tokenizer() {
    let tokens = tokenize("'a' + \"b $x\"").unwrap();
    assert_eq!(tokens[0], Token::new(TokenKind::Lit, "\"a\"", 1));
    let var = tokens.iter().find(|t| t.kind == TokenKind::Var).unwrap();
    assert_eq!(var.src, "$x");
    assert_eq!(var.offset, 9);
}

#[test]
fn offsets_point_into_the_source() {
    let tokens = tokenize("ab +  cd").unwrap();
    let last = tokens.last().unwrap();
    assert_eq!(last.src, "cd");
    assert_eq!(last.offset, 6);
}

#[test]
fn unmatched_input_reports_snippet() {
    let err = tokenize("a + #this is definitely not valid syntax").unwrap_err();
    match err {
        SpecbindError::Syntax { offset, message } => {
            assert_eq!(offset, 4);
            assert!(message.contains("#this is definitely"));
            assert!(!message.contains("syntax"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unterminated_string_is_an_error() {
    assert!(tokenize("'abc").unwrap_err().is_syntax());
}
