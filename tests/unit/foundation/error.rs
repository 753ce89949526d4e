use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SpecbindError::syntax(3, "x")
            .to_string()
            .contains("syntax error at byte 3:")
    );
    assert!(
        SpecbindError::binding("x")
            .to_string()
            .contains("binding error:")
    );
    assert!(
        SpecbindError::recursion("x")
            .to_string()
            .contains("recursion guard:")
    );
    assert!(
        SpecbindError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        SpecbindError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_syntax_errors_report_is_syntax() {
    assert!(SpecbindError::syntax(0, "bad").is_syntax());
    assert!(!SpecbindError::binding("bad").is_syntax());
    assert!(!SpecbindError::NoViewSwitch.is_syntax());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SpecbindError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_convert() {
    let err: SpecbindError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, SpecbindError::Serde(_)));
}
