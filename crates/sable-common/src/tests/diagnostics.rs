use super::*;

#[test]
fn display_includes_kind_and_line() {
    let err = BindError::new(ErrorKind::TypeMismatch, Loc::new(7), "cannot unify");
    let text = err.to_string();
    assert!(text.contains("line 7"), "{text}");
    assert!(text.contains("type-mismatch"), "{text}");
}

#[test]
fn display_renders_datatype_pair() {
    let err = BindError::new(ErrorKind::TypeMismatch, Loc::new(3), "cannot unify")
        .with_datatypes("u32", "i32");
    assert!(err.to_string().contains("(u32 vs i32)"));
}

#[test]
fn kind_names_are_stable() {
    assert_eq!(ErrorKind::SecretViolation.as_str(), "secret-violation");
    assert_eq!(ErrorKind::OverflowWouldOccur.as_str(), "overflow-would-occur");
    assert_eq!(ErrorKind::CyclicDependency.as_str(), "cyclic-dependency");
}
