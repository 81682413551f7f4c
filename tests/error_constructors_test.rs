use elektra::error::ElektraError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        ElektraError::config("x"),
        ElektraError::Config { .. }
    ));
    assert!(matches!(ElektraError::auth("x"), ElektraError::Auth { .. }));
    assert!(matches!(
        ElektraError::network("x"),
        ElektraError::Network { .. }
    ));
    assert!(matches!(
        ElektraError::timeout("x"),
        ElektraError::Timeout { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    let ser = ElektraError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, ElektraError::Serialization { .. }));
    assert!(matches!(ElektraError::io("x"), ElektraError::Io { .. }));
    assert!(matches!(ElektraError::data("x"), ElektraError::Data { .. }));
    assert!(matches!(
        ElektraError::validation("f", "m"),
        ElektraError::Validation { .. }
    ));
    assert!(matches!(
        ElektraError::generic("x"),
        ElektraError::Generic { .. }
    ));
}

#[test]
fn display_messages() {
    let e = ElektraError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = ElektraError::data("garbled payload");
    assert_eq!(format!("{}", e), "Data error: garbled payload");
}

#[test]
fn transient_errors_are_exactly_network_and_timeout() {
    assert!(ElektraError::network("x").is_transient());
    assert!(ElektraError::timeout("x").is_transient());
    assert!(!ElektraError::config("x").is_transient());
    assert!(!ElektraError::auth("x").is_transient());
    assert!(!ElektraError::data("x").is_transient());
    assert!(!ElektraError::generic("x").is_transient());
}
