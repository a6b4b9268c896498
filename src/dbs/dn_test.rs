use super::*;

#[test]
fn test_to_canonical() {
    assert_eq!(to_canonical("o=X"), "o=x");
    assert_eq!(to_canonical("CN=A, OU=B, O=X"), "cn=a,ou=b,o=x");
    assert_eq!(to_canonical(""), "");
    // escaped comma stays inside the component.
    assert_eq!(to_canonical("cn=a\\,b,o=x"), "cn=a\\,b,o=x");
}

#[test]
fn test_parent() {
    assert_eq!(parent("cn=a,ou=b,o=x"), "ou=b,o=x");
    assert_eq!(parent("ou=b,o=x"), "o=x");
    assert_eq!(parent("o=x"), "");
    assert_eq!(parent(""), "");
    assert_eq!(parent("cn=a\\,b,o=x"), "o=x");
}

#[test]
fn test_is_child_of() {
    assert!(is_child_of("cn=a,ou=b,o=x", "o=x"));
    assert!(is_child_of("ou=b,o=x", "o=x"));
    assert!(!is_child_of("o=x", "o=x"));
    assert!(!is_child_of("o=y", "o=x"));
    assert!(!is_child_of("cn=a,o=xx", "o=x"));
}
