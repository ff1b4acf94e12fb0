//! Namespace grammar properties

use parcel_core::{
    from_artifact_path, last_segment, qualified_identifier, to_artifact_path, Namespace,
    NamespaceError,
};
use std::path::Path;

const WELL_FORMED: &[&str] = &[
    "foo",
    "foo/bar",
    "test/fixtures/empty_package",
    "a/b/c/d/e",
    "with-dash/under_score",
    "v2/http_client",
];

#[test]
fn test_artifact_path_round_trip() {
    for raw in WELL_FORMED {
        let path = to_artifact_path(raw).unwrap();
        let back = from_artifact_path(path.as_path()).unwrap();
        assert_eq!(back.as_str(), *raw, "round trip of {}", raw);
        assert_eq!(path.namespace().as_str(), *raw);
    }
}

#[test]
fn test_artifact_path_uses_host_separator() {
    let path = to_artifact_path("foo/bar/baz").unwrap();
    let expected = Path::new("foo").join("bar").join("baz.pcl");
    assert_eq!(path.as_path(), expected.as_path());
}

#[test]
fn test_extension_is_never_doubled() {
    let plain = to_artifact_path("foo/bar").unwrap();
    let suffixed = to_artifact_path("foo/bar.pcl").unwrap();
    assert_eq!(plain, suffixed);
}

#[test]
fn test_malformed_namespaces_are_rejected() {
    let cases: &[(&str, fn(&NamespaceError) -> bool)] = &[
        ("", |e| matches!(e, NamespaceError::Empty)),
        ("/", |e| matches!(e, NamespaceError::Empty)),
        ("//", |e| matches!(e, NamespaceError::Empty)),
        ("/etc/passwd", |e| matches!(e, NamespaceError::Absolute(_))),
        ("foo//bar", |e| matches!(e, NamespaceError::EmptySegment(_))),
        ("foo/bar/", |e| matches!(e, NamespaceError::EmptySegment(_))),
        ("../secret", |e| matches!(e, NamespaceError::Traversal { .. })),
        ("foo/./bar", |e| matches!(e, NamespaceError::Traversal { .. })),
        ("foo\\bar", |e| matches!(e, NamespaceError::InvalidCharacter { ch: '\\', .. })),
        ("héllo", |e| matches!(e, NamespaceError::InvalidCharacter { .. })),
    ];

    for (raw, expected) in cases {
        let err = Namespace::parse(raw).unwrap_err();
        assert!(expected(&err), "unexpected error for {:?}: {:?}", raw, err);
    }
}

#[test]
fn test_identifier_names() {
    assert_eq!(last_segment("foo/bar_baz"), "bar_baz");
    assert_eq!(qualified_identifier("foo_bar/baz_qux"), "FooBar::BazQux");

    let ns = Namespace::parse("foo/bar_baz").unwrap();
    assert_eq!(ns.last_segment(), "bar_baz");
    assert_eq!(ns.constant_name(), "BarBaz");
}

#[test]
fn test_namespace_from_str() {
    let ns: Namespace = "foo/bar".parse().unwrap();
    assert_eq!(ns.to_string(), "foo/bar");
    assert!("foo//bar".parse::<Namespace>().is_err());
}
