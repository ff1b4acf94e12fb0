//! Artifacts that import, load and call into each other

mod common;

use common::{Fixture, GREET};
use parcel_core::{ImportError, Value};

#[test]
fn test_nested_import_becomes_member() {
    let fx = Fixture::new();
    fx.write("foo.pcl", r#"fn name() = "foo""#);
    fx.write(
        "bar.pcl",
        r#"
        import "foo"
        import "foo" as fee
        fn describe() = "bar uses " + foo.name()
        fn via_alias() = fee.name
        "#,
    );
    let importer = fx.importer();

    let bar = importer.import_value("bar").unwrap();
    let foo = importer.import_value("foo").unwrap();

    assert!(bar.member("foo").unwrap().ptr_eq(&foo));
    assert!(bar.member("fee").unwrap().ptr_eq(&foo));
    assert_eq!(bar.call("describe", &[]).unwrap(), Value::from("bar uses foo"));
    assert_eq!(bar.call("via_alias", &[]).unwrap(), Value::from("foo"));
    assert_eq!(importer.registry().load_count(), 2);
}

#[test]
fn test_nested_import_as_constant() {
    let fx = Fixture::new();
    fx.write("lib/greet.pcl", GREET);
    fx.write(
        "app.pcl",
        r#"
        import "lib/greet" to const
        const MESSAGE = Greet.hello() + "!"
        "#,
    );
    let importer = fx.importer();

    let app = importer.import_value("app").unwrap();
    assert_eq!(app.constant("MESSAGE").unwrap(), Value::from("hi!"));
    match app.constant("Greet").unwrap() {
        Value::Module(handle) => assert_eq!(handle.name().as_str(), "lib/greet"),
        other => panic!("expected module constant, got {}", other),
    }
}

#[test]
fn test_const_import_never_silently_replaces_a_constant() {
    let fx = Fixture::new();
    fx.write("foo.pcl", r#"fn name() = "foo""#);
    fx.write(
        "app.pcl",
        r#"
        const Foo = 1
        import "foo" to const
        "#,
    );

    match fx.strict_importer().import_value("app") {
        Err(ImportError::BindingConflict { name, existing, .. }) => {
            assert_eq!(name, "Foo");
            assert_eq!(existing, "1");
        }
        other => panic!("expected BindingConflict, got {:?}", other),
    }

    let app = fx.importer().import_value("app").unwrap();
    assert!(matches!(app.constant("Foo").unwrap(), Value::Module(_)));
}

#[test]
fn test_circular_import_is_reported() {
    let fx = Fixture::new();
    fx.write("ping.pcl", r#"import "pong""#);
    fx.write("pong.pcl", r#"import "ping""#);
    let importer = fx.importer();

    let err = importer.import_value("ping").unwrap_err();
    assert!(matches!(err, ImportError::CircularImport(ref path) if path.to_string() == "ping.pcl"));
    assert!(importer.registry().is_empty());
}

#[test]
fn test_load_extends_same_module() {
    let fx = Fixture::new();
    fx.write(
        "pkg/main.pcl",
        r#"
        const NAME = "main"
        load "helpers"
        load "helpers.pcl"
        fn both() = NAME + "+" + helper()
        "#,
    );
    fx.write("pkg/helpers.pcl", r#"fn helper() = "helper""#);
    let importer = fx.importer();

    let main = importer.import_value("pkg/main").unwrap();
    assert_eq!(main.call("both", &[]).unwrap(), Value::from("main+helper"));
    assert_eq!(main.sources().len(), 2);

    let exports = main.exports();
    assert_eq!(exports.constants, vec!["NAME"]);
    assert_eq!(
        exports.functions,
        vec![("both".to_string(), 0), ("helper".to_string(), 0)]
    );
}

#[test]
fn test_load_relative_through_importer() {
    let fx = Fixture::new();
    fx.write("pkg/core.pcl", "const A = 1");
    fx.write("pkg/extra.pcl", "const B = A + 1");
    let importer = fx.importer();

    let core = importer.import_value("pkg/core").unwrap();
    let loaded = importer.load_relative(&core, "extra").unwrap();

    assert!(loaded.ends_with("extra.pcl"));
    assert_eq!(core.constant("B").unwrap(), Value::Int(2));
    // Same handle is still the cached one
    assert!(importer.import_value("pkg/core").unwrap().ptr_eq(&core));

    assert!(matches!(
        importer.load_relative(&core, "missing"),
        Err(ImportError::ArtifactNotFound { .. })
    ));
}

#[test]
fn test_failed_extension_can_be_retried() {
    let fx = Fixture::new();
    fx.write("pkg/core.pcl", "const A = 1");
    fx.write("pkg/extra.pcl", "const B = 1 / 0");
    let importer = fx.importer();

    let core = importer.import_value("pkg/core").unwrap();
    assert!(matches!(
        importer.load_relative(&core, "extra"),
        Err(ImportError::Eval { .. })
    ));
    assert_eq!(core.sources().len(), 1);

    fx.write("pkg/extra.pcl", "const B = 2");
    importer.load_relative(&core, "extra").unwrap();
    assert_eq!(core.constant("B").unwrap(), Value::Int(2));
    assert_eq!(core.sources().len(), 2);
}

#[test]
fn test_load_names_stay_inside_the_tree() {
    let fx = Fixture::new();
    fx.write("pkg/core.pcl", "const A = 1");
    fx.write("secret.pcl", r#"const LEAKED = "yes""#);
    let importer = fx.importer();
    let core = importer.import_value("pkg/core").unwrap();

    let outside = fx.root().join("secret.pcl");
    for name in ["../secret", "./extra", "pkg//extra", outside.to_str().unwrap()] {
        assert!(
            matches!(
                importer.load_relative(&core, name),
                Err(ImportError::InvalidNamespace(_))
            ),
            "{} should be rejected",
            name
        );
    }
    assert!(core.constant("LEAKED").is_err());

    fx.write("nested.pcl", r#"load "../secret""#);
    assert!(matches!(
        importer.import_value("nested"),
        Err(ImportError::InvalidNamespace(_))
    ));
}

#[test]
fn test_long_chains_fail_to_parse() {
    let fx = Fixture::new();
    fx.write("big.pcl", &format!("const X = {}1", "1 + ".repeat(20_000)));
    fx.write("deep.pcl", &format!("fn f() = m{}", ".x".repeat(50_000)));
    let importer = fx.importer();

    for namespace in ["big", "deep"] {
        match importer.import_value(namespace) {
            Err(ImportError::Parse { error, .. }) => assert!(error.message.contains("nesting depth")),
            other => panic!("expected parse error for {}, got {:?}", namespace, other),
        }
    }
    assert!(importer.registry().is_empty());
}

#[test]
fn test_search_paths_in_order() {
    let fx = Fixture::new();
    fx.write("first/lib/util.pcl", r#"const FROM = "first""#);
    fx.write("second/lib/util.pcl", r#"const FROM = "second""#);
    fx.write("second/lib/only.pcl", r#"const FROM = "second""#);

    let config = parcel_core::ParcelConfig::default()
        .with_search_paths(vec![fx.root().join("first"), fx.root().join("second")]);
    let importer = parcel_core::Importer::with_registry(
        config,
        std::sync::Arc::new(parcel_core::ModuleRegistry::new()),
    );

    let util = importer.import_value("lib/util").unwrap();
    let only = importer.import_value("lib/only").unwrap();
    assert_eq!(util.constant("FROM").unwrap(), Value::from("first"));
    assert_eq!(only.constant("FROM").unwrap(), Value::from("second"));
}

#[test]
fn test_eval_error_names_the_module() {
    let fx = Fixture::new();
    fx.write("oops.pcl", r#"const BAD = 1 + "one""#);
    let importer = fx.importer();

    match importer.import_value("oops") {
        Err(ImportError::Eval { namespace, .. }) => assert_eq!(namespace, "oops"),
        other => panic!("expected eval error, got {:?}", other),
    }
}

#[test]
fn test_config_file_drives_importer() {
    let fx = Fixture::new();
    fx.write("lib/greet.pcl", GREET);
    let config_file = fx.write(
        "parcel.toml",
        "[loader]\nsearch_paths = [\"lib\"]\n\n[bindings]\ndefault_strategy = \"const\"\n",
    );

    let nested = fx.root().join("deep/inside");
    std::fs::create_dir_all(&nested).unwrap();
    let found = parcel_core::find_config(&nested).unwrap();
    assert_eq!(found, config_file);

    let config = parcel_core::ParcelConfig::from_file(&found).unwrap();
    let importer = parcel_core::Importer::with_registry(
        config,
        std::sync::Arc::new(parcel_core::ModuleRegistry::new()),
    );
    let ctx = parcel_core::Scope::new("App");
    importer
        .import(&ctx, "greet", parcel_core::ImportOptions::new())
        .unwrap();

    use parcel_core::Context;
    assert!(ctx.has_constant("Greet"));
}
