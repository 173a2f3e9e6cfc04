//! Config file loading, parse-error messages and source precedence.

use std::collections::HashMap;
use std::path::PathBuf;

use assert_fs::prelude::*;
use mirror_core::{
    config::{self, ACCESS_KEY_VAR, SECRET_KEY_VAR},
    ConfigError, ConfigOverrides, MirrorConfig,
};
use predicates::prelude::predicate;
use rstest::rstest;

fn credentials_env() -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<&str, &str> =
        HashMap::from([(ACCESS_KEY_VAR, "minio"), (SECRET_KEY_VAR, "minio123")]);
    move |name| vars.get(name).map(|v| v.to_string())
}

// ---------------------------------------------------------------------------
// 1. Loading
// ---------------------------------------------------------------------------

#[test]
fn full_file_resolves_without_overrides() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(
        "endpoint_url: http://localhost:9000\n\
         bucket_name: photos\n\
         local_path: /srv/photos\n\
         create_bucket: true\n\
         region: eu-central-1\n\
         extensions: [.jpg, .PNG]\n\
         retry:\n  max_attempts: 3\n  initial_backoff_ms: 50\n",
    )
    .expect("write");

    let loaded = config::load_file_at(file.path()).expect("load");
    let resolved =
        MirrorConfig::resolve_with_env(Some(loaded), ConfigOverrides::default(), credentials_env())
            .expect("resolve");

    assert_eq!(resolved.endpoint_url, "http://localhost:9000");
    assert_eq!(resolved.bucket.as_str(), "photos");
    assert_eq!(resolved.local_path, PathBuf::from("/srv/photos"));
    assert!(resolved.create_bucket);
    assert_eq!(resolved.region, "eu-central-1");
    assert_eq!(
        resolved.extensions,
        Some(vec![".jpg".to_string(), ".PNG".to_string()])
    );
    assert_eq!(resolved.retry.max_attempts, 3);
    assert_eq!(resolved.retry.initial_backoff_ms, 50);
    assert_eq!(resolved.retry.max_backoff_ms, 5_000);
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("endpoint_url: [unclosed\n").expect("write");

    let err = config::load_file_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn unknown_key_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("bucket: typo-for-bucket_name\n").expect("write");

    let err = config::load_file_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn default_file_is_found_under_mirror_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("mirror").create_dir_all().expect("mkdir");
    dir.child("mirror/config.yaml")
        .write_str("bucket_name: from-default\n")
        .expect("write");
    dir.child("mirror/config.yaml").assert(predicate::path::exists());

    let loaded = config::load_default_file_at(dir.path())
        .expect("load")
        .expect("present");
    assert_eq!(loaded.bucket_name.as_deref(), Some("from-default"));
}

// ---------------------------------------------------------------------------
// 2. Required fields
// ---------------------------------------------------------------------------

#[rstest]
#[case::no_endpoint(None, Some("b"), Some("/r"), "endpoint_url")]
#[case::no_bucket(Some("http://h"), None, Some("/r"), "bucket_name")]
#[case::no_root(Some("http://h"), Some("b"), None, "local_path")]
fn single_missing_field_is_named(
    #[case] endpoint: Option<&str>,
    #[case] bucket: Option<&str>,
    #[case] root: Option<&str>,
    #[case] expected: &str,
) {
    let overrides = ConfigOverrides {
        endpoint_url: endpoint.map(str::to_string),
        bucket_name: bucket.map(str::to_string),
        local_path: root.map(PathBuf::from),
        ..ConfigOverrides::default()
    };
    let err = MirrorConfig::resolve_with_env(None, overrides, credentials_env()).unwrap_err();
    match err {
        ConfigError::MissingFields { fields } => assert_eq!(fields, vec![expected]),
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[test]
fn empty_extension_override_falls_back_to_file() {
    let file = mirror_core::ConfigFile {
        extensions: Some(vec![".txt".to_string()]),
        ..Default::default()
    };
    let overrides = ConfigOverrides {
        endpoint_url: Some("https://s3.example.com".to_string()),
        bucket_name: Some("b".to_string()),
        local_path: Some(PathBuf::from("/r")),
        extensions: Some(vec![]),
        ..ConfigOverrides::default()
    };
    let resolved =
        MirrorConfig::resolve_with_env(Some(file), overrides, credentials_env()).expect("resolve");
    assert_eq!(resolved.extensions, Some(vec![".txt".to_string()]));
}
