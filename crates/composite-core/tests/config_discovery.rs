//! Config discovery through the environment

use std::path::Path;

use composite_core::config::CONFIG_PATH_ENV;
use composite_core::{CompositeConfig, CompositeError, ConfigFile, DescriptorSource};
use serial_test::serial;

const CONFIG: &str = r#"
backends:
  - name: docs
    url: http://localhost:8001/sse
    prefix: doc
  - name: calc
    url: http://localhost:8002/sse
    enabled: false
"#;

#[test]
#[serial]
fn env_path_is_used_when_no_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from-env.yaml");
    std::fs::write(&path, CONFIG).unwrap();

    std::env::set_var(CONFIG_PATH_ENV, &path);
    let found = CompositeConfig::discover(None);
    std::env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(found.unwrap(), path);
}

#[test]
#[serial]
fn explicit_path_beats_env() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.yaml");
    std::fs::write(&explicit, CONFIG).unwrap();

    std::env::set_var(CONFIG_PATH_ENV, dir.path().join("nope.yaml"));
    let found = CompositeConfig::discover(Some(Path::new(&explicit)));
    std::env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(found.unwrap(), explicit);
}

#[test]
#[serial]
fn env_path_that_does_not_exist_is_missing() {
    std::env::set_var(CONFIG_PATH_ENV, "/definitely/not/here.yaml");
    let err: CompositeError = CompositeConfig::discover(None).unwrap_err().into();
    std::env::remove_var(CONFIG_PATH_ENV);

    assert!(matches!(err, CompositeError::ConfigMissing(_)));
}

#[test]
fn config_file_source_reads_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("composite-config.yaml");
    let source = ConfigFile(path.clone());

    assert!(matches!(
        source.load_descriptors(),
        Err(CompositeError::InvalidConfig(_))
    ));

    std::fs::write(&path, CONFIG).unwrap();
    let descriptors = source.load_descriptors().unwrap();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].prefix(), "doc");
}
