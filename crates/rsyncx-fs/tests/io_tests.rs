use pretty_assertions::assert_eq;
use rsyncx_fs::{ConfigStore, RobustnessConfig, io};
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("groups").join("docs").join("state.json");

    io::write_atomic(&path, b"{}", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");
    fs::write(&path, "original").unwrap();

    io::write_text(&path, "updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_leaves_no_temp_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("deleted.json");

    io::write_text(&path, "content").unwrap();

    let leftovers: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}

#[test]
fn test_read_text_nonexistent_file() {
    let result = io::read_text("/nonexistent/rsyncx/file.txt");
    assert!(result.is_err());
}

#[derive(Debug, PartialEq, Deserialize)]
struct Sample {
    name: String,
    count: u32,
}

#[test]
fn test_config_store_loads_json_and_toml() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::new();
    let expected = Sample {
        name: "docs".into(),
        count: 3,
    };

    let json = temp.path().join("sample.json");
    fs::write(&json, r#"{ "name": "docs", "count": 3 }"#).unwrap();
    let toml = temp.path().join("sample.toml");
    fs::write(&toml, "name = \"docs\"\ncount = 3\n").unwrap();

    for path in [json, toml] {
        let loaded: Sample = store.load(&path).unwrap();
        assert_eq!(loaded, expected);
    }
}

#[test]
fn test_config_store_rejects_unknown_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sample.ini");
    fs::write(&path, "name=x").unwrap();
    let result: rsyncx_fs::Result<Sample> = ConfigStore::new().load(&path);
    assert!(matches!(
        result,
        Err(rsyncx_fs::Error::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_config_store_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let result: rsyncx_fs::Result<Sample> = ConfigStore::new().load(&path);
    assert!(matches!(result, Err(rsyncx_fs::Error::ConfigParse { .. })));
}
