//! Config file loading from disk.

use std::io::Write;

use tachibana_cli::config::Config;
use tachibana_cli::error::Error;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_full_config() {
    let file = write_config(
        r#"
[account]
user_id = "demo0001"
password = "secret"
second_password = "pin"

[api]
environment = "demo"
timeout_secs = 20

[tracker]
interval_secs = 3
missing_tolerance = 5
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.account.user_id, "demo0001");
    assert_eq!(config.api.timeout_secs, 20);
    assert_eq!(config.tracker.missing_tolerance, 5);
    assert_eq!(config.tracker.max_polls, 720);
    assert!(config.client_config().auth_url().starts_with("https://demo-kabuka.e-shiten.jp/"));
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigRead { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn broken_toml_is_a_parse_error() {
    let file = write_config("[account\nuser_id = ");
    assert!(matches!(Config::load(file.path()), Err(Error::ConfigParse(_))));
}

#[test]
fn missing_account_section_is_rejected() {
    let file = write_config("[api]\nenvironment = \"demo\"\n");
    assert!(Config::load(file.path()).is_err());
}

#[test]
fn zero_max_polls_is_rejected() {
    let file = write_config("[account]\nuser_id = \"u\"\n[tracker]\nmax_polls = 0\n");
    assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
}
