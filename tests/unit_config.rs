use std::fs;

use homedo::config::Config;
use homedo::error::Error;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_or_default(&dir.path().join("config.toml")).expect("defaults");

    assert!(config.store.path.is_none());
    assert_eq!(config.history.max_per_task, 20);
    assert_eq!(config.publish.upcoming_days, 7);
    assert_eq!(config.publish.debounce_ms, 500);
    assert!(config.publish.destination.is_none());
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    let toml = r#"
[store]
path = "/srv/homedo/tasks.db"

[history]
max_per_task = 50

[publish]
upcoming_days = 14
debounce_ms = 250
destination = "-"
"#;
    fs::write(&config_path, toml)?;

    let config = Config::load(&config_path)?;
    assert_eq!(config.database_path()?, std::path::PathBuf::from("/srv/homedo/tasks.db"));
    assert_eq!(config.history.max_per_task, 50);
    assert_eq!(config.publish.upcoming_days, 14);
    assert_eq!(config.publish.debounce_ms, 250);
    assert_eq!(config.publish.destination.as_deref(), Some("-"));

    Ok(())
}

#[test]
fn config_rejects_zero_history_limit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[history]\nmax_per_task = 0\n")?;

    let err = Config::load(&config_path).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    fs::write(&config_path, "[history\n")?;
    let err = Config::load(&config_path).unwrap_err();
    assert!(matches!(err, Error::TomlParse(_)));

    Ok(())
}

#[test]
fn config_save_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.publish.destination = Some("/tmp/upcoming.jsonl".to_string());
    config.save(&config_path)?;

    let loaded = Config::load(&config_path)?;
    assert_eq!(loaded.publish.destination, config.publish.destination);
    assert_eq!(loaded.history.max_per_task, config.history.max_per_task);

    Ok(())
}
