use std::fs;

use sensorthings_query::{
    config::{ConfigError, EngineConfig},
    model::EntityType,
    query::{ExpandItem, QueryEngine, QueryOptions, Selection},
};

#[test]
fn file_settings_reach_the_generated_sql() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        "[query]\nschema = \"v1\"\nmax_top = 25\ndefault_top = 10\nstrict_schema = true\n",
    )?;

    let config = EngineConfig::load(&path)?;
    assert_eq!(config.schema.as_deref(), Some("v1"));
    assert_eq!(config.max_top, 25);
    assert!(config.strict_schema);

    let engine = QueryEngine::new(config);
    let options = QueryOptions::new().with_expand(ExpandItem::new(vec![EntityType::Datastream]));
    let sql = engine.explain(EntityType::Thing, &Selection::All, &options)?;
    assert!(sql.contains("FROM v1.thing ORDER BY thing.id DESC LIMIT 11) AS A_thing"), "{sql}");
    assert!(sql.contains("FROM v1.datastream WHERE"), "{sql}");
    assert!(sql.contains("LIMIT 25) AS B_datastream ON true"), "{sql}");
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("saved.toml");
    let config = EngineConfig {
        default_top: Some(100),
        ..EngineConfig::default()
    };
    fs::write(&path, config.to_toml_string()?)?;
    assert_eq!(EngineConfig::load(&path)?, config);
    Ok(())
}

#[test]
fn invalid_file_reports_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[query\nschema = ")?;
    let err = EngineConfig::load(&path).expect_err("broken toml");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.code(), "ConfigParse");
    Ok(())
}
