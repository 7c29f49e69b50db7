//! Tests for configuration providers

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_map_config_typed_getters() {
    let config = MapConfig::new()
        .with("redis.names", "main, cache2")
        .with("redis.main.port", "6380")
        .with("redis.main.validate_on_borrow", "no");

    assert_eq!(config.get_string_or("redis.names", "main"), "main, cache2");
    assert_eq!(config.get_string_or("redis.other", "fallback"), "fallback");
    assert_eq!(config.get_parsed_or("redis.main.port", 6379u16).unwrap(), 6380);
    assert_eq!(config.get_parsed_or("redis.cache2.port", 6379u16).unwrap(), 6379);
    assert!(!config.get_bool_or("redis.main.validate_on_borrow", true).unwrap());
    assert!(config.get_bool_or("redis.cache2.validate_on_borrow", true).unwrap());
}

#[test]
fn test_unparsable_value_is_an_error() {
    let config = MapConfig::new().with("redis.main.port", "not-a-port");
    let err = config.get_parsed_or("redis.main.port", 6379u16).unwrap_err();
    assert!(matches!(err, KvError::Configuration(msg) if msg.contains("redis.main.port")));

    let config = MapConfig::new().with("flag", "maybe");
    assert!(config.get_bool_or("flag", false).is_err());
}

#[test]
fn test_map_config_from_iter() {
    let config: MapConfig = [("a.b", "1"), ("a.c", "2")].into_iter().collect();
    assert_eq!(config.len(), 2);
    assert_eq!(config.get_string("a.c").as_deref(), Some("2"));
}

#[test]
fn test_toml_config_flattens_tables() {
    let config = TomlConfig::from_str(indoc! {r#"
        [redis]
        names = "main,cache2"

        [redis.main]
        host = "10.0.0.5"
        port = 6380
        validate_on_borrow = false

        [redis.cache2]
        password = "s3cret"
    "#})
    .unwrap();

    assert_eq!(config.get_string("redis.names").as_deref(), Some("main,cache2"));
    assert_eq!(config.get_string("redis.main.host").as_deref(), Some("10.0.0.5"));
    assert_eq!(config.get_string("redis.main.port").as_deref(), Some("6380"));
    assert_eq!(
        config.get_string("redis.main.validate_on_borrow").as_deref(),
        Some("false")
    );
    assert_eq!(
        config.get_string("redis.cache2.password").as_deref(),
        Some("s3cret")
    );
    assert!(config.get_string("redis.cache2.host").is_none());
}

#[test]
fn test_toml_arrays_become_lists() {
    let config = TomlConfig::from_str(indoc! {r#"
        [redis]
        names = ["main", "sessions"]
    "#})
    .unwrap();

    assert_eq!(config.get_string("redis.names").as_deref(), Some("main,sessions"));
}

#[test]
fn test_toml_config_rejects_invalid_documents() {
    let err = TomlConfig::from_str("[redis\nnames = ").unwrap_err();
    assert!(matches!(err, KvError::Configuration(_)));
}

#[test]
fn test_toml_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kvpool.toml");
    std::fs::write(&path, "[redis]\nnames = \"main\"\n").unwrap();

    let config = TomlConfig::from_file(&path).unwrap();
    assert_eq!(config.get_string("redis.names").as_deref(), Some("main"));

    let missing = TomlConfig::from_file(dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(KvError::Io(_))));
}

#[test]
fn test_env_variable_names() {
    let env = EnvConfig::new("KVPOOL");
    assert_eq!(env.variable_name("redis.main.host"), "KVPOOL_REDIS_MAIN_HOST");
    assert_eq!(env.variable_name("redis.cache-2.port"), "KVPOOL_REDIS_CACHE_2_PORT");
    assert_eq!(EnvConfig::new("").variable_name("redis.names"), "REDIS_NAMES");
}

#[test]
fn test_env_config_reads_variables() {
    // SAFETY: the variable name is unique to this test.
    unsafe {
        std::env::set_var("KVPOOL_SETTINGS_TEST_REDIS_NAMES", "alpha,beta");
    }
    let env = EnvConfig::new("KVPOOL_SETTINGS_TEST");
    assert_eq!(env.get_string("redis.names").as_deref(), Some("alpha,beta"));
    assert!(env.get_string("redis.alpha.host").is_none());
}

#[test]
fn test_layered_config_first_layer_wins() {
    let overrides = MapConfig::new().with("redis.main.host", "override.local");
    let base = MapConfig::new()
        .with("redis.main.host", "base.local")
        .with("redis.main.port", "7000");

    let config = LayeredConfig::new().with_layer(overrides).with_layer(base);

    assert_eq!(config.len(), 2);
    assert_eq!(
        config.get_string("redis.main.host").as_deref(),
        Some("override.local")
    );
    assert_eq!(config.get_string("redis.main.port").as_deref(), Some("7000"));
    assert!(config.get_string("redis.names").is_none());
}

#[test]
fn test_parse_value_through_trait_object() {
    let config: Arc<dyn ConfigSource> = Arc::new(MapConfig::new().with("n", "12"));
    assert_eq!(parse_value(config.get_string("n"), "n", 0usize).unwrap(), 12);
    assert_eq!(config.get_parsed_or("missing", 3usize).unwrap(), 3);
}

#[test]
fn test_layered_config_debug_shows_layer_count() {
    let config = LayeredConfig::new()
        .with_layer(MapConfig::new())
        .with_layer(EnvConfig::new("KVPOOL_DEBUG_TEST"));
    assert_eq!(format!("{:?}", config), "LayeredConfig { layers: 2 }");
}
