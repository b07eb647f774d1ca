//! Config loading, TOML parsing, and env var override tests.

use covisit::{Config, Error, DEFAULT_SIMILARITY_LIMIT};
use std::fs;
use tempfile::TempDir;

// Default Configuration Tests
#[test]
fn test_config_default_store_url() {
    let config = Config::default();
    assert_eq!(config.store.url, "redis://127.0.0.1:6379");
}

#[test]
fn test_config_default_timeout_disabled() {
    let config = Config::default();
    assert_eq!(config.store.timeout_ms, 0);
}

#[test]
fn test_config_default_similarity_limit() {
    let config = Config::default();
    assert_eq!(config.engine.similarity_limit, DEFAULT_SIMILARITY_LIMIT);
}

#[test]
fn test_config_default_reprocess_threads() {
    let config = Config::default();
    assert_eq!(config.engine.reprocess_threads, 0); // 0 = use all CPUs
}

#[test]
fn test_config_default_has_no_recommenders() {
    let config = Config::default();
    assert!(config.recommenders.is_empty());
}

// TOML File Parsing Tests
#[test]
fn test_load_config_from_toml() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("covisit.toml");

    let config_content = r#"
[store]
url = "redis://cache.internal:6390/2"

[engine]
similarity_limit = 32
reprocess_threads = 4

[recommenders.courses]
similarity_limit = 16
matrices = [
    { label = "users", weight = 3.0 },
    { label = "tags", weight = 2.0 },
]

[recommenders.articles]
matrices = [
    { label = "readers", weight = 1.0 },
]
"#;
    fs::write(&config_path, config_content).unwrap();

    let config = Config::from_file(config_path.to_str().unwrap()).unwrap();
    assert_eq!(config.store.url, "redis://cache.internal:6390/2");
    assert_eq!(config.engine.similarity_limit, 32);
    assert_eq!(config.engine.reprocess_threads, 4);
    assert_eq!(config.recommenders.len(), 2);

    let courses = &config.recommenders["courses"];
    assert_eq!(courses.matrices.len(), 2);
    assert_eq!(courses.matrices[0].label, "users");
    assert_eq!(courses.matrices[0].weight, 3.0);
    assert_eq!(courses.similarity_limit, Some(16));
}

#[test]
fn test_partial_toml_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("covisit.toml");
    fs::write(&config_path, "[store]\nurl = \"redis://10.0.0.1:6379\"\n").unwrap();

    let config = Config::from_file(config_path.to_str().unwrap()).unwrap();
    assert_eq!(config.store.url, "redis://10.0.0.1:6379");
    assert_eq!(config.engine.similarity_limit, DEFAULT_SIMILARITY_LIMIT);
}

#[test]
fn test_missing_file_yields_defaults() {
    let config = Config::from_file("/nonexistent/covisit.toml").unwrap();
    assert_eq!(config.store.url, "redis://127.0.0.1:6379");
}

// Environment Variable Override Tests
#[test]
fn test_env_var_overrides_toml() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("covisit.toml");
    fs::write(&config_path, "[store]\ntimeout_ms = 100\n").unwrap();

    std::env::set_var("COVISIT_STORE__TIMEOUT_MS", "777");
    let config = Config::from_file(config_path.to_str().unwrap()).unwrap();
    std::env::remove_var("COVISIT_STORE__TIMEOUT_MS");

    assert_eq!(config.store.timeout_ms, 777);
}

// Recommender Resolution Tests
#[test]
fn test_recommender_resolution_applies_engine_defaults() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("covisit.toml");

    let config_content = r#"
[engine]
similarity_limit = 64

[recommenders.courses]
matrices = [{ label = "users", weight = 3.0 }]

[recommenders.articles]
similarity_limit = 8
reprocess_threads = 2
matrices = [{ label = "readers", weight = 1.0 }]
"#;
    fs::write(&config_path, config_content).unwrap();
    let config = Config::from_file(config_path.to_str().unwrap()).unwrap();

    let courses = config.recommender("courses").unwrap();
    assert_eq!(courses.name, "courses");
    assert_eq!(courses.similarity_limit, 64);
    assert_eq!(courses.reprocess_threads, 0);

    let articles = config.recommender("articles").unwrap();
    assert_eq!(articles.similarity_limit, 8);
    assert_eq!(articles.reprocess_threads, 2);
}

#[test]
fn test_unknown_recommender_is_an_error() {
    let config = Config::default();
    let result = config.recommender("ghost");
    assert!(matches!(result, Err(Error::UnknownRecommender(name)) if name == "ghost"));
}

#[test]
fn test_builder_chain() {
    let config = covisit::RecommenderConfig::new("courses")
        .matrix("users", 3.0)
        .matrix("tags", 2.0)
        .similarity_limit(10)
        .reprocess_threads(1);
    assert_eq!(config.name, "courses");
    assert_eq!(config.matrices.len(), 2);
    assert_eq!(config.similarity_limit, 10);
    assert_eq!(config.reprocess_threads, 1);
}
