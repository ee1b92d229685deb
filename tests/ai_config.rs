// tests/ai_config.rs
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::tempdir;

use value_analyzer::ai_adapter::build_generator;
use value_analyzer::config::ai::ENV_AI_CONFIG_PATH;
use value_analyzer::config::{AiConfig, AiProviderKind};

fn clear_env() {
    env::remove_var(ENV_AI_CONFIG_PATH);
    env::remove_var("AI_TEST_MODE");
    env::remove_var("GEMINI_API_KEY");
    env::remove_var("OPENAI_API_KEY");
}

#[test]
#[serial]
fn env_path_wins_over_local_files() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.json");
    fs::write(
        &path,
        r#"{"enabled": true, "provider": "openai", "api_key": "sk-test", "timeout_secs": 500}"#,
    )
    .unwrap();
    env::set_var(ENV_AI_CONFIG_PATH, &path);

    let cfg = AiConfig::load_default().unwrap();
    assert!(cfg.enabled);
    assert_eq!(cfg.provider, AiProviderKind::OpenAi);
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.timeout_secs, 120);

    clear_env();
}

#[test]
#[serial]
fn env_path_to_missing_file_is_an_error() {
    clear_env();
    env::set_var(ENV_AI_CONFIG_PATH, "/definitely/not/here/ai.toml");
    assert!(AiConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn env_api_key_is_resolved_by_provider() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ai.toml");
    fs::write(
        &path,
        "enabled = true\nprovider = \"gemini\"\napi_key = \"ENV\"\n",
    )
    .unwrap();

    assert!(AiConfig::load_from_file(&path).is_err(), "missing key env var must fail");

    env::set_var("GEMINI_API_KEY", "g-123");
    let cfg = AiConfig::load_from_file(&path).unwrap();
    assert_eq!(cfg.api_key, "g-123");
    assert_eq!(cfg.timeout_secs, 15);

    clear_env();
}

#[test]
#[serial]
fn disabled_config_does_not_need_a_key() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ai.toml");
    fs::write(&path, "enabled = false\napi_key = \"ENV\"\n").unwrap();

    let cfg = AiConfig::load_from_file(&path).unwrap();
    assert!(!cfg.enabled);
    assert!(build_generator(&cfg).is_none());
}

#[test]
#[serial]
fn unknown_extension_is_rejected() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ai.yaml");
    fs::write(&path, "enabled: true\n").unwrap();
    assert!(AiConfig::load_from_file(&path).is_err());
}

#[test]
#[serial]
fn generator_selection() {
    clear_env();

    assert!(build_generator(&AiConfig::default()).is_none());

    let enabled_without_key = AiConfig {
        enabled: true,
        api_key: "  ".into(),
        ..AiConfig::default()
    };
    assert!(build_generator(&enabled_without_key).is_none());

    let gemini = AiConfig {
        enabled: true,
        api_key: "g-123".into(),
        ..AiConfig::default()
    };
    assert_eq!(build_generator(&gemini).unwrap().provider_name(), "gemini");

    let openai = AiConfig {
        provider: AiProviderKind::OpenAi,
        ..gemini.clone()
    };
    assert_eq!(build_generator(&openai).unwrap().provider_name(), "openai");

    env::set_var("AI_TEST_MODE", "mock");
    assert_eq!(
        build_generator(&AiConfig::default()).unwrap().provider_name(),
        "mock"
    );
    clear_env();
}

#[tokio::test]
#[serial]
async fn analyzer_falls_back_to_local_on_broken_config() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ai.json");
    fs::write(&path, "{ not json").unwrap();
    env::set_var(ENV_AI_CONFIG_PATH, &path);

    let analyzer = value_analyzer::analyzer_from_default_config();
    assert!(analyzer.resolver().is_local_mode());
    assert_eq!(analyzer.resolver().provider_name(), "none");

    clear_env();
}
