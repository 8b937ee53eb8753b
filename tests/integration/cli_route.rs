//! Integration tests for CLI command routing

use rezi::cli::{Commands, RunContext};
use rezi::config::ReziConfig;
use rezi::ReziError;
use std::path::PathBuf;
use tempfile::TempDir;

fn context_in(temp: &TempDir) -> RunContext {
    let mut config = ReziConfig::default();
    config.storage.data_dir = Some(temp.path().join("data"));
    config.app.download_dir = Some(temp.path().join("downloads"));
    RunContext::from_config(config)
}

#[tokio::test]
async fn test_credits_initialises_balance_on_first_run() {
    let temp = TempDir::new().unwrap();
    let context = context_in(&temp);

    let out = context
        .execute(&Commands::Credits {
            format: "json".to_string(),
        })
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["credits"], 100);
    assert_eq!(value["generation_cost"], 10);
    assert!(temp.path().join("data").exists());
}

#[tokio::test]
async fn test_credits_rejects_unknown_format() {
    let temp = TempDir::new().unwrap();
    let context = context_in(&temp);
    let err = context
        .execute(&Commands::Credits {
            format: "xml".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReziError::Config(_)));
}

#[tokio::test]
async fn test_facts_lists_all_seven() {
    let temp = TempDir::new().unwrap();
    let out = context_in(&temp).execute(&Commands::Facts).await.unwrap();
    assert_eq!(out.lines().count(), 7);
    assert!(out.starts_with("  1. "));
}

#[tokio::test]
async fn test_config_masks_api_key() {
    let temp = TempDir::new().unwrap();
    let mut config = ReziConfig::default();
    config.storage.data_dir = Some(temp.path().join("data"));
    config.provider.api_key = Some("super-secret".to_string());
    let out = RunContext::from_config(config)
        .execute(&Commands::Config)
        .await
        .unwrap();
    assert!(!out.contains("super-secret"));
    assert!(out.contains("********"));
    assert!(out.contains("gemini-2.5-flash-image-preview"));
}

#[tokio::test]
async fn test_generate_without_api_key_fails_before_touching_credit() {
    let temp = TempDir::new().unwrap();
    let context = context_in(&temp);

    let err = context
        .execute(&Commands::Generate {
            childhood: PathBuf::from("kid.png"),
            current: PathBuf::from("now.png"),
            prompt: None,
            out: None,
            share: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReziError::Config(_)));
    assert!(!temp.path().join("downloads").exists());
}
