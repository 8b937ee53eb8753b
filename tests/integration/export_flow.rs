//! Integration tests for downloading and sharing a generated image

use std::time::Duration;

use rezi::error::SHARE_FAILED_MESSAGE;
use rezi::exporter::{ShareOutcome, ShareStatus, SHARE_TEXT, SHARE_TITLE};
use rezi::{EncodedImage, ReziError};
use tempfile::TempDir;

use crate::integration::test_utils::{app_with_photos, Harness, ScriptedGenerator, SheetBehaviour};

fn webp_result() -> EncodedImage {
    EncodedImage::from_bytes(b"webp-bytes", "image/webp")
}

#[tokio::test]
async fn test_download_names_file_after_media_type() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()));
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    assert!(app.download());
    let saved = harness.saver.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].filename, "rezi-memory.webp");
    assert!(saved[0].href.starts_with("data:image/webp;base64,"));
    assert_eq!(app.download_name().as_deref(), Some("rezi-memory.webp"));
}

#[tokio::test]
async fn test_download_falls_back_to_png_extension() {
    let temp = TempDir::new().unwrap();
    let odd = EncodedImage::new("aGVsbG8=", "garbage");
    let harness = Harness::new(ScriptedGenerator::succeeding(odd));
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    assert!(app.download());
    assert_eq!(harness.saver.saved()[0].filename, "rezi-memory.png");
}

#[tokio::test]
async fn test_download_without_result_does_nothing() {
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()));
    let app = harness.app();
    assert!(!app.download());
    assert!(harness.saver.saved().is_empty());
}

#[tokio::test]
async fn test_directory_saver_writes_decoded_bytes() {
    use rezi::exporter::{DirectorySaver, FileSaver, SaveAnchor};

    let temp = TempDir::new().unwrap();
    let saver = DirectorySaver::new(temp.path().join("downloads"));
    let anchor = SaveAnchor::for_image(&webp_result(), "rezi-memory");
    saver.save(&anchor).unwrap();
    saver.save(&anchor).unwrap();

    let written = std::fs::read(temp.path().join("downloads").join("rezi-memory.webp")).unwrap();
    assert_eq!(written, b"webp-bytes");
}

#[tokio::test]
async fn test_share_sheet_receives_title_text_and_file() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()))
        .with_sheet(SheetBehaviour::Accepts)
        .with_clipboard(true);
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    assert_eq!(app.share().await.unwrap(), ShareOutcome::Shared);
    let shared = harness.sheet.shared();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].title, SHARE_TITLE);
    assert_eq!(shared[0].text, SHARE_TEXT);
    assert_eq!(shared[0].files[0].name, "rezi-memory.webp");
    assert_eq!(shared[0].files[0].media_type, "image/webp");
    assert_eq!(shared[0].files[0].bytes, b"webp-bytes");
    assert!(harness.clipboard.writes().is_empty());
    assert_eq!(app.share_status(), ShareStatus::Idle);
}

#[tokio::test]
async fn test_dismissed_share_sheet_is_silent() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()))
        .with_sheet(SheetBehaviour::Dismissed)
        .with_clipboard(true);
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    assert_eq!(app.share().await.unwrap(), ShareOutcome::Cancelled);
    assert!(app.error().is_none());
    assert!(harness.clipboard.writes().is_empty());
}

#[tokio::test]
async fn test_failed_share_sheet_shows_share_message() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()))
        .with_sheet(SheetBehaviour::Fails);
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    let err = app.share().await.unwrap_err();
    assert!(matches!(err, ReziError::ShareFailed(_)));
    assert_eq!(app.error(), Some(SHARE_FAILED_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn test_clipboard_fallback_shows_copied_then_resets() {
    let temp = TempDir::new().unwrap();
    let harness =
        Harness::new(ScriptedGenerator::succeeding(webp_result())).with_clipboard(true);
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    assert_eq!(app.share().await.unwrap(), ShareOutcome::Copied);
    assert_eq!(harness.clipboard.writes()[0].media_type, "image/webp");
    assert_eq!(app.share_status(), ShareStatus::Copied);
    assert!(!app.is_share_enabled());

    tokio::time::sleep(Duration::from_millis(2_499)).await;
    assert_eq!(app.share_status(), ShareStatus::Copied);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(app.share_status(), ShareStatus::Idle);
    assert!(app.is_share_enabled());
}

#[tokio::test]
async fn test_share_without_any_mechanism_is_unsupported() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result()));
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.generate().await.unwrap();

    let err = app.share().await.unwrap_err();
    assert!(matches!(err, ReziError::ShareUnsupported));
    assert_eq!(
        app.error(),
        Some("Sharing is not supported on your browser. Please download the image.")
    );
}

#[tokio::test]
async fn test_share_before_generation_has_nothing_to_share() {
    let harness = Harness::new(ScriptedGenerator::succeeding(webp_result())).with_clipboard(true);
    let mut app = harness.app();
    assert!(!app.is_share_enabled());
    assert!(matches!(
        app.share().await.unwrap_err(),
        ReziError::NoResult
    ));
    assert!(app.error().is_none());
}
