//! Integration tests for the generate workflow of the application model

use std::sync::Arc;
use std::time::Duration;

use rezi::error::UNEXPECTED_ERROR_MESSAGE;
use rezi::ingestion::FileSelection;
use rezi::ledger::{MemoryCreditStore, CREDITS_KEY};
use rezi::{EncodedImage, ReziError, RequestLifecycleState};
use tempfile::TempDir;

use crate::integration::test_utils::{app_with_photos, write_photo, Harness, ScriptedGenerator};

fn generated() -> EncodedImage {
    EncodedImage::new("R0VORVJBVEVE", "image/png")
}

#[tokio::test]
async fn test_successful_generation_debits_and_shows_result() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.set_prompt("Playing in a sunny meadow");

    assert_eq!(app.credits(), 100);
    assert!(app.can_generate());

    let shown = app.generate().await.unwrap().clone();
    assert_eq!(shown, generated());
    assert_eq!(app.result(), Some(&generated()));
    assert_eq!(app.credits(), 90);
    assert_eq!(harness.store.raw(CREDITS_KEY).as_deref(), Some("90"));
    assert_eq!(app.lifecycle(), RequestLifecycleState::Succeeded);
    assert!(app.error().is_none());
    assert_eq!(harness.generator.calls(), 1);

    let request = harness.generator.last_request().unwrap();
    assert_eq!(request.prompt, "Playing in a sunny meadow");
    assert_eq!(request.childhood_image.media_type(), "image/png");
    assert_eq!(request.current_image.media_type(), "image/jpeg");
    assert_eq!(request.childhood_image.decode().unwrap(), b"childhood-bytes");
}

#[tokio::test]
async fn test_default_prompt_is_sent_when_untouched() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;

    app.generate().await.unwrap();
    let request = harness.generator.last_request().unwrap();
    assert_eq!(request.prompt, "Create a nostalgic, dreamlike scene.");
}

#[tokio::test]
async fn test_insufficient_credit_never_contacts_the_service() {
    let temp = TempDir::new().unwrap();
    let store = MemoryCreditStore::with_value(CREDITS_KEY, "5");
    let harness = Harness::with_store(store, ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;

    assert!(!app.can_generate());
    let err = app.generate().await.unwrap_err();
    assert!(matches!(
        err,
        ReziError::InsufficientCredit {
            balance: 5,
            required: 10
        }
    ));
    assert_eq!(
        app.error(),
        Some("You do not have enough credits to generate an image.")
    );
    assert_eq!(app.credits(), 5);
    assert_eq!(app.lifecycle(), RequestLifecycleState::Idle);
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn test_missing_photo_is_reported_before_credit() {
    let temp = TempDir::new().unwrap();
    let store = MemoryCreditStore::with_value(CREDITS_KEY, "0");
    let harness = Harness::with_store(store, ScriptedGenerator::succeeding(generated()));
    let mut app = harness.app();
    let childhood = write_photo(temp.path(), "kid.png", b"kid");
    app.select_childhood(FileSelection::from_picker(Some(childhood)))
        .await;

    let err = app.generate().await.unwrap_err();
    assert!(matches!(err, ReziError::MissingInput));
    assert_eq!(
        app.error(),
        Some("Please upload both images and provide a prompt.")
    );
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn test_blank_prompt_counts_as_missing() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;
    app.set_prompt("   ");

    assert!(!app.can_generate());
    assert!(matches!(
        app.generate().await.unwrap_err(),
        ReziError::MissingInput
    ));
    assert_eq!(app.credits(), 100);
}

#[tokio::test]
async fn test_service_failure_keeps_credit_and_clears_result() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::failing("Quota exceeded"));
    let mut app = app_with_photos(&harness, temp.path()).await;

    let err = app.generate().await.unwrap_err();
    assert!(matches!(err, ReziError::GenerationServiceFailure(_)));
    assert_eq!(app.error(), Some("Quota exceeded"));
    assert_eq!(app.credits(), 100);
    assert_eq!(app.lifecycle(), RequestLifecycleState::Failed);
    assert!(app.result().is_none());
    assert!(app.can_generate(), "a failed attempt can be retried");
}

#[tokio::test]
async fn test_silent_service_failure_uses_generic_message() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::failing(""));
    let mut app = app_with_photos(&harness, temp.path()).await;

    app.generate().await.unwrap_err();
    assert_eq!(app.error(), Some(UNEXPECTED_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_new_attempt_clears_previous_error() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;

    app.set_prompt("");
    app.generate().await.unwrap_err();
    assert!(app.error().is_some());

    app.set_prompt("At the beach");
    app.generate().await.unwrap();
    assert!(app.error().is_none());
}

#[tokio::test]
async fn test_ten_generations_drain_the_balance() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(ScriptedGenerator::succeeding(generated()));
    let mut app = app_with_photos(&harness, temp.path()).await;

    for expected in (0..10).rev() {
        app.generate().await.unwrap();
        assert_eq!(app.credits(), expected * 10);
    }
    assert!(!app.can_generate());
    assert!(matches!(
        app.generate().await.unwrap_err(),
        ReziError::InsufficientCredit { .. }
    ));
    assert_eq!(harness.generator.calls(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_facts_rotate_while_in_flight() {
    let temp = TempDir::new().unwrap();
    let generator =
        ScriptedGenerator::succeeding(generated()).with_delay(Duration::from_millis(9_000));
    let harness = Harness::new(generator);
    let mut app = app_with_photos(&harness, temp.path()).await;

    let mut updates = app.progress_updates();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorder = {
        let seen = Arc::clone(&seen);
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let index = *updates.borrow_and_update();
                seen.lock().push(index);
            }
        })
    };

    app.generate().await.unwrap();
    tokio::task::yield_now().await;
    recorder.abort();

    assert_eq!(*seen.lock(), vec![0, 1, 2]);
    assert_eq!(app.lifecycle(), RequestLifecycleState::Succeeded);
    let index_after = *app.progress_updates().borrow();

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(
        *app.progress_updates().borrow(),
        index_after,
        "no fact changes once the attempt has resolved"
    );
}
