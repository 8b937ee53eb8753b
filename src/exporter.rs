//! Result export: download and share
//!
//! Download hands a [`SaveAnchor`] (data URI plus suggested file name) to a
//! [`FileSaver`]. Share tries the platform share sheet, then the clipboard,
//! and otherwise reports that sharing is unsupported.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::encoded_image::EncodedImage;
use crate::error::ReziError;

pub const DOWNLOAD_PREFIX: &str = "rezi-memory";

pub const SHARE_TITLE: &str = "My REZI Memory";

pub const SHARE_TEXT: &str = "I created this beautiful image with REZI, bringing my past and present together. #REZI #InnerChild";

/// How long the share control shows "Copied!".
pub const SHARE_RESET_DELAY: Duration = Duration::from_millis(2500);

/// A save request: where the bytes come from and what to call the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveAnchor {
    pub href: String,
    pub filename: String,
}

impl SaveAnchor {
    pub fn for_image(image: &EncodedImage, prefix: &str) -> Self {
        Self {
            href: image.data_uri(),
            filename: format!("{}.{}", prefix, image.extension()),
        }
    }
}

/// Split `data:<mediaType>;base64,<payload>`.
pub fn parse_data_uri(href: &str) -> Option<EncodedImage> {
    let rest = href.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some(EncodedImage::new(payload, media_type))
}

pub trait FileSaver: Send + Sync {
    fn save(&self, anchor: &SaveAnchor) -> Result<(), ReziError>;
}

/// Saves into a fixed directory, overwriting any earlier file of the same name.
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_for(&self, anchor: &SaveAnchor) -> PathBuf {
        self.dir.join(&anchor.filename)
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, anchor: &SaveAnchor) -> Result<(), ReziError> {
        let image = parse_data_uri(&anchor.href)
            .ok_or_else(|| ReziError::Storage("Save target is not a base64 data URI".to_string()))?;
        let bytes = image.decode()?;
        std::fs::create_dir_all(&self.dir)?;
        let target = self.target_for(anchor);
        std::fs::write(&target, bytes)?;
        info!(path = %target.display(), "Image saved");
        Ok(())
    }
}

/// A file handed to the share sheet or the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub files: Vec<ShareFile>,
}

#[derive(Debug, Error)]
pub enum NativeShareError {
    /// The user dismissed the share sheet.
    #[error("Share cancelled")]
    Aborted,

    #[error("{0}")]
    Failed(String),
}

/// Platform share sheet.
#[async_trait]
pub trait NativeShare: Send + Sync {
    fn is_available(&self) -> bool;

    /// Whether the platform accepts this payload's files.
    fn can_share(&self, payload: &SharePayload) -> bool;

    async fn share(&self, payload: &SharePayload) -> Result<(), NativeShareError>;
}

/// Desktop terminals have no share sheet.
pub struct NoNativeShare;

#[async_trait]
impl NativeShare for NoNativeShare {
    fn is_available(&self) -> bool {
        false
    }

    fn can_share(&self, _payload: &SharePayload) -> bool {
        false
    }

    async fn share(&self, _payload: &SharePayload) -> Result<(), NativeShareError> {
        Err(NativeShareError::Failed("No share sheet on this platform".to_string()))
    }
}

/// System clipboard accepting image data.
#[async_trait]
pub trait ImageClipboard: Send + Sync {
    fn is_available(&self) -> bool;

    async fn write_image(&self, file: &ShareFile) -> Result<(), ReziError>;
}

pub struct NoClipboard;

#[async_trait]
impl ImageClipboard for NoClipboard {
    fn is_available(&self) -> bool {
        false
    }

    async fn write_image(&self, _file: &ShareFile) -> Result<(), ReziError> {
        Err(ReziError::ShareUnsupported)
    }
}

/// Clipboard backed by `arboard`. The encoded image is decoded to RGBA first.
#[cfg(feature = "clipboard")]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
#[async_trait]
impl ImageClipboard for SystemClipboard {
    fn is_available(&self) -> bool {
        true
    }

    async fn write_image(&self, file: &ShareFile) -> Result<(), ReziError> {
        let bytes = file.bytes.clone();
        tokio::task::spawn_blocking(move || -> Result<(), ReziError> {
            let decoded = ::image::load_from_memory(&bytes)
                .map_err(|e| ReziError::ShareFailed(format!("Could not decode image: {}", e)))?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| ReziError::ShareFailed(e.to_string()))?;
            clipboard
                .set_image(arboard::ImageData {
                    width: width as usize,
                    height: height as usize,
                    bytes: std::borrow::Cow::Owned(decoded.into_raw()),
                })
                .map_err(|e| ReziError::ShareFailed(e.to_string()))
        })
        .await
        .map_err(|e| ReziError::ShareFailed(e.to_string()))?
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Idle,
    Copied,
}

/// Share status with a timed reset back to idle.
///
/// Only one reset timer exists at a time; a new `copied` replaces the pending
/// timer and dropping the cell cancels it.
pub struct ShareStatusCell {
    status: Arc<watch::Sender<ShareStatus>>,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl ShareStatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ShareStatus::Idle);
        Self {
            status: Arc::new(tx),
            reset: Mutex::new(None),
        }
    }

    pub fn get(&self) -> ShareStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ShareStatus> {
        self.status.subscribe()
    }

    /// Switch to `copied` now and back to `idle` after `delay`. Needs a tokio runtime.
    pub fn mark_copied(&self, delay: Duration) {
        self.status.send_replace(ShareStatus::Copied);
        let status = Arc::clone(&self.status);
        let deadline = tokio::time::Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            status.send_replace(ShareStatus::Idle);
        });
        if let Some(previous) = self.reset.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Default for ShareStatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ShareStatusCell {
    fn drop(&mut self) {
        if let Some(handle) = self.reset.get_mut().take() {
            handle.abort();
        }
    }
}

/// How a share attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
    /// The user dismissed the share sheet; nothing is shown.
    Cancelled,
}

pub struct ResultExporter {
    saver: Arc<dyn FileSaver>,
    native: Arc<dyn NativeShare>,
    clipboard: Arc<dyn ImageClipboard>,
    status: ShareStatusCell,
    prefix: String,
    reset_delay: Duration,
}

impl ResultExporter {
    pub fn new(
        saver: Arc<dyn FileSaver>,
        native: Arc<dyn NativeShare>,
        clipboard: Arc<dyn ImageClipboard>,
    ) -> Self {
        Self {
            saver,
            native,
            clipboard,
            status: ShareStatusCell::new(),
            prefix: DOWNLOAD_PREFIX.to_string(),
            reset_delay: SHARE_RESET_DELAY,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    pub fn share_status(&self) -> ShareStatus {
        self.status.get()
    }

    pub fn subscribe_share_status(&self) -> watch::Receiver<ShareStatus> {
        self.status.subscribe()
    }

    /// The share control is disabled while "Copied!" is showing.
    pub fn is_share_enabled(&self) -> bool {
        self.share_status() == ShareStatus::Idle
    }

    pub fn file_name(&self, result: &EncodedImage) -> String {
        format!("{}.{}", self.prefix, result.extension())
    }

    /// Save the result without asking. Save failures are only logged.
    pub fn download(&self, result: &EncodedImage) {
        let anchor = SaveAnchor::for_image(result, &self.prefix);
        match self.saver.save(&anchor) {
            Ok(()) => debug!(filename = %anchor.filename, "Download triggered"),
            Err(e) => warn!(filename = %anchor.filename, error = %e, "Download failed"),
        }
    }

    pub fn share_payload(&self, result: &EncodedImage) -> Result<SharePayload, ReziError> {
        let bytes = result
            .decode()
            .map_err(|e| ReziError::ShareFailed(e.to_string()))?;
        Ok(SharePayload {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            files: vec![ShareFile {
                name: self.file_name(result),
                media_type: result.media_type().to_string(),
                bytes,
            }],
        })
    }

    /// Share sheet first, clipboard second, otherwise `ShareUnsupported`.
    pub async fn share(&self, result: &EncodedImage) -> Result<ShareOutcome, ReziError> {
        let payload = self.share_payload(result)?;

        if self.native.is_available() && self.native.can_share(&payload) {
            return match self.native.share(&payload).await {
                Ok(()) => {
                    info!("Shared through the platform share sheet");
                    Ok(ShareOutcome::Shared)
                }
                Err(NativeShareError::Aborted) => {
                    debug!("Share sheet dismissed");
                    Ok(ShareOutcome::Cancelled)
                }
                Err(NativeShareError::Failed(message)) => Err(ReziError::ShareFailed(message)),
            };
        }

        if self.clipboard.is_available() {
            let file = &payload.files[0];
            return match self.clipboard.write_image(file).await {
                Ok(()) => {
                    self.status.mark_copied(self.reset_delay);
                    info!(media_type = %file.media_type, "Image copied to clipboard");
                    Ok(ShareOutcome::Copied)
                }
                Err(e @ ReziError::ShareFailed(_)) => Err(e),
                Err(e) => Err(ReziError::ShareFailed(e.to_string())),
            };
        }

        Err(ReziError::ShareUnsupported)
    }
}
