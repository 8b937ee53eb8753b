//! Image ingestion
//!
//! Picker and drag-and-drop input both become a [`FileSelection`] and go through
//! [`ImageSlot::ingest`], the single ingestion path. A slot owns the current
//! [`EncodedImage`] and a [`PreviewHandle`]; replacing or clearing the image
//! drops the previous handle, which releases it from the [`PreviewRegistry`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::encoded_image::{media_type_for_path, EncodedImage};
use crate::error::ReziError;

/// Where a selection came from. Informational only; both take the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Picker,
    Drop,
}

/// A "file selected" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub path: Option<PathBuf>,
    pub source: SelectionSource,
}

impl FileSelection {
    /// Picker result. `None` means the user closed the picker without a file.
    pub fn from_picker(path: Option<PathBuf>) -> Self {
        Self {
            path,
            source: SelectionSource::Picker,
        }
    }

    /// Dropped files. Only the first one is used; an empty drop yields no event.
    pub fn from_drop<I>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        paths.into_iter().next().map(|path| Self {
            path: Some(path),
            source: SelectionSource::Drop,
        })
    }
}

/// Read a file and encode it for transport.
pub async fn read_encoded(path: &Path) -> Result<EncodedImage, ReziError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReziError::ImageReadFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let image = EncodedImage::from_bytes(&bytes, media_type_for_path(path));
    if !image.is_accepted_type() {
        debug!(
            path = %path.display(),
            media_type = image.media_type(),
            "Ingesting file outside the advertised image types"
        );
    }
    Ok(image)
}

#[derive(Default)]
struct RegistryInner {
    live: HashMap<u64, PathBuf>,
}

/// Tracks preview handles that are still displayed.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    next_id: Arc<AtomicU64>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a preview handle for a file. It stays live until dropped.
    pub fn create(&self, path: &Path) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.lock().live.insert(id, path.to_path_buf());
        PreviewHandle {
            id,
            source: path.to_path_buf(),
            registry: self.clone(),
        }
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.inner.lock().live.contains_key(&id)
    }

    fn release(&self, id: u64) {
        self.inner.lock().live.remove(&id);
    }
}

/// Revocable reference used to display an uploaded file.
pub struct PreviewHandle {
    id: u64,
    source: PathBuf,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// One upload control: the current image and its preview.
pub struct ImageSlot {
    title: String,
    image: Option<EncodedImage>,
    preview: Option<PreviewHandle>,
    previews: PreviewRegistry,
}

impl ImageSlot {
    pub fn new(title: impl Into<String>, previews: PreviewRegistry) -> Self {
        Self {
            title: title.into(),
            image: None,
            preview: None,
            previews,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    /// Apply a selection. A missing file or a read failure leaves the slot empty.
    pub async fn ingest(&mut self, selection: FileSelection) -> Option<&EncodedImage> {
        let Some(path) = selection.path else {
            self.clear();
            return None;
        };

        match read_encoded(&path).await {
            Ok(image) => {
                debug!(
                    slot = %self.title,
                    path = %path.display(),
                    source = ?selection.source,
                    media_type = image.media_type(),
                    "Image ingested"
                );
                self.image = Some(image);
                self.preview = Some(self.previews.create(&path));
                self.image.as_ref()
            }
            Err(e) => {
                warn!(slot = %self.title, error = %e, "Error reading file");
                self.clear();
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.image = None;
        self.preview = None;
    }
}
