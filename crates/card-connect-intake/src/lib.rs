#![warn(missing_docs)]
//! # card-connect-intake
//!
//! ## Purpose
//! Turns a user file selection into the single live [`Card`] the workflow
//! operates on.
//!
//! ## Responsibilities
//! - Read selected files with the size limit enforced before the full read.
//! - Define a surface-agnostic preview trait that hands out display handles.
//! - Probe the natural pixel size of the card image for overlay mapping.
//! - Release the preview resource when a card is superseded.
//!
//! ## Data flow
//! File picker -> [`SelectedFile`] -> [`Card::capture`] validates bytes,
//! registers a preview with a [`PreviewSurface`] and probes the natural size
//! -> the workflow controller owns the [`Card`] until the next selection.
//!
//! ## Ownership and lifetimes
//! A [`Card`] owns its image bytes and its [`DisplayHandle`]. Dropping the
//! card releases the handle on the surface it came from, so replacing the
//! controller's card is enough to free the previous preview.
//!
//! ## Error model
//! Unreadable files and validation failures are reported as [`IntakeError`].
//!
//! ## Security and privacy notes
//! Previews live in memory only; nothing is written to disk.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use card_connect_core::{CardImage, ImageKind, ImageSize, ValidationError};
use image::{ImageFormat, ImageReader};
use thiserror::Error;

/// Raw file chosen by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name shown to the user and forwarded to the service.
    pub file_name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Creates a selection from in-memory bytes.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Reads a file from disk, refusing files larger than `max_bytes`.
///
/// # Errors
/// Returns [`IntakeError::Io`] when the file cannot be opened or read, and
/// [`IntakeError::Validation`] when its size exceeds `max_bytes`.
pub fn read_selected_file(path: &Path, max_bytes: usize) -> Result<SelectedFile, IntakeError> {
    let file = File::open(path)
        .map_err(|error| IntakeError::Io(format!("cannot open '{}': {error}", path.display())))?;
    let declared = file
        .metadata()
        .map_err(|error| IntakeError::Io(format!("cannot stat '{}': {error}", path.display())))?
        .len();

    if declared > max_bytes as u64 {
        return Err(IntakeError::Validation(ValidationError::TooLarge {
            limit: max_bytes,
            actual: usize::try_from(declared).unwrap_or(usize::MAX),
        }));
    }

    let mut bytes = Vec::with_capacity(declared as usize);
    // One byte past the limit is enough to detect a file that grew after stat.
    file.take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|error| IntakeError::Io(format!("cannot read '{}': {error}", path.display())))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "card".to_string());

    Ok(SelectedFile { file_name, bytes })
}

/// Opaque reference to a registered preview image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(u64);

impl DisplayHandle {
    /// Numeric handle id.
    pub fn id(self) -> u64 {
        self.0
    }

    /// URI form handed to the presentation layer.
    pub fn uri(self) -> String {
        format!("card-preview:{}", self.0)
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-preview:{}", self.0)
    }
}

/// Trait implemented by presentation surfaces that can show a card preview.
pub trait PreviewSurface: Send + Sync {
    /// Registers a preview for `image` and returns its handle.
    fn register(&self, image: &CardImage) -> DisplayHandle;

    /// Releases a previously registered handle. Unknown handles are ignored.
    fn release(&self, handle: DisplayHandle);
}

/// In-memory preview surface that tracks live handles.
#[derive(Debug, Default)]
pub struct InMemoryPreviewSurface {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, usize>>,
}

impl InMemoryPreviewSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of previews currently registered and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    /// Returns `true` when `handle` is still registered.
    pub fn is_live(&self, handle: DisplayHandle) -> bool {
        self.live
            .lock()
            .map(|live| live.contains_key(&handle.0))
            .unwrap_or(false)
    }
}

impl PreviewSurface for InMemoryPreviewSurface {
    fn register(&self, image: &CardImage) -> DisplayHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut live) = self.live.lock() {
            live.insert(id, image.bytes.len());
        }
        DisplayHandle(id)
    }

    fn release(&self, handle: DisplayHandle) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&handle.0);
        }
    }
}

/// The single live card: validated image plus its preview handle.
pub struct Card {
    image: CardImage,
    handle: DisplayHandle,
    natural_size: Option<ImageSize>,
    surface: Arc<dyn PreviewSurface>,
}

impl Card {
    /// Validates a selection, registers its preview, and probes its size.
    ///
    /// # Errors
    /// Returns [`IntakeError::Validation`] when the bytes are empty, larger
    /// than `max_bytes`, or not PNG/JPEG. Nothing is registered on error.
    pub fn capture(
        file: SelectedFile,
        surface: Arc<dyn PreviewSurface>,
        max_bytes: usize,
    ) -> Result<Self, IntakeError> {
        let image = CardImage::new(file.file_name, file.bytes, max_bytes)?;
        let natural_size = probe_natural_size(&image);
        let handle = surface.register(&image);

        Ok(Self {
            image,
            handle,
            natural_size,
            surface,
        })
    }

    /// Validated image bytes.
    pub fn image(&self) -> &CardImage {
        &self.image
    }

    /// Preview handle for the presentation layer.
    pub fn handle(&self) -> DisplayHandle {
        self.handle
    }

    /// Natural pixel size, when the header could be decoded.
    pub fn natural_size(&self) -> Option<ImageSize> {
        self.natural_size
    }

    /// Records a natural size reported later by the presentation layer.
    pub fn set_natural_size(&mut self, size: ImageSize) {
        self.natural_size = Some(size);
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("file_name", &self.image.file_name)
            .field("kind", &self.image.kind)
            .field("len", &self.image.bytes.len())
            .field("handle", &self.handle)
            .field("natural_size", &self.natural_size)
            .finish()
    }
}

impl Drop for Card {
    fn drop(&mut self) {
        self.surface.release(self.handle);
    }
}

/// Reads the pixel dimensions from the image header.
///
/// Returns `None` when the header cannot be decoded; overlays then stay
/// pending until a size is supplied.
pub fn probe_natural_size(image: &CardImage) -> Option<ImageSize> {
    let format = match image.kind {
        ImageKind::Png => ImageFormat::Png,
        ImageKind::Jpeg => ImageFormat::Jpeg,
    };
    let (width, height) = ImageReader::with_format(Cursor::new(&image.bytes), format)
        .into_dimensions()
        .ok()?;
    Some(ImageSize::new(f64::from(width), f64::from(height)))
}

/// Intake layer error type.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The selected bytes failed pre-upload validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The selected file could not be read.
    #[error("file read failure: {0}")]
    Io(String),
}
