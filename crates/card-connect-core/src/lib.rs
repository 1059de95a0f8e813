#![warn(missing_docs)]
//! # card-connect-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `card-connect` workspace.
//!
//! ## Responsibilities
//! - Represent the selected card image and validate it before upload.
//! - Represent extracted contact fields and their pixel-space bounding boxes.
//! - Represent the outbound message draft and the sender identity.
//! - Encode/decode the wire bodies of the extraction and delivery services.
//!
//! ## Data flow
//! A file selection becomes a [`CardImage`] once [`validate_image`] accepts it.
//! The extraction service answers with an [`UploadCardResponse`], normalized
//! into an [`ExtractionResult`] holding [`ExtractedFields`] and
//! [`BoundingBoxes`]. Sends are described by [`SendEmailRequest`].
//!
//! ## Ownership and lifetimes
//! Images and results own their buffers (`Vec<u8>`, `String`) so that values
//! can cross async task boundaries without borrowing from the caller.
//!
//! ## Error model
//! Pre-upload checks return [`ValidationError`]; wire decoding returns
//! [`CoreError`].
//!
//! ## Security and privacy notes
//! Card bytes are identified in logs only through [`CardImage::fingerprint`].
//!
//! ## Example
//! ```rust
//! use card_connect_core::{validate_image, ImageKind, MAX_IMAGE_BYTES};
//!
//! let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
//! assert_eq!(validate_image(&png, MAX_IMAGE_BYTES).unwrap(), ImageKind::Png);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Upper bound for an uploadable card image (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Display sentinel for a field the service did not return.
pub const NOT_AVAILABLE: &str = "N/A";

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Image encodings accepted by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
}

impl ImageKind {
    /// Detects the encoding from leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(&JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// MIME type sent with the multipart upload.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Checks that `bytes` is a non-empty PNG/JPEG no larger than `max_bytes`.
///
/// # Errors
/// Returns the first [`ValidationError`] that applies, size first.
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<ImageKind, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ValidationError::TooLarge {
            limit: max_bytes,
            actual: bytes.len(),
        });
    }
    ImageKind::detect(bytes).ok_or(ValidationError::UnsupportedType)
}

/// A validated card image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    /// Original file name, forwarded as the multipart file name.
    pub file_name: String,
    /// Detected encoding.
    pub kind: ImageKind,
    /// Raw encoded bytes.
    pub bytes: Vec<u8>,
}

impl CardImage {
    /// Validates and wraps raw file bytes.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the bytes are empty, too large, or not
    /// PNG/JPEG.
    pub fn new(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        let kind = validate_image(&bytes, max_bytes)?;
        Ok(Self {
            file_name: file_name.into(),
            kind,
            bytes,
        })
    }

    /// Hex SHA-256 of the image bytes, truncated to 16 characters.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        let mut encoded = hex::encode(digest);
        encoded.truncate(16);
        encoded
    }
}

/// Pixel dimensions of an image, natural or displayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl ImageSize {
    /// Creates a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` when both dimensions are finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Contact field identifier used to key boxes and overlays.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKey {
    /// Contact name.
    Name,
    /// Job title.
    Title,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Company name.
    Company,
    /// Any key the service reports beyond the five known fields.
    Other(String),
}

impl FieldKey {
    /// The five known fields in display order.
    pub const KNOWN: [FieldKey; 5] = [
        FieldKey::Name,
        FieldKey::Title,
        FieldKey::Email,
        FieldKey::Phone,
        FieldKey::Company,
    ];

    /// Wire name of the key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name => "name",
            Self::Title => "title",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for FieldKey {
    fn from(raw: &str) -> Self {
        match raw {
            "name" => Self::Name,
            "title" => Self::Title,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "company" => Self::Company,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldKey {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact fields extracted from one card.
///
/// Blank values are normalized to `None` on construction, so `Some` always
/// carries visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Contact name.
    pub name: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Email address (the delivery recipient).
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Company name.
    pub company: Option<String>,
}

impl ExtractedFields {
    /// Builds fields from possibly blank raw values.
    pub fn normalized(raw: RawExtractedData) -> Self {
        Self {
            name: non_blank(raw.name),
            title: non_blank(raw.title),
            email: non_blank(raw.email),
            phone: non_blank(raw.phone),
            company: non_blank(raw.company),
        }
    }

    /// Returns the value for a known key; `None` for absent or unknown keys.
    pub fn get(&self, key: &FieldKey) -> Option<&str> {
        let value = match key {
            FieldKey::Name => &self.name,
            FieldKey::Title => &self.title,
            FieldKey::Email => &self.email,
            FieldKey::Phone => &self.phone,
            FieldKey::Company => &self.company,
            FieldKey::Other(_) => return None,
        };
        value.as_deref()
    }

    /// Returns the display value, falling back to [`NOT_AVAILABLE`].
    pub fn display_value(&self, key: &FieldKey) -> &str {
        self.get(key).unwrap_or(NOT_AVAILABLE)
    }

    /// Returns `true` when no field carries a value.
    pub fn is_empty(&self) -> bool {
        FieldKey::KNOWN.iter().all(|key| self.get(key).is_none())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Pixel-space rectangle locating where a field was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Field the box belongs to.
    pub key: FieldKey,
    /// Left edge in source pixels.
    pub x: f64,
    /// Top edge in source pixels.
    pub y: f64,
    /// Width in source pixels.
    pub width: f64,
    /// Height in source pixels.
    pub height: f64,
}

/// At most one box per field key.
pub type BoundingBoxes = BTreeMap<FieldKey, BoundingBox>;

/// Normalized result of one successful extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    /// Extracted contact fields.
    pub fields: ExtractedFields,
    /// Bounding boxes keyed by field.
    pub boxes: BoundingBoxes,
    /// Full OCR text, when the service includes it.
    pub raw_text: Option<String>,
    /// Storage URL of the uploaded image, when the service includes it.
    pub stored_url: Option<String>,
}

/// Outbound channel selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Email, delivered through the `/send-email` endpoint.
    #[default]
    Email,
    /// WhatsApp; selectable but not wired to any endpoint.
    WhatsApp,
}

impl Channel {
    /// Label used on selectors and the send action.
    pub fn label(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::WhatsApp => "WhatsApp",
        }
    }

    /// Returns `true` when a live delivery endpoint backs the channel.
    pub fn is_wired(self) -> bool {
        matches!(self, Self::Email)
    }
}

/// How the message body is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Derived from extracted fields; read-only.
    #[default]
    Personalized,
    /// Freely edited by the user.
    Custom,
}

/// Outbound message being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDraft {
    /// Selected channel.
    pub channel: Channel,
    /// Selected message kind.
    pub kind: MessageKind,
    /// Current body text.
    pub content: String,
}

/// User-supplied reply-to address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderIdentity {
    /// Email typed by the user, as entered.
    pub email: String,
}

impl SenderIdentity {
    /// Returns the trimmed email when it is non-empty.
    pub fn usable_email(&self) -> Option<&str> {
        let trimmed = self.email.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Raw `extracted_data` object as sent by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtractedData {
    /// Contact name.
    #[serde(default)]
    pub name: Option<String>,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
}

/// Raw box geometry as sent by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Success body of `POST /upload-card`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadCardResponse {
    /// Extracted contact values.
    pub extracted_data: RawExtractedData,
    /// Per-field boxes; `null` entries mean no region was found.
    #[serde(default)]
    pub boxes: BTreeMap<String, Option<RawBox>>,
    /// Service status marker.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable service message.
    #[serde(default)]
    pub message: Option<String>,
    /// Storage URL of the uploaded image.
    #[serde(default)]
    pub gcp_url: Option<String>,
    /// Full OCR text.
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl UploadCardResponse {
    /// Decodes a response body.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when the body is not valid JSON of the
    /// expected shape.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }

    /// Converts the wire body into an [`ExtractionResult`].
    ///
    /// `null` boxes are dropped. Duplicate keys have already collapsed to the
    /// last occurrence during decoding.
    pub fn into_result(self) -> ExtractionResult {
        let boxes = self
            .boxes
            .into_iter()
            .filter_map(|(raw_key, geometry)| {
                let geometry = geometry?;
                let key = FieldKey::from(raw_key);
                Some((
                    key.clone(),
                    BoundingBox {
                        key,
                        x: geometry.x,
                        y: geometry.y,
                        width: geometry.width,
                        height: geometry.height,
                    },
                ))
            })
            .collect();

        ExtractionResult {
            fields: ExtractedFields::normalized(self.extracted_data),
            boxes,
            raw_text: self.raw_text,
            stored_url: self.gcp_url,
        }
    }
}

/// Body of `POST /send-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    /// Reply-to address supplied by the user.
    pub sender_email: String,
    /// Recipient taken from the extracted email field.
    pub receiver_email: String,
    /// Greeting name for the recipient.
    pub name: String,
}

impl SendEmailRequest {
    /// Serializes the request to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }
}

/// Success body of `POST /send-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailResponse {
    /// Opaque delivery code; numeric codes are kept as their decimal text.
    #[serde(deserialize_with = "deserialize_code")]
    pub code: String,
}

/// Error body shared by both services on non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    /// Primary error text.
    #[serde(default)]
    pub error: Option<String>,
    /// Additional detail, when provided.
    #[serde(default)]
    pub details: Option<String>,
}

impl ServiceErrorBody {
    /// Best-effort decode; non-JSON bodies yield an empty value.
    pub fn parse_lenient(raw: &[u8]) -> Self {
        serde_json::from_slice(raw).unwrap_or_default()
    }
}

/// Status and body of one HTTP exchange, as seen by the service clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Creates a reply from a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Resolves `path` against a service base URL.
///
/// The base is treated as a directory, so `http://host/api` and
/// `http://host/api/` both resolve `upload-card` to `http://host/api/upload-card`.
///
/// # Errors
/// Returns [`CoreError::InvalidEndpoint`] when the base does not parse or is
/// not http(s).
pub fn join_endpoint(base: &str, path: &str) -> Result<Url, CoreError> {
    let mut parsed = Url::parse(base)
        .map_err(|error| CoreError::InvalidEndpoint(format!("invalid service url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidEndpoint(
            "service url must use http or https".to_string(),
        ));
    }

    if !parsed.path().ends_with('/') {
        let directory = format!("{}/", parsed.path());
        parsed.set_path(&directory);
    }

    parsed
        .join(path.trim_start_matches('/'))
        .map_err(|error| CoreError::InvalidEndpoint(format!("invalid endpoint path: {error}")))
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Text(text) => text,
        RawCode::Number(number) => number.to_string(),
    })
}

/// Rejection reasons for a selected file, raised before any upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The selected file has no bytes.
    #[error("selected file is empty")]
    Empty,
    /// The file is not PNG or JPEG.
    #[error("unsupported image type: only PNG and JPEG are accepted")]
    UnsupportedType,
    /// The file exceeds the upload limit.
    #[error("image is too large: {actual} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Configured byte limit.
        limit: usize,
        /// Actual file size.
        actual: usize,
    },
}

/// Error type for core codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON encoding/decoding error.
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Service base URL or endpoint path is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
