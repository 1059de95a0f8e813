#![warn(missing_docs)]
//! # card-connect-ui
//!
//! ## Purpose
//! Defines the UI-facing workflow status and the read-only view projected for
//! the presentation layer.
//!
//! ## Responsibilities
//! - Represent the single authoritative [`WorkflowStatus`] and its
//!   [`Failure`] reasons.
//! - Derive display strings: status line, stage badge, send label, field
//!   rows with the `N/A` fallback, body placeholder.
//!
//! ## Data flow
//! The workflow controller mutates its status through transitions and
//! projects a [`WorkflowView`] snapshot that the presentation renders as-is.
//!
//! ## Ownership and lifetimes
//! [`WorkflowView`] owns all of its strings so it can be handed to another
//! thread or serialized without borrowing controller state.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors: failures are
//! data ([`Failure`]) rendered into the status line.
//!
//! ## Security and privacy notes
//! The view carries only what the user already typed or was shown.

use card_connect_core::{
    Channel, ExtractedFields, FieldKey, MessageKind, NOT_AVAILABLE, ValidationError,
};
use card_connect_delivery::DeliveryError;
use card_connect_extraction::ExtractionError;
use card_connect_overlay::Annotation;

/// Top-level workflow status.
///
/// `Sent` and `Failed` are annotations on a ready workflow: the user may
/// upload or send again from either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// No card selected yet.
    Idle,
    /// An extraction request is in flight.
    Uploading,
    /// Fields are shown and a send may be attempted.
    Ready,
    /// A delivery request is in flight.
    Sending,
    /// The last send was accepted with this code.
    Sent {
        /// Delivery code from the service.
        code: String,
    },
    /// The last operation failed.
    Failed(Failure),
}

impl WorkflowStatus {
    /// Returns `true` while a network request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Uploading | Self::Sending)
    }

    /// Returns `true` for `Ready` and its `Sent`/`Failed` annotations.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready | Self::Sent { .. } | Self::Failed(_))
    }
}

/// Reasons surfaced to the user through the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The selected file was rejected before upload.
    Validation(ValidationError),
    /// The extraction request failed.
    Extraction(ExtractionError),
    /// No recipient email was extracted.
    NoRecipient,
    /// The user has not entered a sender email.
    NoSender,
    /// The selected channel has no delivery endpoint.
    ChannelUnavailable(Channel),
    /// Sending is disabled by configuration.
    DeliveryDisabled,
    /// The delivery request failed.
    Delivery(DeliveryError),
}

impl Failure {
    /// User-visible text for this failure.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::Extraction(error) => format!("Error uploading card: {error}"),
            Self::NoRecipient => "No recipient email found in extracted data.".to_string(),
            Self::NoSender => {
                "Please enter your email first (will be used as Reply-To).".to_string()
            }
            Self::ChannelUnavailable(channel) => {
                format!("{} delivery is not available yet.", channel.label())
            }
            Self::DeliveryDisabled => "Sending is disabled in this build.".to_string(),
            Self::Delivery(DeliveryError::Rejected(text)) => format!("Error: {text}"),
            Self::Delivery(DeliveryError::Malformed(text)) => {
                format!("Error: unreadable delivery response ({text})")
            }
            Self::Delivery(error) => format!("Fetch error: {error}"),
        }
    }
}

/// Status line text, or `None` when nothing should be shown.
pub fn status_line(status: &WorkflowStatus) -> Option<String> {
    match status {
        WorkflowStatus::Idle | WorkflowStatus::Ready => None,
        WorkflowStatus::Uploading => Some("Scanning card...".to_string()),
        WorkflowStatus::Sending => Some("Sending...".to_string()),
        WorkflowStatus::Sent { code } => Some(format!("Email sent successfully! ({code})")),
        WorkflowStatus::Failed(failure) => Some(failure.message()),
    }
}

/// Badge next to the extracted-fields heading.
pub fn stage_badge(has_card: bool, status: &WorkflowStatus) -> &'static str {
    if *status == WorkflowStatus::Uploading {
        "Processing"
    } else if has_card {
        "Extracted"
    } else {
        "Awaiting Card"
    }
}

/// Hint shown on the file picker.
pub fn upload_hint(has_card: bool) -> &'static str {
    if has_card {
        "Card uploaded. Click to change."
    } else {
        "Drag & drop image here, or click to select."
    }
}

/// Accepted-file note shown under the picker.
pub const UPLOAD_CONSTRAINTS: &str = "PNG, JPG up to 5MB";

/// Label of the send action: `Send {channel} to {first name}`.
pub fn send_label(channel: Channel, fields: &ExtractedFields) -> String {
    let recipient = fields
        .name
        .as_deref()
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("Recipient");
    format!("Send {} to {recipient}", channel.label())
}

/// Placeholder for the message body editor.
pub fn content_placeholder(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Personalized => "AI will generate a personalized message here...",
        MessageKind::Custom => "Write your custom message here...",
    }
}

/// One row in the extracted-fields panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Field the row shows.
    pub key: FieldKey,
    /// Row label.
    pub label: &'static str,
    /// Value, or the `N/A` sentinel.
    pub value: String,
}

/// Rows for the five known fields in display order.
pub fn field_rows(fields: &ExtractedFields) -> Vec<FieldRow> {
    FieldKey::KNOWN
        .into_iter()
        .map(|key| FieldRow {
            label: field_label(&key),
            value: fields.display_value(&key).to_string(),
            key,
        })
        .collect()
}

fn field_label(key: &FieldKey) -> &'static str {
    match key {
        FieldKey::Name => "Name",
        FieldKey::Title => "Title",
        FieldKey::Email => "Email",
        FieldKey::Phone => "Phone",
        FieldKey::Company => "Company",
        FieldKey::Other(_) => "Other",
    }
}

/// Read-only snapshot rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowView {
    /// Current status.
    pub status: WorkflowStatus,
    /// File picker hint.
    pub upload_hint: &'static str,
    /// Preview URI of the current card.
    pub preview_uri: Option<String>,
    /// Where the service stored the uploaded card, when it says.
    pub stored_url: Option<String>,
    /// Whether the scanning overlay covers the preview.
    pub show_loading_overlay: bool,
    /// Badge next to the fields heading.
    pub stage_badge: &'static str,
    /// Extracted field rows.
    pub fields: Vec<FieldRow>,
    /// Overlay annotations over the preview.
    pub annotations: Vec<Annotation>,
    /// Selected channel.
    pub channel: Channel,
    /// Selected message kind.
    pub kind: MessageKind,
    /// Message body.
    pub content: String,
    /// Whether the body editor is read-only.
    pub content_read_only: bool,
    /// Body placeholder.
    pub content_placeholder: &'static str,
    /// Sender email as typed.
    pub sender_email: String,
    /// Send action label.
    pub send_label: String,
    /// Status line, when one applies.
    pub status_line: Option<String>,
}

impl WorkflowView {
    /// Value of a field row; [`NOT_AVAILABLE`] when the key has no row.
    pub fn field_value(&self, key: &FieldKey) -> &str {
        self.fields
            .iter()
            .find(|row| row.key == *key)
            .map(|row| row.value.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }
}
