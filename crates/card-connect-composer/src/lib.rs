#![warn(missing_docs)]
//! # card-connect-composer
//!
//! ## Purpose
//! Derives and tracks the outbound message body.
//!
//! ## Responsibilities
//! - Render the personalized template from extracted fields.
//! - Apply the recompute rule on kind switches and field replacement.
//! - Keep custom drafts under exclusive user control.
//!
//! ## Data flow
//! Controller transitions call [`MessageComposer::on_fields_changed`] and
//! [`MessageComposer::set_kind`]; the user edits through
//! [`MessageComposer::edit_content`]; presentation reads
//! [`MessageComposer::draft`].
//!
//! ## Error model
//! Editing a personalized (read-only) body returns [`ComposeError`].
//!
//! ## Example
//! ```rust
//! use card_connect_composer::derive_personalized;
//! use card_connect_core::ExtractedFields;
//!
//! let text = derive_personalized(&ExtractedFields::default());
//! assert!(text.starts_with("Hello there,"));
//! ```

use card_connect_core::{Channel, ExtractedFields, MessageDraft, MessageKind};
use thiserror::Error;

const NAME_FALLBACK: &str = "there";

/// Renders the personalized greeting for `fields`.
///
/// Missing values use template fallbacks (`there` for the name, empty text
/// otherwise), never the display sentinel.
pub fn derive_personalized(fields: &ExtractedFields) -> String {
    let name = fields.name.as_deref().unwrap_or(NAME_FALLBACK);
    let company = fields.company.as_deref().unwrap_or_default();
    let title = fields.title.as_deref().unwrap_or_default();

    format!(
        "Hello {name}, I recently digitized your business card from {company}. \
         I was impressed by your role as {title}. I'd love to connect."
    )
}

/// Greeting name sent with a delivery request.
pub fn greeting_name(fields: &ExtractedFields) -> &str {
    fields.name.as_deref().unwrap_or(NAME_FALLBACK)
}

/// Owns the message draft and its derivation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageComposer {
    draft: MessageDraft,
}

impl MessageComposer {
    /// Creates a personalized email draft derived from `fields`.
    pub fn new(fields: &ExtractedFields) -> Self {
        Self {
            draft: MessageDraft {
                channel: Channel::Email,
                kind: MessageKind::Personalized,
                content: derive_personalized(fields),
            },
        }
    }

    /// Current draft snapshot.
    pub fn draft(&self) -> &MessageDraft {
        &self.draft
    }

    /// Selects the outbound channel. Content is unaffected.
    pub fn set_channel(&mut self, channel: Channel) {
        self.draft.channel = channel;
    }

    /// Selects the message kind.
    ///
    /// Becoming personalized overwrites the content from `fields`, discarding
    /// any custom text. Becoming custom keeps the current content as the
    /// starting point for edits. Returns `true` when the content changed.
    pub fn set_kind(&mut self, kind: MessageKind, fields: &ExtractedFields) -> bool {
        let became_personalized =
            kind == MessageKind::Personalized && self.draft.kind != MessageKind::Personalized;
        self.draft.kind = kind;

        if became_personalized {
            return self.regenerate(fields);
        }
        false
    }

    /// Applies a wholesale field replacement. Returns `true` when the content
    /// changed.
    pub fn on_fields_changed(&mut self, fields: &ExtractedFields) -> bool {
        match self.draft.kind {
            MessageKind::Personalized => self.regenerate(fields),
            MessageKind::Custom => false,
        }
    }

    /// Replaces the body with user text.
    ///
    /// # Errors
    /// Returns [`ComposeError::ReadOnly`] while the draft is personalized.
    pub fn edit_content(&mut self, content: impl Into<String>) -> Result<(), ComposeError> {
        if self.draft.kind == MessageKind::Personalized {
            return Err(ComposeError::ReadOnly);
        }
        self.draft.content = content.into();
        Ok(())
    }

    fn regenerate(&mut self, fields: &ExtractedFields) -> bool {
        let content = derive_personalized(fields);
        if content == self.draft.content {
            return false;
        }
        self.draft.content = content;
        true
    }
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new(&ExtractedFields::default())
    }
}

/// Composer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// The body is derived and cannot be edited directly.
    #[error("personalized messages are generated and cannot be edited; switch to a custom draft")]
    ReadOnly,
}

#[cfg(test)]
mod tests {
    //! Unit tests for template rendering and draft transitions.

    use super::*;

    fn jane() -> ExtractedFields {
        ExtractedFields {
            name: Some("Jane Doe".to_string()),
            title: Some("CEO".to_string()),
            email: Some("jane@acme.com".to_string()),
            phone: Some("555-1212".to_string()),
            company: Some("Acme".to_string()),
        }
    }

    #[test]
    fn renders_full_template() {
        assert_eq!(
            derive_personalized(&jane()),
            "Hello Jane Doe, I recently digitized your business card from Acme. \
             I was impressed by your role as CEO. I'd love to connect."
        );
    }

    #[test]
    fn missing_fields_use_template_fallbacks() {
        let text = derive_personalized(&ExtractedFields::default());
        assert_eq!(
            text,
            "Hello there, I recently digitized your business card from . \
             I was impressed by your role as . I'd love to connect."
        );
        assert!(!text.contains("N/A"));
    }

    #[test]
    fn custom_draft_survives_field_replacement() {
        let mut composer = MessageComposer::new(&ExtractedFields::default());
        composer.set_kind(MessageKind::Custom, &ExtractedFields::default());
        composer
            .edit_content("See you at the expo")
            .expect("custom drafts are editable");

        assert!(!composer.on_fields_changed(&jane()));
        assert_eq!(composer.draft().content, "See you at the expo");
    }

    #[test]
    fn switching_back_to_personalized_discards_custom_text() {
        let mut composer = MessageComposer::new(&jane());
        composer.set_kind(MessageKind::Custom, &jane());
        composer.edit_content("draft").expect("custom drafts are editable");

        assert!(composer.set_kind(MessageKind::Personalized, &jane()));
        assert_eq!(composer.draft().content, derive_personalized(&jane()));
    }

    #[test]
    fn personalized_body_is_read_only() {
        let mut composer = MessageComposer::default();
        assert_eq!(composer.edit_content("x"), Err(ComposeError::ReadOnly));
    }
}
