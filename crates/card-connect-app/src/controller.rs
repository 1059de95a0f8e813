//! Single owner of workflow state and its transition functions.
//!
//! The controller is synchronous: network work happens elsewhere and reports
//! back through [`WorkflowController::on_extraction_complete`] and
//! [`WorkflowController::on_delivery_complete`] with the sequence number of
//! the request it answers. Only the latest issued request of each kind is
//! applied; anything older is discarded.

use std::sync::Arc;

use card_connect_composer::{ComposeError, MessageComposer, greeting_name};
use card_connect_core::{
    BoundingBoxes, CardImage, Channel, ExtractedFields, ExtractionResult, ImageSize,
    MessageDraft, MessageKind, SenderIdentity,
};
use card_connect_delivery::DeliveryOutcome;
use card_connect_extraction::ExtractionError;
use card_connect_intake::{Card, IntakeError, PreviewSurface, SelectedFile};
use card_connect_overlay::{Annotation, OverlayMapper};
use card_connect_ui::{
    Failure, WorkflowStatus, WorkflowView, content_placeholder, field_rows, send_label,
    stage_badge, status_line, upload_hint,
};
use thiserror::Error;

use crate::redact_email;

/// Controller settings taken from [`crate::AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Upper bound on selected image size.
    pub max_image_bytes: usize,
    /// Whether sends may reach the delivery service.
    pub delivery_enabled: bool,
}

/// Extraction work issued by [`WorkflowController::select_file`].
#[derive(Debug, Clone)]
pub struct ExtractionTicket {
    /// Sequence number to report back with the result.
    pub seq: u64,
    /// Image to upload.
    pub image: CardImage,
}

/// Delivery work issued by [`WorkflowController::request_send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTicket {
    /// Sequence number to report back with the outcome.
    pub seq: u64,
    /// Reply-to address.
    pub sender_email: String,
    /// Recipient address from the card.
    pub receiver_email: String,
    /// Greeting name.
    pub name: String,
}

/// Whether a completion was applied or discarded as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The completion answered the latest request and was applied.
    Applied,
    /// A newer request superseded this one; state is unchanged.
    Stale,
}

/// Owns every piece of mutable workflow state.
pub struct WorkflowController {
    settings: ControllerSettings,
    surface: Arc<dyn PreviewSurface>,
    card: Option<Card>,
    fields: ExtractedFields,
    boxes: BoundingBoxes,
    raw_text: Option<String>,
    stored_url: Option<String>,
    composer: MessageComposer,
    sender: SenderIdentity,
    status: WorkflowStatus,
    displayed_size: Option<ImageSize>,
    overlay: OverlayMapper,
    next_seq: u64,
    pending_extraction: Option<u64>,
    pending_delivery: Option<u64>,
}

impl WorkflowController {
    /// Creates an idle controller that registers previews on `surface`.
    pub fn new(surface: Arc<dyn PreviewSurface>, settings: ControllerSettings) -> Self {
        let fields = ExtractedFields::default();
        Self {
            settings,
            surface,
            card: None,
            composer: MessageComposer::new(&fields),
            fields,
            boxes: BoundingBoxes::new(),
            raw_text: None,
            stored_url: None,
            sender: SenderIdentity::default(),
            status: WorkflowStatus::Idle,
            displayed_size: None,
            overlay: OverlayMapper::default(),
            next_seq: 0,
            pending_extraction: None,
            pending_delivery: None,
        }
    }

    /// Replaces the overlay mapper.
    pub fn with_overlay(mut self, overlay: OverlayMapper) -> Self {
        self.overlay = overlay;
        self
    }

    /// Current status.
    pub fn status(&self) -> &WorkflowStatus {
        &self.status
    }

    /// Current card, if one was selected.
    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    /// Extracted fields of the current card.
    pub fn fields(&self) -> &ExtractedFields {
        &self.fields
    }

    /// Bounding boxes of the current card.
    pub fn boxes(&self) -> &BoundingBoxes {
        &self.boxes
    }

    /// Full OCR text returned with the last applied extraction.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    /// Storage URL returned with the last applied extraction.
    pub fn stored_url(&self) -> Option<&str> {
        self.stored_url.as_deref()
    }

    /// Current message draft.
    pub fn draft(&self) -> &MessageDraft {
        self.composer.draft()
    }

    /// Sender identity as typed.
    pub fn sender(&self) -> &SenderIdentity {
        &self.sender
    }

    /// Sequence number of the extraction still awaited, if any.
    pub fn pending_extraction(&self) -> Option<u64> {
        self.pending_extraction
    }

    /// Sequence number of the delivery still awaited, if any.
    pub fn pending_delivery(&self) -> Option<u64> {
        self.pending_delivery
    }

    /// Accepts a new file selection and issues an extraction request.
    ///
    /// Allowed from every state except `Sending`. Selecting while
    /// `Uploading` supersedes the in-flight request. The previous card and its
    /// preview are released, fields and boxes are cleared, and a personalized
    /// body is recomputed before the request is issued.
    ///
    /// # Errors
    /// - [`WorkflowError::DeliveryInFlight`] while a send is outstanding.
    /// - [`WorkflowError::Intake`] when the file fails validation. The status
    ///   becomes `Failed` unless an upload is in flight, in which case it is
    ///   left untouched and the existing card stays current.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<ExtractionTicket, WorkflowError> {
        if self.status == WorkflowStatus::Sending {
            return Err(WorkflowError::DeliveryInFlight);
        }

        let card = match Card::capture(file, self.surface.clone(), self.settings.max_image_bytes)
        {
            Ok(card) => card,
            Err(error) => {
                tracing::info!(stage = "intake", action = "reject", %error, "file rejected");
                if let (IntakeError::Validation(reason), false) =
                    (&error, self.status.is_in_flight())
                {
                    self.status = WorkflowStatus::Failed(Failure::Validation(reason.clone()));
                }
                return Err(WorkflowError::Intake(error));
            }
        };

        let image = card.image().clone();
        // Replacing the card drops the previous one, which releases its preview.
        self.card = Some(card);
        self.fields = ExtractedFields::default();
        self.boxes.clear();
        self.raw_text = None;
        self.stored_url = None;
        self.composer.on_fields_changed(&self.fields);

        let seq = self.issue_seq();
        if let Some(superseded) = self.pending_extraction.replace(seq) {
            tracing::debug!(stage = "extraction", seq = superseded, "upload superseded");
        }
        self.status = WorkflowStatus::Uploading;

        tracing::info!(
            stage = "extraction",
            action = "issue",
            seq,
            fingerprint = %image.fingerprint(),
            "upload issued"
        );
        Ok(ExtractionTicket { seq, image })
    }

    /// Applies the answer to an extraction request.
    ///
    /// Success stores fields and boxes, recomputes a personalized body, and
    /// moves to `Ready`. Failure moves to `Failed` with fields left empty.
    pub fn on_extraction_complete(
        &mut self,
        seq: u64,
        result: Result<ExtractionResult, ExtractionError>,
    ) -> Completion {
        if self.pending_extraction != Some(seq) {
            tracing::debug!(stage = "extraction", seq, "stale extraction discarded");
            return Completion::Stale;
        }
        self.pending_extraction = None;

        match result {
            Ok(result) => {
                tracing::info!(
                    stage = "extraction",
                    action = "apply",
                    seq,
                    boxes = result.boxes.len(),
                    has_email = result.fields.email.is_some(),
                    "extraction applied"
                );
                self.fields = result.fields;
                self.boxes = result.boxes;
                self.raw_text = result.raw_text;
                self.stored_url = result.stored_url;
                self.composer.on_fields_changed(&self.fields);
                self.status = WorkflowStatus::Ready;
            }
            Err(error) => {
                tracing::warn!(stage = "extraction", action = "fail", seq, %error, "extraction failed");
                self.status = WorkflowStatus::Failed(Failure::Extraction(error));
            }
        }
        Completion::Applied
    }

    /// Checks send preconditions and issues a delivery request.
    ///
    /// Precondition failures set `Failed` with the matching reason and make no
    /// network call.
    ///
    /// # Errors
    /// - [`WorkflowError::ExtractionInFlight`] / [`WorkflowError::DeliveryInFlight`]
    ///   while a request is outstanding; status is unchanged.
    /// - [`WorkflowError::Precondition`] for a disabled kill switch, an
    ///   unwired channel, a missing recipient, or a missing sender.
    pub fn request_send(&mut self) -> Result<DeliveryTicket, WorkflowError> {
        match self.status {
            WorkflowStatus::Uploading => return Err(WorkflowError::ExtractionInFlight),
            WorkflowStatus::Sending => return Err(WorkflowError::DeliveryInFlight),
            _ => {}
        }

        let channel = self.composer.draft().channel;
        if !self.settings.delivery_enabled {
            return Err(self.refuse(Failure::DeliveryDisabled));
        }
        if !channel.is_wired() {
            return Err(self.refuse(Failure::ChannelUnavailable(channel)));
        }
        let Some(receiver_email) = self.fields.email.clone() else {
            return Err(self.refuse(Failure::NoRecipient));
        };
        let Some(sender_email) = self.sender.usable_email().map(str::to_string) else {
            return Err(self.refuse(Failure::NoSender));
        };

        let seq = self.issue_seq();
        self.pending_delivery = Some(seq);
        self.status = WorkflowStatus::Sending;

        tracing::info!(
            stage = "delivery",
            action = "issue",
            seq,
            sender = %redact_email(&sender_email),
            receiver = %redact_email(&receiver_email),
            "send issued"
        );
        Ok(DeliveryTicket {
            seq,
            sender_email,
            receiver_email,
            name: greeting_name(&self.fields).to_string(),
        })
    }

    /// Applies the outcome of a delivery request.
    pub fn on_delivery_complete(&mut self, seq: u64, outcome: DeliveryOutcome) -> Completion {
        if self.pending_delivery != Some(seq) {
            tracing::debug!(stage = "delivery", seq, "stale delivery discarded");
            return Completion::Stale;
        }
        self.pending_delivery = None;

        self.status = match outcome {
            Ok(receipt) => {
                tracing::info!(stage = "delivery", action = "apply", seq, code = %receipt.code, "send accepted");
                WorkflowStatus::Sent { code: receipt.code }
            }
            Err(error) => {
                tracing::warn!(stage = "delivery", action = "fail", seq, %error, "send failed");
                WorkflowStatus::Failed(Failure::Delivery(error))
            }
        };
        Completion::Applied
    }

    /// Selects the outbound channel.
    ///
    /// # Errors
    /// Returns [`WorkflowError::ExtractionInFlight`] while uploading and
    /// [`WorkflowError::DeliveryInFlight`] while sending.
    pub fn set_channel(&mut self, channel: Channel) -> Result<(), WorkflowError> {
        self.ensure_editable()?;
        self.composer.set_channel(channel);
        Ok(())
    }

    /// Selects the message kind; becoming personalized recomputes the body.
    ///
    /// # Errors
    /// Returns [`WorkflowError::ExtractionInFlight`] while uploading and
    /// [`WorkflowError::DeliveryInFlight`] while sending.
    pub fn set_kind(&mut self, kind: MessageKind) -> Result<(), WorkflowError> {
        self.ensure_editable()?;
        self.composer.set_kind(kind, &self.fields);
        Ok(())
    }

    /// Replaces a custom body.
    ///
    /// # Errors
    /// - [`WorkflowError::ExtractionInFlight`] while uploading.
    /// - [`WorkflowError::DeliveryInFlight`] while sending.
    /// - [`WorkflowError::Compose`] when the body is personalized.
    pub fn edit_content(&mut self, content: impl Into<String>) -> Result<(), WorkflowError> {
        self.ensure_editable()?;
        self.composer.edit_content(content)?;
        Ok(())
    }

    /// Records the sender email as typed. Allowed in every state.
    pub fn set_sender_email(&mut self, email: impl Into<String>) {
        self.sender.email = email.into();
    }

    /// Records the size at which the preview is currently drawn.
    pub fn set_displayed_size(&mut self, size: ImageSize) {
        self.displayed_size = Some(size);
    }

    /// Records the natural size reported by the presentation layer.
    pub fn set_natural_size(&mut self, size: ImageSize) {
        if let Some(card) = self.card.as_mut() {
            card.set_natural_size(size);
        }
    }

    /// Overlay annotations for the current card and display size.
    pub fn annotations(&self) -> Vec<Annotation> {
        let natural = self.card.as_ref().and_then(Card::natural_size);
        self.overlay.map_all(&self.boxes, natural, self.displayed_size)
    }

    /// Read-only snapshot for the presentation layer.
    pub fn view(&self) -> WorkflowView {
        let has_card = self.card.is_some();
        let draft = self.composer.draft();
        WorkflowView {
            status: self.status.clone(),
            upload_hint: upload_hint(has_card),
            preview_uri: self.card.as_ref().map(|card| card.handle().uri()),
            stored_url: self.stored_url.clone(),
            show_loading_overlay: self.status == WorkflowStatus::Uploading,
            stage_badge: stage_badge(has_card, &self.status),
            fields: field_rows(&self.fields),
            annotations: self.annotations(),
            channel: draft.channel,
            kind: draft.kind,
            content: draft.content.clone(),
            content_read_only: draft.kind == MessageKind::Personalized,
            content_placeholder: content_placeholder(draft.kind),
            sender_email: self.sender.email.clone(),
            send_label: send_label(draft.channel, &self.fields),
            status_line: status_line(&self.status),
        }
    }

    fn issue_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn ensure_editable(&self) -> Result<(), WorkflowError> {
        match self.status {
            WorkflowStatus::Uploading => Err(WorkflowError::ExtractionInFlight),
            WorkflowStatus::Sending => Err(WorkflowError::DeliveryInFlight),
            _ => Ok(()),
        }
    }

    fn refuse(&mut self, failure: Failure) -> WorkflowError {
        tracing::info!(stage = "delivery", action = "refuse", reason = %failure.message(), "send refused");
        self.status = WorkflowStatus::Failed(failure.clone());
        WorkflowError::Precondition(failure)
    }
}

/// Transitions refused by the controller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The selected file was rejected.
    #[error(transparent)]
    Intake(#[from] IntakeError),
    /// A send is outstanding.
    #[error("a message is being sent; wait for it to finish")]
    DeliveryInFlight,
    /// An upload is outstanding.
    #[error("the card is still being scanned; wait for it to finish")]
    ExtractionInFlight,
    /// A send precondition failed.
    #[error("{}", .0.message())]
    Precondition(Failure),
    /// The body cannot be edited in its current kind.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}
