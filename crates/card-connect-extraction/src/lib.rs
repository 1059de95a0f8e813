#![warn(missing_docs)]
//! # card-connect-extraction
//!
//! ## Purpose
//! Client for the remote card extraction service (`POST /upload-card`).
//!
//! ## Responsibilities
//! - Resolve and validate the upload endpoint.
//! - Send validated card images through an injectable transport.
//! - Classify transport failures, non-2xx replies, and malformed bodies.
//! - Normalize successful replies into an [`ExtractionResult`].
//!
//! ## Data flow
//! Controller issues a request -> [`ExtractionClient::submit`] sends the image
//! through [`ExtractionTransport`] -> [`parse_upload_reply`] ->
//! [`ExtractionResult`] returned to the controller for it to apply.
//!
//! ## Ownership and lifetimes
//! The client is cheap to clone and shares its transport through `Arc`, so a
//! spawned task can own a copy for the duration of one request.
//!
//! ## Error model
//! Every failure is an [`ExtractionError`] whose `Display` text is fit for the
//! user. Nothing is retried.
//!
//! ## Security and privacy notes
//! Image bytes are never logged; requests are identified by card fingerprint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use card_connect_core::{
    CardImage, CoreError, ExtractionResult, HttpReply, ServiceErrorBody, UploadCardResponse,
    join_endpoint,
};
use thiserror::Error;
use url::Url;

/// Endpoint path relative to the service base URL.
pub const UPLOAD_CARD_PATH: &str = "upload-card";

/// Client-side timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstract transport used by the extraction client.
#[async_trait]
pub trait ExtractionTransport: Send + Sync {
    /// Uploads `image` as multipart field `file` and returns the raw reply.
    ///
    /// # Errors
    /// Returns [`ExtractionError::Transport`] when no reply was received.
    async fn upload_card(
        &self,
        endpoint: &Url,
        image: &CardImage,
    ) -> Result<HttpReply, ExtractionError>;
}

/// Extraction client that validates endpoint policy and runs one upload.
#[derive(Clone)]
pub struct ExtractionClient {
    endpoint: Url,
    timeout: Duration,
    transport: Arc<dyn ExtractionTransport>,
}

impl ExtractionClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    /// Returns [`ExtractionError::InvalidEndpoint`] when the base URL is not
    /// a usable http(s) URL.
    pub fn new(
        base_url: &str,
        transport: Arc<dyn ExtractionTransport>,
    ) -> Result<Self, ExtractionError> {
        let endpoint = join_endpoint(base_url, UPLOAD_CARD_PATH).map_err(|error| match error {
            CoreError::InvalidEndpoint(reason) => ExtractionError::InvalidEndpoint(reason),
            other => ExtractionError::InvalidEndpoint(other.to_string()),
        })?;

        Ok(Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            transport,
        })
    }

    /// Overrides the client-side timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolved upload endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Uploads one card and returns the normalized result.
    ///
    /// # Errors
    /// - [`ExtractionError::Timeout`] when no reply arrives in time.
    /// - [`ExtractionError::Transport`] when the service is unreachable.
    /// - [`ExtractionError::Status`] for non-2xx replies.
    /// - [`ExtractionError::Malformed`] when a 2xx body cannot be decoded.
    pub async fn submit(&self, image: &CardImage) -> Result<ExtractionResult, ExtractionError> {
        let fingerprint = image.fingerprint();
        tracing::debug!(
            stage = "extraction",
            fingerprint = %fingerprint,
            bytes = image.bytes.len(),
            endpoint = %self.endpoint,
            "submitting card"
        );

        let reply = tokio::time::timeout(
            self.timeout,
            self.transport.upload_card(&self.endpoint, image),
        )
        .await
        .map_err(|_| ExtractionError::Timeout(self.timeout))??;

        let result = parse_upload_reply(&reply);
        match &result {
            Ok(parsed) => tracing::debug!(
                stage = "extraction",
                fingerprint = %fingerprint,
                boxes = parsed.boxes.len(),
                "extraction reply parsed"
            ),
            Err(error) => tracing::warn!(
                stage = "extraction",
                fingerprint = %fingerprint,
                %error,
                "extraction failed"
            ),
        }
        result
    }
}

/// Converts a raw reply into an extraction result.
///
/// # Errors
/// Returns [`ExtractionError::Status`] for non-2xx replies, carrying the
/// service's `error`/`details` text when present, and
/// [`ExtractionError::Malformed`] for undecodable 2xx bodies.
pub fn parse_upload_reply(reply: &HttpReply) -> Result<ExtractionResult, ExtractionError> {
    if !reply.is_success() {
        let body = ServiceErrorBody::parse_lenient(&reply.body);
        let detail = match (body.error, body.details) {
            (Some(error), Some(details)) => Some(format!("{error} ({details})")),
            (Some(error), None) => Some(error),
            (None, details) => details,
        };
        return Err(ExtractionError::Status {
            status: reply.status,
            detail,
        });
    }

    UploadCardResponse::from_json_bytes(&reply.body)
        .map(UploadCardResponse::into_result)
        .map_err(|error| ExtractionError::Malformed(error.to_string()))
}

/// reqwest-backed transport that posts a multipart form.
#[derive(Debug, Clone, Default)]
pub struct HttpExtractionTransport {
    client: reqwest::Client,
}

impl HttpExtractionTransport {
    /// Creates a transport over an existing reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionTransport for HttpExtractionTransport {
    async fn upload_card(
        &self,
        endpoint: &Url,
        image: &CardImage,
    ) -> Result<HttpReply, ExtractionError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.kind.mime())
            .map_err(|error| ExtractionError::Transport(error.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|error| ExtractionError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|error| ExtractionError::Transport(error.to_string()))?;

        Ok(HttpReply::new(status, body.to_vec()))
    }
}

/// Errors produced while extracting a card.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Service URL violates endpoint requirements.
    #[error("invalid extraction endpoint: {0}")]
    InvalidEndpoint(String),
    /// No reply was received.
    #[error("could not reach the extraction service: {0}")]
    Transport(String),
    /// The service replied with a non-2xx status.
    #[error("extraction service returned HTTP {status}{}", detail_suffix(.detail))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Service-provided error text.
        detail: Option<String>,
    },
    /// A 2xx body did not match the response contract.
    #[error("extraction service sent an unreadable response: {0}")]
    Malformed(String),
    /// The client-side timeout elapsed.
    #[error("extraction service did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|text| format!(": {text}"))
        .unwrap_or_default()
}
