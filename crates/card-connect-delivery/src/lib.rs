#![warn(missing_docs)]
//! # card-connect-delivery
//!
//! ## Purpose
//! Client for the remote message-delivery service (`POST /send-email`).
//!
//! ## Responsibilities
//! - Resolve and validate the delivery endpoint.
//! - Send one delivery request through an injectable transport.
//! - Turn the reply into a delivery code or a verbatim failure reason.
//!
//! ## Data flow
//! Controller checks recipient/sender preconditions -> [`DeliveryClient::send`]
//! -> [`DeliveryTransport`] -> [`parse_send_reply`] -> [`DeliveryOutcome`].
//!
//! ## Error model
//! Failures are [`DeliveryError`] values. Server-provided error text is kept
//! verbatim; each send is a single attempt.
//!
//! ## Security and privacy notes
//! Addresses are logged only in redacted form by callers; this crate logs the
//! endpoint and outcome class.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use card_connect_core::{
    CoreError, HttpReply, SendEmailRequest, SendEmailResponse, ServiceErrorBody, join_endpoint,
};
use thiserror::Error;
use url::Url;

/// Endpoint path relative to the service base URL.
pub const SEND_EMAIL_PATH: &str = "send-email";

/// Client-side timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Text used when a failure reply carries no error message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Successful delivery acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Opaque delivery/tracking code from the service.
    pub code: String,
}

/// Result of one send attempt.
pub type DeliveryOutcome = Result<DeliveryReceipt, DeliveryError>;

/// Abstract transport used by the delivery client.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Posts `request` as JSON and returns the raw reply.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Transport`] when no reply was received.
    async fn send_email(
        &self,
        endpoint: &Url,
        request: &SendEmailRequest,
    ) -> Result<HttpReply, DeliveryError>;
}

/// Delivery client that validates endpoint policy and runs one send.
#[derive(Clone)]
pub struct DeliveryClient {
    endpoint: Url,
    timeout: Duration,
    transport: Arc<dyn DeliveryTransport>,
}

impl DeliveryClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    /// Returns [`DeliveryError::InvalidEndpoint`] when the base URL is not a
    /// usable http(s) URL.
    pub fn new(
        base_url: &str,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Result<Self, DeliveryError> {
        let endpoint = join_endpoint(base_url, SEND_EMAIL_PATH).map_err(|error| match error {
            CoreError::InvalidEndpoint(reason) => DeliveryError::InvalidEndpoint(reason),
            other => DeliveryError::InvalidEndpoint(other.to_string()),
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

    /// Resolved delivery endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one message request.
    ///
    /// Callers must have checked that `sender_email` and `receiver_email` are
    /// non-empty; this client forwards them as given.
    pub async fn send(
        &self,
        sender_email: &str,
        receiver_email: &str,
        name: &str,
    ) -> DeliveryOutcome {
        let request = SendEmailRequest {
            sender_email: sender_email.to_string(),
            receiver_email: receiver_email.to_string(),
            name: name.to_string(),
        };

        let reply = tokio::time::timeout(
            self.timeout,
            self.transport.send_email(&self.endpoint, &request),
        )
        .await
        .map_err(|_| DeliveryError::Timeout(self.timeout))??;

        let outcome = parse_send_reply(&reply);
        match &outcome {
            Ok(receipt) => tracing::debug!(
                stage = "delivery",
                status = reply.status,
                code = %receipt.code,
                "delivery accepted"
            ),
            Err(error) => tracing::warn!(
                stage = "delivery",
                status = reply.status,
                %error,
                "delivery rejected"
            ),
        }
        outcome
    }
}

/// Converts a raw reply into a delivery outcome.
///
/// Non-2xx replies become [`DeliveryError::Rejected`] with the service's
/// `error` text, or [`UNKNOWN_ERROR`] when none is present.
pub fn parse_send_reply(reply: &HttpReply) -> DeliveryOutcome {
    if !reply.is_success() {
        let body = ServiceErrorBody::parse_lenient(&reply.body);
        return Err(DeliveryError::Rejected(
            body.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        ));
    }

    let parsed: SendEmailResponse = serde_json::from_slice(&reply.body)
        .map_err(|error| DeliveryError::Malformed(error.to_string()))?;
    Ok(DeliveryReceipt { code: parsed.code })
}

/// reqwest-backed transport that posts a JSON body.
#[derive(Debug, Clone, Default)]
pub struct HttpDeliveryTransport {
    client: reqwest::Client,
}

impl HttpDeliveryTransport {
    /// Creates a transport over an existing reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeliveryTransport for HttpDeliveryTransport {
    async fn send_email(
        &self,
        endpoint: &Url,
        request: &SendEmailRequest,
    ) -> Result<HttpReply, DeliveryError> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        Ok(HttpReply::new(status, body.to_vec()))
    }
}

/// Errors produced by a send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Service URL violates endpoint requirements.
    #[error("invalid delivery endpoint: {0}")]
    InvalidEndpoint(String),
    /// The service refused the request; carries its error text verbatim.
    #[error("{0}")]
    Rejected(String),
    /// No reply was received; carries the transport error text.
    #[error("{0}")]
    Transport(String),
    /// A 2xx body lacked a delivery code.
    #[error("unreadable delivery response: {0}")]
    Malformed(String),
    /// The client-side timeout elapsed.
    #[error("delivery service did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    //! Unit tests for reply classification.

    use super::*;

    #[test]
    fn rejection_keeps_server_text() {
        let reply = HttpReply::new(400, r#"{"status":"error","error":"Missing receiver_email"}"#);
        assert_eq!(
            parse_send_reply(&reply),
            Err(DeliveryError::Rejected("Missing receiver_email".to_string()))
        );
    }

    #[test]
    fn rejection_without_text_is_unknown_error() {
        let reply = HttpReply::new(500, "Internal Server Error");
        assert_eq!(
            parse_send_reply(&reply),
            Err(DeliveryError::Rejected(UNKNOWN_ERROR.to_string()))
        );
    }

    #[test]
    fn success_reads_code() {
        let reply = HttpReply::new(200, r#"{"status":"success","code":"abc-123"}"#);
        assert_eq!(
            parse_send_reply(&reply),
            Ok(DeliveryReceipt {
                code: "abc-123".to_string()
            })
        );
    }

    #[test]
    fn success_without_code_is_malformed() {
        let reply = HttpReply::new(200, r#"{"status":"success"}"#);
        assert!(matches!(
            parse_send_reply(&reply),
            Err(DeliveryError::Malformed(_))
        ));
    }
}
