#![warn(missing_docs)]
//! # card-connect-app
//!
//! ## Purpose
//! Orchestrates intake, extraction, overlay, composition, and delivery for
//! `card-connect`.
//!
//! ## Responsibilities
//! - Own workflow state in a single [`WorkflowController`] and expose it as a
//!   read-only [`card_connect_ui::WorkflowView`].
//! - Run extraction and delivery requests on tokio through [`WorkflowRuntime`],
//!   discarding answers to superseded requests.
//! - Load [`AppConfig`] from the environment and wire HTTP transports.
//! - Provide the log redaction helper for email addresses.
//!
//! ## Data flow
//! File selection -> controller validates and issues a tagged upload ->
//! runtime task calls the extraction service -> controller applies the latest
//! result -> user edits the draft -> controller checks preconditions and
//! issues a tagged send -> runtime task calls the delivery service ->
//! controller records the outcome.
//!
//! ## Ownership and lifetimes
//! The controller is owned by the runtime and mutated only between awaits.
//! Request tasks own clones of the service clients and their ticket data.
//!
//! ## Error model
//! Transition refusals are [`WorkflowError`]; setup failures are wrapped in
//! [`AppError`]. Request failures become status values, never panics.
//!
//! ## Security and privacy notes
//! - Email addresses are logged through [`redact_email`] only.
//! - The delivery kill switch stops sends before any network call.

pub mod config;
pub mod controller;
pub mod runtime;

use std::sync::Arc;

use card_connect_delivery::{DeliveryClient, DeliveryError, HttpDeliveryTransport};
use card_connect_extraction::{ExtractionClient, ExtractionError, HttpExtractionTransport};
use card_connect_intake::PreviewSurface;
use card_connect_overlay::OverlayMapper;
use thiserror::Error;

pub use config::{AppConfig, ConfigError};
pub use controller::{
    Completion, ControllerSettings, DeliveryTicket, ExtractionTicket, WorkflowController,
    WorkflowError,
};
pub use runtime::{RuntimeEvent, WorkflowRuntime};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("CARD_CONNECT_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Builds a runtime with reqwest transports for the configured service.
///
/// # Errors
/// Returns [`AppError::Http`] when the HTTP client cannot be built, and
/// [`AppError::Extraction`]/[`AppError::Delivery`] when the base URL yields an
/// invalid endpoint.
pub fn build_runtime(
    config: &AppConfig,
    surface: Arc<dyn PreviewSurface>,
    overlay: OverlayMapper,
) -> Result<WorkflowRuntime, AppError> {
    let http = reqwest::Client::builder()
        .user_agent(format!("card-connect/{APP_VERSION}"))
        .build()
        .map_err(|error| AppError::Http(error.to_string()))?;

    let extraction = ExtractionClient::new(
        &config.api_base,
        Arc::new(HttpExtractionTransport::new(http.clone())),
    )?
    .with_timeout(config.request_timeout);
    let delivery = DeliveryClient::new(&config.api_base, Arc::new(HttpDeliveryTransport::new(http)))?
        .with_timeout(config.request_timeout);

    tracing::info!(
        stage = "startup",
        upload = %extraction.endpoint(),
        send = %delivery.endpoint(),
        delivery_enabled = config.delivery_enabled,
        "service endpoints resolved"
    );

    let controller = WorkflowController::new(
        surface,
        ControllerSettings {
            max_image_bytes: config.max_image_bytes,
            delivery_enabled: config.delivery_enabled,
        },
    )
    .with_overlay(overlay);

    Ok(WorkflowRuntime::new(controller, extraction, delivery))
}

/// Masks the local part of an email address for logs: `j***@acme.com`.
///
/// Input without `@` is masked entirely.
pub fn redact_email(email: &str) -> String {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),
    /// Extraction client setup or request error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    /// Delivery client setup or request error.
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
    /// A workflow transition was refused.
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    /// A local file could not be used.
    #[error("intake error: {0}")]
    Intake(#[from] card_connect_intake::IntakeError),
}
