//! Async driver around [`WorkflowController`].
//!
//! Each request runs as its own task in a [`JoinSet`]. Tasks never touch
//! controller state: they return a report and the runtime applies it through
//! the controller's transition functions, so the controller keeps a single
//! owner. A task that panics or is cancelled is reported as a transport
//! failure for its sequence number.

use std::collections::HashMap;

use card_connect_core::ExtractionResult;
use card_connect_delivery::{DeliveryClient, DeliveryError, DeliveryOutcome};
use card_connect_extraction::{ExtractionClient, ExtractionError};
use card_connect_intake::SelectedFile;
use tokio::task::{self, JoinError, JoinSet};

use crate::controller::{Completion, WorkflowController, WorkflowError};

/// Result returned by a request task.
#[derive(Debug)]
enum TaskReport {
    Extraction {
        seq: u64,
        result: Result<ExtractionResult, ExtractionError>,
    },
    Delivery {
        seq: u64,
        outcome: DeliveryOutcome,
    },
}

/// Request carried by a spawned task, kept until the task is joined.
#[derive(Debug, Clone, Copy)]
enum TaskRequest {
    Extraction(u64),
    Delivery(u64),
}

impl TaskRequest {
    fn failed(self, error: &JoinError) -> TaskReport {
        let reason = format!("request task ended abnormally: {error}");
        match self {
            TaskRequest::Extraction(seq) => TaskReport::Extraction {
                seq,
                result: Err(ExtractionError::Transport(reason)),
            },
            TaskRequest::Delivery(seq) => TaskReport::Delivery {
                seq,
                outcome: Err(DeliveryError::Transport(reason)),
            },
        }
    }
}

/// What happened when a task report was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// An extraction finished.
    Extraction {
        /// Request sequence number.
        seq: u64,
        /// Whether it was applied or discarded.
        completion: Completion,
    },
    /// A delivery finished.
    Delivery {
        /// Request sequence number.
        seq: u64,
        /// Whether it was applied or discarded.
        completion: Completion,
    },
}

/// Owns the controller and runs its requests on tokio.
pub struct WorkflowRuntime {
    controller: WorkflowController,
    extraction: ExtractionClient,
    delivery: DeliveryClient,
    tasks: JoinSet<TaskReport>,
    requests: HashMap<task::Id, TaskRequest>,
}

impl WorkflowRuntime {
    /// Creates a runtime over `controller` using the given service clients.
    pub fn new(
        controller: WorkflowController,
        extraction: ExtractionClient,
        delivery: DeliveryClient,
    ) -> Self {
        Self {
            controller,
            extraction,
            delivery,
            tasks: JoinSet::new(),
            requests: HashMap::new(),
        }
    }

    /// Read access to workflow state.
    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    /// Mutable access for edits that issue no request.
    pub fn controller_mut(&mut self) -> &mut WorkflowController {
        &mut self.controller
    }

    /// Number of spawned tasks whose report has not been applied yet,
    /// including superseded ones.
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    /// Selects a file and spawns its upload. Returns the request sequence.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Propagates [`WorkflowController::select_file`] refusals.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<u64, WorkflowError> {
        let ticket = self.controller.select_file(file)?;
        let client = self.extraction.clone();
        let seq = ticket.seq;

        let handle = self.tasks.spawn(async move {
            let result = client.submit(&ticket.image).await;
            TaskReport::Extraction { seq, result }
        });
        self.requests.insert(handle.id(), TaskRequest::Extraction(seq));
        Ok(seq)
    }

    /// Requests a send and spawns its delivery. Returns the request sequence.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Propagates [`WorkflowController::request_send`] refusals.
    pub fn send(&mut self) -> Result<u64, WorkflowError> {
        let ticket = self.controller.request_send()?;
        let client = self.delivery.clone();
        let seq = ticket.seq;

        let handle = self.tasks.spawn(async move {
            let outcome = client
                .send(&ticket.sender_email, &ticket.receiver_email, &ticket.name)
                .await;
            TaskReport::Delivery { seq, outcome }
        });
        self.requests.insert(handle.id(), TaskRequest::Delivery(seq));
        Ok(seq)
    }

    /// Waits for the next task to finish and applies its report.
    ///
    /// Returns `None` immediately when no task is outstanding.
    pub async fn next_event(&mut self) -> Option<RuntimeEvent> {
        let report = match self.tasks.join_next_with_id().await? {
            Ok((id, report)) => {
                self.requests.remove(&id);
                report
            }
            Err(error) => {
                let request = self.requests.remove(&error.id())?;
                tracing::error!(stage = "runtime", ?request, %error, "request task ended abnormally");
                request.failed(&error)
            }
        };

        Some(match report {
            TaskReport::Extraction { seq, result } => RuntimeEvent::Extraction {
                seq,
                completion: self.controller.on_extraction_complete(seq, result),
            },
            TaskReport::Delivery { seq, outcome } => RuntimeEvent::Delivery {
                seq,
                completion: self.controller.on_delivery_complete(seq, outcome),
            },
        })
    }

    /// Applies reports until no task is outstanding.
    pub async fn settle(&mut self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}
