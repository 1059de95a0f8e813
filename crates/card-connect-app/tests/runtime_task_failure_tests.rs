//! Integration tests for request tasks that end without a report.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use card_connect_app::{Completion, RuntimeEvent, WorkflowRuntime};
use card_connect_core::{CardImage, HttpReply};
use card_connect_delivery::DeliveryClient;
use card_connect_extraction::{ExtractionClient, ExtractionError, ExtractionTransport};
use card_connect_ui::{Failure, WorkflowStatus};
use url::Url;

use common::{BASE_URL, RecordingDelivery, card_file, controller};

struct PanickingExtraction;

#[async_trait]
impl ExtractionTransport for PanickingExtraction {
    async fn upload_card(
        &self,
        _endpoint: &Url,
        _image: &CardImage,
    ) -> Result<HttpReply, ExtractionError> {
        panic!("transport blew up");
    }
}

#[tokio::test]
async fn runtime_task_failure_tests_panicked_upload_fails_its_request() {
    let (controller, _surface) = controller();
    let extraction = ExtractionClient::new(BASE_URL, Arc::new(PanickingExtraction))
        .expect("fake base url is valid");
    let delivery = DeliveryClient::new(BASE_URL, Arc::new(RecordingDelivery::accepting("202")))
        .expect("fake base url is valid");
    let mut runtime = WorkflowRuntime::new(controller, extraction, delivery);

    let seq = runtime
        .select_file(card_file("jane.png"))
        .expect("png accepted");
    let events = runtime.settle().await;

    assert_eq!(
        events,
        vec![RuntimeEvent::Extraction {
            seq,
            completion: Completion::Applied
        }]
    );
    assert_eq!(runtime.outstanding(), 0);
    assert_eq!(runtime.controller().pending_extraction(), None);
    match runtime.controller().status() {
        WorkflowStatus::Failed(Failure::Extraction(ExtractionError::Transport(reason))) => {
            assert!(reason.contains("panicked"), "unexpected reason: {reason}");
        }
        other => panic!("unexpected status: {other:?}"),
    }
}
