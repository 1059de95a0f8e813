//! Shared fixtures for app integration tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use card_connect_app::{ControllerSettings, WorkflowController, WorkflowRuntime};
use card_connect_core::{CardImage, HttpReply, MAX_IMAGE_BYTES, SendEmailRequest};
use card_connect_delivery::{DeliveryClient, DeliveryError, DeliveryTransport};
use card_connect_extraction::{ExtractionClient, ExtractionError, ExtractionTransport};
use card_connect_intake::{InMemoryPreviewSurface, SelectedFile};
use tokio::sync::oneshot;
use url::Url;

/// Base URL used by every fake-backed client.
#[allow(dead_code)]
pub const BASE_URL: &str = "http://cards.test";

/// Encodes a blank PNG of the given size.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut encoded = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .expect("png fixture should encode");
    encoded
}

/// 400x200 PNG selection named `name`.
#[allow(dead_code)]
pub fn card_file(name: &str) -> SelectedFile {
    SelectedFile::new(name, png_bytes(400, 200))
}

/// Successful upload reply for the Jane Doe card.
#[allow(dead_code)]
pub fn jane_reply() -> HttpReply {
    HttpReply::new(
        200,
        serde_json::json!({
            "status": "success",
            "extracted_data": {
                "name": "Jane Doe",
                "company": "Acme",
                "title": "CEO",
                "email": "jane@acme.com",
                "phone": "555-1212"
            },
            "boxes": {"name": {"x": 10, "y": 20, "width": 100, "height": 20}},
            "raw_text": "Jane Doe\nCEO\nAcme",
            "gcp_url": "https://storage.cards.test/jane.png"
        })
        .to_string(),
    )
}

/// Successful upload reply carrying only a name.
#[allow(dead_code)]
pub fn name_only_reply(name: &str) -> HttpReply {
    HttpReply::new(
        200,
        serde_json::json!({
            "extracted_data": {"name": name, "email": ""},
            "boxes": {}
        })
        .to_string(),
    )
}

struct Script {
    gate: Option<oneshot::Receiver<()>>,
    reply: HttpReply,
}

/// Extraction fake answering by file name, optionally held behind a gate.
#[derive(Default)]
pub struct ScriptedExtraction {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedExtraction {
    /// Answers uploads of `file_name` with `reply` immediately.
    pub fn reply(self, file_name: &str, reply: HttpReply) -> Self {
        self.insert(file_name, None, reply);
        self
    }

    /// Answers uploads of `file_name` with `reply` once the returned sender
    /// fires.
    pub fn gated(&self, file_name: &str, reply: HttpReply) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.insert(file_name, Some(gate), reply);
        release
    }

    /// Number of uploads received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, file_name: &str, gate: Option<oneshot::Receiver<()>>, reply: HttpReply) {
        self.scripts
            .lock()
            .expect("script lock")
            .insert(file_name.to_string(), Script { gate, reply });
    }
}

#[async_trait]
impl ExtractionTransport for ScriptedExtraction {
    async fn upload_card(
        &self,
        _endpoint: &Url,
        image: &CardImage,
    ) -> Result<HttpReply, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .expect("script lock")
            .remove(&image.file_name);
        let Some(script) = script else {
            return Err(ExtractionError::Transport(format!(
                "no scripted reply for {}",
                image.file_name
            )));
        };
        if let Some(gate) = script.gate {
            let _ = gate.await;
        }
        Ok(script.reply)
    }
}

/// Delivery fake that records requests and answers with a fixed reply.
pub struct RecordingDelivery {
    reply: HttpReply,
    requests: Mutex<Vec<SendEmailRequest>>,
}

#[allow(dead_code)]
impl RecordingDelivery {
    /// Answers every send with `reply`.
    pub fn new(reply: HttpReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Accepts every send with code `code`.
    pub fn accepting(code: &str) -> Self {
        Self::new(HttpReply::new(
            200,
            serde_json::json!({"status": "success", "code": code}).to_string(),
        ))
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<SendEmailRequest> {
        self.requests.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl DeliveryTransport for RecordingDelivery {
    async fn send_email(
        &self,
        _endpoint: &Url,
        request: &SendEmailRequest,
    ) -> Result<HttpReply, DeliveryError> {
        self.requests
            .lock()
            .expect("request lock")
            .push(request.clone());
        Ok(self.reply.clone())
    }
}

/// Default controller settings with sends enabled.
#[allow(dead_code)]
pub fn settings() -> ControllerSettings {
    ControllerSettings {
        max_image_bytes: MAX_IMAGE_BYTES,
        delivery_enabled: true,
    }
}

/// Controller over a fresh in-memory preview surface.
#[allow(dead_code)]
pub fn controller() -> (WorkflowController, Arc<InMemoryPreviewSurface>) {
    let surface = Arc::new(InMemoryPreviewSurface::new());
    (WorkflowController::new(surface.clone(), settings()), surface)
}

/// Runtime wired to the given fakes.
#[allow(dead_code)]
pub fn runtime(
    extraction: Arc<ScriptedExtraction>,
    delivery: Arc<RecordingDelivery>,
) -> WorkflowRuntime {
    let (controller, _surface) = controller();
    let extraction = ExtractionClient::new(BASE_URL, extraction).expect("fake base url is valid");
    let delivery = DeliveryClient::new(BASE_URL, delivery).expect("fake base url is valid");
    WorkflowRuntime::new(controller, extraction, delivery)
}
