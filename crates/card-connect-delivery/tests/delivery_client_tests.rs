//! Integration tests for the delivery client over fake transports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use card_connect_core::{HttpReply, SendEmailRequest};
use card_connect_delivery::{DeliveryClient, DeliveryError, DeliveryReceipt, DeliveryTransport};
use url::Url;

#[derive(Debug)]
struct ScriptedTransport {
    reply: HttpReply,
    requests: Mutex<Vec<(String, SendEmailRequest)>>,
}

impl ScriptedTransport {
    fn new(reply: HttpReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DeliveryTransport for ScriptedTransport {
    async fn send_email(
        &self,
        endpoint: &Url,
        request: &SendEmailRequest,
    ) -> Result<HttpReply, DeliveryError> {
        self.requests
            .lock()
            .expect("request lock should work")
            .push((endpoint.to_string(), request.clone()));
        Ok(self.reply.clone())
    }
}

struct HangingTransport;

#[async_trait]
impl DeliveryTransport for HangingTransport {
    async fn send_email(
        &self,
        _endpoint: &Url,
        _request: &SendEmailRequest,
    ) -> Result<HttpReply, DeliveryError> {
        std::future::pending::<Result<HttpReply, DeliveryError>>().await
    }
}

#[tokio::test]
async fn delivery_client_tests_sends_wire_request() {
    let transport = Arc::new(ScriptedTransport::new(HttpReply::new(
        200,
        r#"{"status":"success","code":202}"#,
    )));
    let client = DeliveryClient::new("http://127.0.0.1:5000/", transport.clone())
        .expect("client should build");

    let receipt = client
        .send("me@x.com", "jane@acme.com", "Jane Doe")
        .await
        .expect("send should succeed");

    assert_eq!(
        receipt,
        DeliveryReceipt {
            code: "202".to_string()
        }
    );
    let requests = transport.requests.lock().expect("request lock should work");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "http://127.0.0.1:5000/send-email");
    assert_eq!(requests[0].1.receiver_email, "jane@acme.com");
    assert_eq!(requests[0].1.sender_email, "me@x.com");
    assert_eq!(requests[0].1.name, "Jane Doe");
}

#[tokio::test]
async fn delivery_client_tests_reports_server_error_verbatim() {
    let transport = Arc::new(ScriptedTransport::new(HttpReply::new(
        500,
        r#"{"status":"error","error":"HTTP Error 401: Unauthorized"}"#,
    )));
    let client =
        DeliveryClient::new("http://127.0.0.1:5000", transport).expect("client should build");

    let error = client
        .send("me@x.com", "jane@acme.com", "Jane")
        .await
        .expect_err("send should fail");
    assert_eq!(error.to_string(), "HTTP Error 401: Unauthorized");
}

#[tokio::test(start_paused = true)]
async fn delivery_client_tests_times_out() {
    let client = DeliveryClient::new("http://127.0.0.1:5000", Arc::new(HangingTransport))
        .expect("client should build")
        .with_timeout(Duration::from_secs(5));

    let error = client
        .send("me@x.com", "jane@acme.com", "Jane")
        .await
        .expect_err("send should time out");
    assert_eq!(error, DeliveryError::Timeout(Duration::from_secs(5)));
}
