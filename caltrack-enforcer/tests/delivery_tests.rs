//! Mailgun channel against a local stand-in server

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Form, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use caltrack_common::config::DeliveryConfig;
use caltrack_enforcer::delivery::{DeliveryChannel, MailgunChannel, Message};

#[derive(Clone)]
struct MockMailgun {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<(String, Option<String>, HashMap<String, String>)>>>,
}

async fn messages(
    State(mock): State<MockMailgun>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.received.lock().unwrap().push((domain, auth, form));
    tokio::time::sleep(mock.delay).await;
    mock.status
}

/// Serve the mock on an ephemeral port; returns its base URL
async fn start(mock: MockMailgun) -> String {
    let app = Router::new()
        .route("/:domain/messages", post(messages))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn mock(status: StatusCode, delay: Duration) -> MockMailgun {
    MockMailgun {
        status,
        delay,
        received: Arc::new(Mutex::new(Vec::new())),
    }
}

fn channel(base_url: String, timeout_secs: u64) -> MailgunChannel {
    let config = DeliveryConfig {
        mailgun_domain: "mg.example.test".to_string(),
        mailgun_base_url: base_url,
        timeout_secs,
    };
    MailgunChannel::new(&config, "key-123".to_string()).unwrap()
}

fn message() -> Message {
    Message {
        recipients: vec!["qa@acme.test".to_string(), "lead@acme.test".to_string()],
        subject: "[ACTION REQUIRED] 1 overdue calibration(s) - Acme".to_string(),
        body: "CAL-A overdue".to_string(),
    }
}

#[tokio::test]
async fn test_accepted_message_reports_success() {
    let server = mock(StatusCode::OK, Duration::ZERO);
    let base = start(server.clone()).await;
    let channel = channel(base.clone(), 5);

    assert_eq!(channel.endpoint(), format!("{base}/mg.example.test/messages"));
    assert!(channel.send("Cal - Acme <cal@acme.gp3.app>", &message()).await);

    let received = server.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let (domain, auth, form) = &received[0];
    assert_eq!(domain, "mg.example.test");
    assert!(auth.as_deref().unwrap_or_default().starts_with("Basic "));
    assert_eq!(form["from"], "Cal - Acme <cal@acme.gp3.app>");
    assert_eq!(form["to"], "qa@acme.test, lead@acme.test");
    assert_eq!(form["subject"], "[ACTION REQUIRED] 1 overdue calibration(s) - Acme");
    assert_eq!(form["text"], "CAL-A overdue");
}

#[tokio::test]
async fn test_server_error_reports_failure() {
    let server = mock(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO);
    let base = start(server.clone()).await;

    assert!(!channel(base, 5).send("cal@acme.gp3.app", &message()).await);
    assert_eq!(server.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_reports_failure() {
    let base = start(mock(StatusCode::UNAUTHORIZED, Duration::ZERO)).await;
    assert!(!channel(base, 5).send("cal@acme.gp3.app", &message()).await);
}

#[tokio::test]
async fn test_slow_server_times_out_as_failure() {
    let base = start(mock(StatusCode::OK, Duration::from_secs(3))).await;

    let started = std::time::Instant::now();
    assert!(!channel(base, 1).send("cal@acme.gp3.app", &message()).await);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unreachable_server_reports_failure() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(!channel(format!("http://{addr}"), 2).send("cal@acme.gp3.app", &message()).await);
}
