use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::Mutex;
use tower::ServiceExt;
use wabridge_channels::ChatSender;
use wabridge_chatwoot::{ChatwootClient, Relay};
use wabridge_config::{AppConfig, ChatwootConfig, ConfigStore};
use wabridge_gateway::{build_router, AppState, SharedState};
use wabridge_media::AttachmentStager;

/// ChatSender double that records calls instead of hitting the network.
struct RecordingSender {
    calls: Mutex<Vec<(String, String, Option<String>)>>,
    fail: bool,
}

impl RecordingSender {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    async fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_message(
        &self,
        phone: &str,
        content: &str,
        media_url: Option<&str>,
    ) -> wabridge_common::Result<()> {
        self.calls
            .lock()
            .await
            .push((phone.to_string(), content.to_string(), media_url.map(String::from)));
        if self.fail {
            Err(wabridge_common::Error::Channel("send rejected".into()))
        } else {
            Ok(())
        }
    }
}

fn temp_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "wabridge-gateway-test-{}-{}-{}",
        label,
        std::process::id(),
        nanos
    ))
}

fn test_state(
    dir: &Path,
    sender: Arc<dyn ChatSender>,
    chatwoot_base: Option<String>,
) -> SharedState {
    let store = Arc::new(ConfigStore::new(dir));
    if let Some(base_url) = chatwoot_base {
        store
            .write(&ChatwootConfig {
                base_url,
                account_id: 7,
                inbox_id: 3,
                api_token: "tok".to_string(),
            })
            .expect("config write should succeed");
    }

    let stager = Arc::new(AttachmentStager::with_delay(dir, Duration::ZERO));
    let relay = Relay::new(ChatwootClient::new(Arc::clone(&store)), Arc::clone(&stager));

    Arc::new(AppState::new(
        AppConfig::default(),
        dir.to_path_buf(),
        store,
        relay,
        stager,
        sender,
    ))
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8_lossy(&bytes).to_string()
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

#[tokio::test]
async fn health_answers_ok() {
    let dir = temp_dir("health");
    let state = test_state(&dir, RecordingSender::new(false), None);

    let resp = build_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn private_agent_reply_is_acknowledged_but_not_sent() {
    let dir = temp_dir("private-reply");
    let sender = RecordingSender::new(false);
    let state = test_state(&dir, sender.clone(), None);

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/messages",
            serde_json::json!({
                "content": "internal note",
                "private": true,
                "conversation": {
                    "meta": { "sender": { "phone_number": "+15551234567" } },
                    "messages": []
                }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ignored: private message");
    assert!(sender.calls().await.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn agent_reply_is_relayed_with_stripped_phone_and_media_url() {
    let dir = temp_dir("reply");
    let sender = RecordingSender::new(false);
    let state = test_state(&dir, sender.clone(), None);

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/messages",
            serde_json::json!({
                "content": "hello from support",
                "private": false,
                "conversation": {
                    "meta": { "sender": { "phone_number": "+15551234567" } },
                    "messages": [{
                        "attachments": [{ "data_url": "https://cdn.example/reply.png" }]
                    }]
                }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "sent");
    assert_eq!(
        sender.calls().await,
        vec![(
            "15551234567".to_string(),
            "hello from support".to_string(),
            Some("https://cdn.example/reply.png".to_string())
        )]
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn failed_send_answers_error_token_with_status_200() {
    let dir = temp_dir("reply-fail");
    let sender = RecordingSender::new(true);
    let state = test_state(&dir, sender.clone(), None);

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/messages",
            serde_json::json!({
                "content": "hello",
                "conversation": {
                    "meta": { "sender": { "phone_number": "15551234567" } }
                }
            }),
        ))
        .await
        .unwrap();

    // Deliberately 200: a 5xx would make Chatwoot retry in a loop.
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "error sending message");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn reply_without_phone_number_answers_error_token() {
    let dir = temp_dir("reply-no-phone");
    let sender = RecordingSender::new(false);
    let state = test_state(&dir, sender.clone(), None);

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/messages",
            serde_json::json!({ "content": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "error sending message");
    assert!(sender.calls().await.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn config_endpoints_round_trip() {
    let dir = temp_dir("config");
    let state = test_state(&dir, RecordingSender::new(false), None);
    let router = build_router(state);

    // Nothing saved yet.
    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/get-chatwoot-config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: serde_json::Value =
        serde_json::from_str(&body_string(resp).await).expect("json body");
    assert_eq!(body["status"], "empty");

    // Save a record.
    let resp = router
        .clone()
        .oneshot(json_post(
            "/v1/save-chatwoot-config",
            serde_json::json!({
                "baseUrl": "https://chatwoot.example.com",
                "accountId": 7,
                "inboxId": 3,
                "apiToken": "secret"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(resp).await).expect("json body");
    assert_eq!(body["status"], "success");

    // Read it back.
    let resp = router
        .oneshot(
            Request::builder()
                .uri("/v1/get-chatwoot-config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: serde_json::Value =
        serde_json::from_str(&body_string(resp).await).expect("json body");
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["baseUrl"], "https://chatwoot.example.com");
    assert_eq!(body["data"]["accountId"], 7);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn config_page_missing_file_answers_plain_error() {
    let dir = temp_dir("config-page");
    let state = test_state(&dir, RecordingSender::new(false), None);

    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/v1/chatwoot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.starts_with("Error:"));
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn config_page_serves_html_when_present() {
    let dir = temp_dir("config-page-ok");
    std::fs::create_dir_all(dir.join("front")).expect("front dir");
    std::fs::write(dir.join("front/chatwoot.html"), "<html>config</html>")
        .expect("write page");
    let state = test_state(&dir, RecordingSender::new(false), None);

    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/v1/chatwoot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "<html>config</html>");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn location_event_missing_coordinate_makes_zero_remote_calls() {
    use wiremock::MockServer;

    let server = MockServer::start().await;
    let dir = temp_dir("location-drop");
    let state = test_state(&dir, RecordingSender::new(false), Some(server.uri()));

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "remoteJid": "15551234567@s.whatsapp.net" },
                "pushName": "Alice",
                "event": { "type": "location", "latitude": 4.6 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Dispatch runs in a spawned task; give it a moment, then confirm the
    // mock Chatwoot server saw nothing at all.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let requests = server.received_requests().await.expect("request recording");
    assert!(requests.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn welcome_event_flows_into_chatwoot() {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    let dir = temp_dir("welcome-flow");

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/7/contacts/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [{ "id": 5, "contact_inboxes": [] }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/7/contacts/5/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [{ "id": 42 }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/7/conversations/42/messages"))
        .and(body_partial_json(serde_json::json!({ "content": "hola" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&dir, RecordingSender::new(false), Some(server.uri()));
    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "senderPn": "15551234567:3@s.whatsapp.net" },
                "pushName": "Alice",
                "event": { "type": "welcome", "body": "hola" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Wait for the spawned dispatch to finish all three calls.
    for _ in 0..100 {
        let count = server.received_requests().await.unwrap_or_default().len();
        if count >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.verify().await;
    let _ = std::fs::remove_dir_all(dir);
}

/// Poll until the spawned dispatch posts a message to the mock Chatwoot
/// server, then hand the captured request back for body assertions.
async fn wait_for_message_post(server: &wiremock::MockServer) -> wiremock::Request {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap_or_default();
        if let Some(req) = requests
            .into_iter()
            .find(|r| r.url.path().ends_with("/messages"))
        {
            return req;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no message reached the mock Chatwoot server");
}

/// Mount the happy-path contact search, conversation list, and message
/// endpoints for an existing contact with one open conversation.
async fn mount_contact_and_conversation(server: &wiremock::MockServer) {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/7/contacts/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [{ "id": 5, "contact_inboxes": [] }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/7/contacts/5/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [{ "id": 42 }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/7/conversations/42/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn voice_note_event_reaches_chatwoot_with_fixed_caption() {
    use base64::Engine;
    use wiremock::MockServer;

    let server = MockServer::start().await;
    mount_contact_and_conversation(&server).await;
    let dir = temp_dir("voice-note-flow");
    let state = test_state(&dir, RecordingSender::new(false), Some(server.uri()));

    let data = base64::engine::general_purpose::STANDARD.encode(b"opus frames");
    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "senderPn": "15551234567@s.whatsapp.net" },
                "pushName": "Alice",
                "event": { "type": "voice_note", "media": { "data": data, "extension": "ogg" } }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let message = wait_for_message_post(&server).await;
    let body = String::from_utf8_lossy(&message.body);
    assert!(body.contains("Nota de voz"));
    assert!(body.contains("name=\"attachments[]\""));
    assert!(body.contains("audio/ogg"));
    server.verify().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn document_event_relays_caption_and_pdf_attachment() {
    use base64::Engine;
    use wiremock::MockServer;

    let server = MockServer::start().await;
    mount_contact_and_conversation(&server).await;
    let dir = temp_dir("document-flow");
    let state = test_state(&dir, RecordingSender::new(false), Some(server.uri()));

    let data = base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.7 fake");
    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "remoteJid": "15551234567@s.whatsapp.net" },
                "pushName": "Alice",
                "event": {
                    "type": "document",
                    "media": { "data": data, "extension": "pdf" },
                    "caption": "informe trimestral"
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let message = wait_for_message_post(&server).await;
    let body = String::from_utf8_lossy(&message.body);
    assert!(body.contains("informe trimestral"));
    assert!(body.contains("name=\"attachments[]\""));
    assert!(body.contains("application/pdf"));
    assert!(body.contains("filename=\"upload_"));
    server.verify().await;
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn multi_megabyte_media_event_is_not_rejected() {
    use base64::Engine;

    let dir = temp_dir("large-media");
    let state = test_state(&dir, RecordingSender::new(false), None);

    // ~4 MB once base64-encoded, well past the default request-body limit.
    let data = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 3 * 1024 * 1024]);
    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "remoteJid": "15551234567@s.whatsapp.net" },
                "pushName": "Alice",
                "event": { "type": "voice_note", "media": { "data": data, "extension": "ogg" } }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn unresolvable_sender_makes_zero_remote_calls() {
    use wiremock::MockServer;

    let server = MockServer::start().await;
    let dir = temp_dir("no-jid");
    let state = test_state(&dir, RecordingSender::new(false), Some(server.uri()));

    let resp = build_router(state)
        .oneshot(json_post(
            "/v1/events",
            serde_json::json!({
                "keys": { "remoteJid": "status@broadcast" },
                "pushName": "Nobody",
                "event": { "type": "welcome", "body": "hi" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let requests = server.received_requests().await.expect("request recording");
    assert!(requests.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}
