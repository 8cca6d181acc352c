//! Xiaomi provider against a mock gateway

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xiaomi_push::config::RetrySettings;
use xiaomi_push::{
    AndroidContent, AppError, Completion, InMemoryArrivalTracker, InMemoryStats, Notification,
    PacketInfo, PushProvider, TokenData, XiaomiConfig, XiaomiProvider,
};

struct Harness {
    server: MockServer,
    provider: Arc<XiaomiProvider>,
    stats: Arc<InMemoryStats>,
    arrival: Arc<InMemoryArrivalTracker>,
}

async fn harness(timeout_ms: u64) -> Harness {
    let server = MockServer::start().await;
    let stats = Arc::new(InMemoryStats::new());
    let arrival = Arc::new(InMemoryArrivalTracker::new());
    let config = XiaomiConfig {
        app_secret: "test-secret".to_string(),
        base_url: server.uri(),
        timeout_ms,
        retry: RetrySettings {
            max_attempts: 2,
            delay_ms: 10,
        },
        ..Default::default()
    };
    let provider = XiaomiProvider::new(&config, arrival.clone(), stats.clone()).unwrap();
    Harness {
        server,
        provider: Arc::new(provider),
        stats,
        arrival,
    }
}

fn notification(id: &str) -> Notification {
    Notification::new(id, AndroidContent::new("Hello", "World").with_extra("url", "app://open"))
}

fn tokens() -> Vec<TokenData> {
    vec![TokenData::new("tok1"), TokenData::new("tok2")]
}

type Calls = Arc<Mutex<Vec<Option<String>>>>;

fn recording_completion() -> (Completion, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let completion: Completion = Box::new(move |err: Option<&AppError>| {
        sink.lock().unwrap().push(err.map(|e| e.to_string()));
    });
    (completion, calls)
}

async fn last_form(server: &MockServer) -> Vec<(String, String)> {
    let requests = server.received_requests().await.unwrap();
    let request = requests.last().expect("no request received");
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[tokio::test]
async fn send_many_success_records_stats_and_arrival() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .and(path("/v3/message/regid"))
        .and(header("authorization", "key=test-secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {"id": "M123"}})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let (completion, calls) = recording_completion();
    let report = h
        .provider
        .send_many(&notification("n-1"), &tokens(), 3600, Some(completion))
        .await
        .expect("send should not be skipped");

    assert!(report.accepted);
    assert!(report.error.is_none());
    assert_eq!(*calls.lock().unwrap(), vec![None]);

    let stats = h.stats.snapshot("xiaomi").unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.success, 1);

    let info = h.arrival.get("n-1").unwrap();
    assert_eq!(info.provider_meta["xiaomi_msg_id"], "M123");

    let form = last_form(&h.server).await;
    assert_eq!(field(&form, "title"), Some("Hello"));
    assert_eq!(field(&form, "description"), Some("World"));
    assert_eq!(field(&form, "registration_id"), Some("tok1,tok2"));
    assert_eq!(field(&form, "time_to_live"), Some("3600"));
    assert_eq!(field(&form, "extra.notify_foreground"), Some("1"));

    let envelope: Value = serde_json::from_str(field(&form, "payload").unwrap()).unwrap();
    assert_eq!(envelope["id"], "n-1");
    assert_eq!(envelope["android"]["url"], "app://open");
    assert_eq!(envelope["android"]["title"], "Hello");
}

#[tokio::test]
async fn send_all_uses_broadcast_endpoint_and_tag() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .and(path("/v3/message/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 20301})))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = h
        .provider
        .send_all(&notification("n-2"), -5, None)
        .await
        .unwrap();

    assert!(report.accepted);
    assert!(h.stats.snapshot("xiaomi").is_none());
    let stats = h.stats.snapshot("xiaomiAll").unwrap();
    assert_eq!((stats.total, stats.success), (1, 1));

    let form = last_form(&h.server).await;
    assert_eq!(field(&form, "registration_id"), None);
    assert_eq!(field(&form, "time_to_live"), Some("0"));
}

#[tokio::test]
async fn missing_title_makes_no_request() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let silent = Notification::new("n-3", AndroidContent::default());
    assert!(h.provider.send_many(&silent, &tokens(), 0, None).await.is_none());
    assert!(h.provider.send_all(&silent, 0, None).await.is_none());
    assert!(h.stats.snapshot_all().is_empty());
}

#[tokio::test]
async fn rejection_code_is_not_an_error() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 10001})))
        .mount(&h.server)
        .await;

    let (completion, calls) = recording_completion();
    let report = h
        .provider
        .send_many(&notification("n-4"), &tokens(), 0, Some(completion))
        .await
        .unwrap();

    assert!(!report.accepted);
    assert!(report.error.is_none());
    assert_eq!(*calls.lock().unwrap(), vec![None]);
    let stats = h.stats.snapshot("xiaomi").unwrap();
    assert_eq!((stats.total, stats.success), (1, 0));
    assert!(h.arrival.is_empty());
}

#[tokio::test]
async fn http_error_status_is_not_retried() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = h
        .provider
        .send_many(&notification("n-5"), &tokens(), 0, None)
        .await
        .unwrap();

    assert!(!report.accepted);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn timeout_is_retried_once_then_reported() {
    let h = harness(100).await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&h.server)
        .await;

    let (completion, calls) = recording_completion();
    let report = h
        .provider
        .send_many(&notification("n-6"), &tokens(), 0, Some(completion))
        .await
        .unwrap();

    assert!(!report.accepted);
    assert!(matches!(report.error, Some(AppError::NetworkTimeout { .. })));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_some());
    assert_eq!(h.stats.snapshot("xiaomi").unwrap().success, 0);
}

#[tokio::test]
async fn concurrent_sends_count_every_attempt() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {"id": "M"}})),
        )
        .expect(10)
        .mount(&h.server)
        .await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let provider = h.provider.clone();
        handles.push(tokio::spawn(async move {
            let n = notification(&format!("n-{}", i));
            let report = provider.send_many(&n, &tokens(), 0, None).await;
            report
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().accepted);
    }

    let stats = h.stats.snapshot("xiaomi").unwrap();
    assert_eq!((stats.total, stats.success), (10, 10));
    assert_eq!(h.arrival.len(), 10);
}

#[tokio::test]
async fn trace_resolved_attaches_result() {
    let h = harness(1000).await;
    Mock::given(method("GET"))
        .and(path("/v1/trace/message/status"))
        .and(query_param("msg_id", "M123"))
        .and(header("authorization", "key=test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"resolved": 1, "extra": "x"}}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let packet = PacketInfo::new().with("id", "n-1").with("xiaomi_msg_id", "M123");
    let traced = h.provider.trace(packet).await;

    assert!(!traced.contains_key("xiaomi_msg_id"));
    assert_eq!(traced.get("xiaomi"), Some(&json!({"resolved": 1, "extra": "x"})));
    assert_eq!(traced.get("id"), Some(&json!("n-1")));
}

#[tokio::test]
async fn trace_unresolved_drops_id_without_result() {
    let h = harness(1000).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"data": {"resolved": 0}}})),
        )
        .mount(&h.server)
        .await;

    let traced = h
        .provider
        .trace(PacketInfo::new().with("xiaomi_msg_id", "M1"))
        .await;
    assert!(traced.as_map().is_empty());
}

#[tokio::test]
async fn trace_malformed_reply_returns_packet_unchanged() {
    let h = harness(1000).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&h.server)
        .await;

    let packet = PacketInfo::new().with("xiaomi_msg_id", "M1");
    assert_eq!(h.provider.trace(packet.clone()).await, packet);
}

#[tokio::test]
async fn trace_without_msg_id_makes_no_request() {
    let h = harness(1000).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let packet = PacketInfo::new().with("id", "n-1");
    assert_eq!(h.provider.trace(packet.clone()).await, packet);
}

#[tokio::test]
async fn trace_transport_failure_returns_packet_unchanged() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = XiaomiConfig {
        app_secret: "test-secret".to_string(),
        base_url: format!("http://127.0.0.1:{}", port),
        timeout_ms: 1000,
        retry: RetrySettings {
            max_attempts: 2,
            delay_ms: 10,
        },
        ..Default::default()
    };
    let provider = XiaomiProvider::new(
        &config,
        Arc::new(InMemoryArrivalTracker::new()),
        Arc::new(InMemoryStats::new()),
    )
    .unwrap();

    let packet = PacketInfo::new().with("xiaomi_msg_id", "M1");
    let traced = provider.trace(packet.clone()).await;

    assert_eq!(traced, packet);
    assert_eq!(traced.msg_id("xiaomi_msg_id"), Some("M1"));
}

#[tokio::test]
async fn missing_message_leaves_description_out_of_form() {
    let h = harness(1000).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&h.server)
        .await;

    let n = Notification::new(
        "n-7",
        AndroidContent {
            title: Some("Hello".to_string()),
            ..Default::default()
        },
    );
    let report = h.provider.send_many(&n, &tokens(), 0, None).await.unwrap();
    assert!(report.accepted);

    let form = last_form(&h.server).await;
    assert_eq!(field(&form, "title"), Some("Hello"));
    assert_eq!(field(&form, "description"), None);
}
