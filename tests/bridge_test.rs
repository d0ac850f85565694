use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use qoj_submit_relay::bridge::{serve_on, BridgeState};
use qoj_submit_relay::cli::submit::post_submission;
use qoj_submit_relay::clients::ReportClient;
use qoj_submit_relay::ingress::IngressClient;
use qoj_submit_relay::models::{SubmissionRecord, SubmissionRequest};
use qoj_submit_relay::orchestrator::{channel, OrchestratorEvent};
use qoj_submit_relay::testing::FakeHostPage;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// 在随机端口启动桥接服务，返回根地址和共享状态
async fn start_bridge() -> (String, Arc<BridgeState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(BridgeState::new("C++26"));
    tokio::spawn(serve_on(listener, state.clone()));
    (format!("http://{}", addr), state)
}

async fn wait_for_clients(state: &BridgeState, count: usize) {
    for _ in 0..100 {
        if state.hub.len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("客户端未在预期时间内连接");
}

async fn get_json(url: &str) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn test_submit_broadcast_and_report_round_trip() {
    let (base, state) = start_bridge().await;
    let ws_url = format!("{}/ws", base.replacen("http", "ws", 1));
    let (mut socket, _) = connect_async(ws_url.as_str()).await.unwrap();
    wait_for_clients(&state, 1).await;

    let response = post_submission(&base, "c", None, "c.cpp", b"int main(){}".to_vec())
        .await
        .unwrap();
    assert_eq!(response["status"], "queued");
    assert_eq!(response["sent_to_clients"], 1);
    let request_id = response["request_id"].as_str().unwrap().to_string();
    assert_eq!(request_id.len(), 32);

    let text = match socket.next().await.unwrap().unwrap() {
        Message::Text(text) => text.as_str().to_string(),
        other => panic!("unexpected frame {:?}", other),
    };
    let payload: Value = serde_json::from_str(&text).unwrap();
    assert!(payload["timestamp"].as_str().unwrap().ends_with('Z'));
    let request = SubmissionRequest::from_message(&text).unwrap();
    assert_eq!(request.problem_code, "c");
    assert_eq!(request.language.as_deref(), Some("C++26"));
    assert_eq!(request.code, "int main(){}");
    assert_eq!(request.request_id.as_deref(), Some(request_id.as_str()));

    let pending = get_json(&format!("{}/submission-result/{}?timeout=0.05", base, request_id)).await;
    assert_eq!(pending["status"], "pending");

    let record = SubmissionRecord {
        sid: "31337".to_string(),
        record_url: "https://qoj.ac/submission/31337".to_string(),
        submit_time: "2024-05-01 12:00:00".to_string(),
    };
    let client = ReportClient::new(base.clone());
    client.post_record(&request_id, &record).await.unwrap();

    let done = get_json(&format!("{}/submission-result/{}", base, request_id)).await;
    assert_eq!(done["status"], "done");
    assert_eq!(done["sid"], "31337");
    assert_eq!(done["surl"], "https://qoj.ac/submission/31337");
    assert_eq!(done["stime"], "2024-05-01 12:00:00");

    let unknown = get_json(&format!("{}/submission-score/31337", base)).await;
    assert_eq!(unknown["status"], "unknown");
    client.post_verdict("31337", "Accepted").await.unwrap();
    let verdict = get_json(&format!("{}/submission-score/31337", base)).await;
    assert_eq!(verdict["status"], "done");
    assert_eq!(verdict["verdict"], "Accepted");
}

#[tokio::test]
async fn test_unknown_request_id() {
    let (base, _state) = start_bridge().await;
    let result = get_json(&format!("{}/submission-result/missing?timeout=0", base)).await;
    assert_eq!(result["status"], "unknown");
}

#[tokio::test]
async fn test_submit_without_clients_still_queues() {
    let (base, _state) = start_bridge().await;
    let response = post_submission(&base, "A", Some("Python3"), "A.py", b"print(1)".to_vec())
        .await
        .unwrap();
    assert_eq!(response["status"], "queued");
    assert_eq!(response["sent_to_clients"], 0);
}

#[tokio::test]
async fn test_ingress_receives_bridge_push() {
    let (base, state) = start_bridge().await;
    let (events, mut receiver) = channel();
    let ingress = IngressClient::new(
        format!("{}/ws", base.replacen("http", "ws", 1)),
        Duration::from_millis(50),
        Arc::new(FakeHostPage::new("https://qoj.ac/contest/1", None)),
        events,
    );
    tokio::spawn(ingress.run());
    wait_for_clients(&state, 1).await;

    post_submission(&base, "D", Some("C++20"), "D.cpp", b"// d".to_vec())
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        OrchestratorEvent::Request(request) => {
            assert_eq!(request.problem_code, "D");
            assert_eq!(request.language.as_deref(), Some("C++20"));
            assert_eq!(request.code, "// d");
        }
        other => panic!("unexpected event {:?}", other),
    }
}
