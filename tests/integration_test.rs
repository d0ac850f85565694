use std::sync::Arc;
use std::time::Duration;

use qoj_submit_relay::browser::connect_to_browser_and_page;
use qoj_submit_relay::config::Config;
use qoj_submit_relay::ingress::IngressClient;
use qoj_submit_relay::models::SubmissionRecord;
use qoj_submit_relay::orchestrator::{channel, OrchestratorSettings, SubmissionOrchestrator};
use qoj_submit_relay::services::ScorePoller;
use qoj_submit_relay::testing::{
    FakeHostPage, FakePage, FakeSurface, RecordingReporter, ScriptedStatusReader,
};
use qoj_submit_relay::utils::logging;

const HOST: &str = "https://qoj.ac/contest/2100";

fn record(sid: &str) -> SubmissionRecord {
    SubmissionRecord {
        sid: sid.to_string(),
        record_url: format!("https://qoj.ac/submission/{}", sid),
        submit_time: "2024-05-01 12:00:00".to_string(),
    }
}

struct Relay {
    ingress: IngressClient,
    page: FakePage,
    reporter: Arc<RecordingReporter>,
    reader: Arc<ScriptedStatusReader>,
}

/// 用测试替身组装一套完整的中继，编排器在后台任务中运行
fn spawn_relay() -> Relay {
    let config = Config::default();
    let (events, receiver) = channel();
    let page = FakePage::new();
    let host = Arc::new(FakeHostPage::new(HOST, None));
    let reporter = Arc::new(RecordingReporter::default());
    let reader = Arc::new(ScriptedStatusReader::new());
    let poller = Arc::new(ScorePoller::new(
        reader.clone(),
        reporter.clone(),
        config.poll_interval(),
    ));

    let orchestrator = SubmissionOrchestrator::new(
        FakeSurface::new(page.clone()).with_auto_load(events.clone()),
        host.clone(),
        reporter.clone(),
        poller,
        events.clone(),
        OrchestratorSettings::from_config(&config),
    );
    tokio::spawn(orchestrator.run(receiver));

    Relay {
        ingress: IngressClient::new(config.ws_url.clone(), config.reconnect_delay(), host, events),
        page,
        reporter,
        reader,
    }
}

#[tokio::test(start_paused = true)]
async fn test_submission_without_redirect_is_reported_once() {
    logging::init(true);
    let relay = spawn_relay();
    relay.page.set_top_record(Some(record("7001")));
    relay.reader.script(
        "https://qoj.ac/submission/7001",
        &[Some("Waiting"), Some("Judging"), Some("Accepted")],
    );

    assert!(relay
        .ingress
        .dispatch(r#"{"problemCode":"B","language":"C++17","code":"int main(){}","requestId":"req-1"}"#)
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_secs(30)).await;

    // 表单页 → 延迟强制跳转 → 提交列表
    assert_eq!(
        relay.page.navigations(),
        vec![
            "https://qoj.ac/contest/2100/problem/B".to_string(),
            "https://qoj.ac/contest/2100/submissions".to_string(),
        ]
    );
    assert_eq!(
        relay.page.fills(),
        vec![("int main(){}".to_string(), Some("C++17".to_string()))]
    );
    assert_eq!(relay.reporter.records(), vec![("req-1".to_string(), record("7001"))]);
    assert_eq!(relay.page.detaches(), 1);
    assert_eq!(
        relay.reporter.verdicts(),
        vec![("7001".to_string(), "Accepted".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_requests_only_report_latest() {
    let relay = spawn_relay();
    relay.page.set_top_record(Some(record("8002")));
    relay
        .reader
        .script("https://qoj.ac/submission/8002", &[Some("Wrong Answer")]);

    for (problem, id) in [("A", "req-a"), ("C", "req-c")] {
        let message = format!(
            r#"{{"problemCode":"{}","code":"solve_{}()","requestId":"{}"}}"#,
            problem, problem, id
        );
        assert!(relay.ingress.dispatch(&message).await.unwrap());
    }
    tokio::time::sleep(Duration::from_secs(30)).await;

    // 只填写一次，且填写的是后到的请求
    assert_eq!(relay.page.fills(), vec![("solve_C()".to_string(), None)]);
    assert_eq!(relay.reporter.records(), vec![("req-c".to_string(), record("8002"))]);
    assert_eq!(
        relay.reporter.verdicts(),
        vec![("8002".to_string(), "Wrong Answer".to_string())]
    );
    assert_eq!(relay.page.detaches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_push_has_no_effect() {
    let relay = spawn_relay();
    assert!(!relay.ingress.dispatch("{}").await.unwrap());
    assert!(!relay
        .ingress
        .dispatch(r#"{"problemCode":"A"}"#)
        .await
        .unwrap());
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(relay.page.navigations().is_empty());
    assert!(relay.reporter.records().is_empty());
}

#[tokio::test]
#[ignore] // 需要调试端口上运行的浏览器：cargo test -- --ignored
async fn test_browser_connection() {
    logging::init(true);
    let config = Config::from_env();

    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;
    assert!(result.is_ok(), "浏览器连接应该成功");
}
