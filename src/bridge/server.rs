//! 桥接服务的 HTTP 路由

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ws::WebSocketUpgrade, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::hub::ClientHub;
use crate::bridge::pending::{PendingOutcome, PendingResults, RecordReport, VerdictBoard};
use crate::models::SubmissionRequest;
use crate::utils::truncate_text;

/// 结果查询的默认等待秒数
const DEFAULT_RESULT_TIMEOUT_SECS: f64 = 30.0;
/// 结果查询的最长等待秒数
const MAX_RESULT_TIMEOUT_SECS: f64 = 600.0;

/// 桥接服务共享状态
pub struct BridgeState {
    pub hub: ClientHub,
    pub pending: PendingResults,
    pub verdicts: VerdictBoard,
    default_language: String,
}

impl BridgeState {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            hub: ClientHub::new(),
            pending: PendingResults::new(),
            verdicts: VerdictBoard::default(),
            default_language: default_language.into(),
        }
    }
}

/// 广播给中继客户端的提交消息
#[derive(Debug, Serialize)]
struct SubmitBroadcast {
    #[serde(flatten)]
    request: SubmissionRequest,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    status: &'static str,
    sent_to_clients: usize,
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct VerdictReport {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ResultQuery {
    timeout: Option<f64>,
}

/// 构建路由
pub fn router(state: Arc<BridgeState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/submit", post(submit_handler))
        .route("/submission-report", post(report_handler))
        .route("/submission-score", post(score_report_handler))
        .route("/submission-result/{request_id}", get(result_handler))
        .route("/submission-score/{sid}", get(score_query_handler))
        .layer(cors)
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BridgeState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.hub.serve_socket(socket).await })
}

fn unprocessable(detail: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": detail.into() })),
    )
}

async fn submit_handler(
    State(state): State<Arc<BridgeState>>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<Value>)> {
    let mut problem_code = None;
    let mut language = None;
    let mut code = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(unprocessable(format!("multipart 解析失败: {}", e))),
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "problem_code" | "language" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| unprocessable(format!("字段 {} 读取失败: {}", name, e)))?;
                if name == "problem_code" {
                    problem_code = Some(text);
                } else {
                    language = Some(text);
                }
            }
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| unprocessable(format!("文件读取失败: {}", e)))?;
                code = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            other => debug!("忽略未知字段 {}", other),
        }
    }

    let problem_code = problem_code
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| unprocessable("缺少 problem_code"))?;
    let code = code.ok_or_else(|| unprocessable("缺少 file"))?;
    let language = language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.default_language.clone());

    let request_id = Uuid::new_v4().simple().to_string();
    let broadcast = SubmitBroadcast {
        request: SubmissionRequest::new(problem_code.trim(), code)
            .with_language(language)
            .with_request_id(request_id.clone()),
        timestamp: chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.6fZ")
            .to_string(),
    };
    info!(
        "[请求 {}] 📤 收到提交: 题目 {} 语言 {}",
        request_id,
        broadcast.request.problem_code,
        broadcast.request.language.as_deref().unwrap_or("-")
    );
    debug!("代码:\n{}", truncate_text(&broadcast.request.code, 2000));

    state.pending.register(&request_id);
    let sent_to_clients = state.hub.broadcast(&broadcast);
    if sent_to_clients == 0 {
        warn!("[请求 {}] ⚠️ 没有已连接的中继客户端", request_id);
    }

    Ok(Json(SubmitResponse {
        status: "queued",
        sent_to_clients,
        request_id,
    }))
}

async fn report_handler(
    State(state): State<Arc<BridgeState>>,
    Form(report): Form<RecordReport>,
) -> Json<Value> {
    let (request_id, record) = report.into_record();
    info!(
        "[请求 {}] 📄 提交记录: sid={} {}",
        request_id, record.sid, record.record_url
    );
    if !state.pending.resolve(&request_id, record) {
        debug!("[请求 {}] 未登记的请求编号", request_id);
    }
    Json(json!({ "status": "ok" }))
}

async fn score_report_handler(
    State(state): State<Arc<BridgeState>>,
    Form(report): Form<VerdictReport>,
) -> Json<Value> {
    info!("[轮询 sid={}] ✅ 评测结果: {}", report.sid, report.status);
    state.verdicts.record(&report.sid, &report.status);
    Json(json!({ "status": "ok" }))
}

async fn result_handler(
    State(state): State<Arc<BridgeState>>,
    Path(request_id): Path<String>,
    Query(query): Query<ResultQuery>,
) -> Json<Value> {
    match state
        .pending
        .wait(&request_id, result_timeout(query.timeout))
        .await
    {
        PendingOutcome::Unknown => Json(json!({ "status": "unknown" })),
        PendingOutcome::Pending => Json(json!({ "status": "pending" })),
        PendingOutcome::Done(record) => Json(json!({
            "status": "done",
            "sid": record.sid,
            "surl": record.record_url,
            "stime": record.submit_time,
        })),
    }
}

/// 查询参数中的等待时间；非法值用默认值，过大的值截断
fn result_timeout(requested: Option<f64>) -> Duration {
    let secs = requested
        .filter(|t| t.is_finite() && *t >= 0.0)
        .unwrap_or(DEFAULT_RESULT_TIMEOUT_SECS)
        .min(MAX_RESULT_TIMEOUT_SECS);
    Duration::from_secs_f64(secs)
}

async fn score_query_handler(
    State(state): State<Arc<BridgeState>>,
    Path(sid): Path<String>,
) -> Json<Value> {
    match state.verdicts.get(&sid) {
        Some(verdict) => Json(json!({ "status": "done", "verdict": verdict })),
        None => Json(json!({ "status": "unknown" })),
    }
}
