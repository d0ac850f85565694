//! 回报客户端
//!
//! 向操作端发送两类通知：提交记录已获取、评测结果已确定。
//! 都是发出即不管的请求，失败只记日志，不做额外重试。

use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, ReportError};
use crate::models::SubmissionRecord;

/// 回报能力
///
/// 两个方法都不等待请求完成
pub trait Reporter: Send + Sync {
    /// 回报提交记录
    fn report_record(&self, request_id: &str, record: &SubmissionRecord);

    /// 回报评测结果
    fn report_verdict(&self, sid: &str, status: &str);
}

/// 基于 HTTP 表单 POST 的回报客户端
#[derive(Clone)]
pub struct ReportClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReportClient {
    /// 创建新的回报客户端
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST /submission-report`
    pub async fn post_record(&self, request_id: &str, record: &SubmissionRecord) -> AppResult<()> {
        let form = [
            ("request_id", request_id),
            ("sid", record.sid.as_str()),
            ("surl", record.record_url.as_str()),
            ("stime", record.submit_time.as_str()),
        ];
        self.post_form("/submission-report", &form).await
    }

    /// `POST /submission-score`
    pub async fn post_verdict(&self, sid: &str, status: &str) -> AppResult<()> {
        self.post_form("/submission-score", &[("sid", sid), ("status", status)])
            .await
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> AppResult<()> {
        let endpoint = format!("{}{}", self.base_url, path);
        debug!("POST {} {:?}", endpoint, form);

        let response = self
            .http
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::report_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }
            .into());
        }
        Ok(())
    }
}

impl Reporter for ReportClient {
    fn report_record(&self, request_id: &str, record: &SubmissionRecord) {
        let client = self.clone();
        let request_id = request_id.to_string();
        let record = record.clone();
        tokio::spawn(async move {
            match client.post_record(&request_id, &record).await {
                Ok(()) => info!("[请求 {}] ✓ 已回报提交记录 sid={}", request_id, record.sid),
                Err(e) => error!("[请求 {}] ❌ 回报提交记录失败: {}", request_id, e),
            }
        });
    }

    fn report_verdict(&self, sid: &str, status: &str) {
        let client = self.clone();
        let sid = sid.to_string();
        let status = status.to_string();
        tokio::spawn(async move {
            match client.post_verdict(&sid, &status).await {
                Ok(()) => info!("[轮询 sid={}] ✓ 已回报评测结果: {}", sid, status),
                Err(e) => error!("[轮询 sid={}] ❌ 回报评测结果失败: {}", sid, e),
            }
        });
    }
}
