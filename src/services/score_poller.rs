//! 评测结果轮询 - 业务能力层
//!
//! 按固定间隔重新读取记录页，直到出现终态结果，回报一次后停止。
//! 同一时间只有一个轮询任务，开始新的轮询会先取消旧的。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::adapter::StatusReader;
use crate::clients::Reporter;
use crate::models::{SubmissionRecord, VerdictStatus};

struct ActivePoll {
    sid: String,
    handle: JoinHandle<()>,
}

/// 评测结果轮询器
pub struct ScorePoller {
    reader: Arc<dyn StatusReader>,
    reporter: Arc<dyn Reporter>,
    interval: Duration,
    active: Mutex<Option<ActivePoll>>,
}

impl ScorePoller {
    pub fn new(reader: Arc<dyn StatusReader>, reporter: Arc<dyn Reporter>, interval: Duration) -> Self {
        Self {
            reader,
            reporter,
            interval,
            active: Mutex::new(None),
        }
    }

    /// 为一条提交记录开始轮询
    ///
    /// 无条件取消之前的轮询
    pub fn start(&self, record: &SubmissionRecord, cookie: Option<String>) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = active.take() {
            if !previous.handle.is_finished() {
                info!("[轮询 sid={}] 已被新的轮询取代", previous.sid);
            }
            previous.handle.abort();
        }

        info!("[轮询 sid={}] 🔄 开始轮询评测结果", record.sid);
        let handle = tokio::spawn(poll_until_terminal(
            self.reader.clone(),
            self.reporter.clone(),
            record.sid.clone(),
            record.record_url.clone(),
            cookie,
            self.interval,
        ));
        *active = Some(ActivePoll {
            sid: record.sid.clone(),
            handle,
        });
    }

    /// 取消当前轮询
    pub fn stop(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = active.take() {
            previous.handle.abort();
        }
    }

    /// 正在轮询的提交编号
    pub fn active_sid(&self) -> Option<String> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active
            .as_ref()
            .filter(|poll| !poll.handle.is_finished())
            .map(|poll| poll.sid.clone())
    }
}

impl Drop for ScorePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_until_terminal(
    reader: Arc<dyn StatusReader>,
    reporter: Arc<dyn Reporter>,
    sid: String,
    record_url: String,
    cookie: Option<String>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 第一次 tick 立即完成，跳过它，保证首次读取发生在一个间隔之后
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match reader.read_status_cell(&record_url, cookie.as_deref()).await {
            Ok(Some(raw)) => {
                let status = VerdictStatus::new(raw);
                if status.is_terminal() {
                    info!("[轮询 sid={}] ✅ 评测结束: {}", sid, status);
                    reporter.report_verdict(&sid, status.as_str());
                    return;
                }
                debug!("[轮询 sid={}] 状态: {:?}", sid, status.as_str());
            }
            Ok(None) => debug!("[轮询 sid={}] 记录页暂无状态", sid),
            Err(e) => warn!("[轮询 sid={}] ⚠️ 读取状态失败: {}", sid, e),
        }
    }
}
