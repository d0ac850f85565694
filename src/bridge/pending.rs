//! 等待回报的提交结果
//!
//! 每个请求编号对应一个 `watch` 通道，回报到达后值从 `None` 变为 `Some`。
//! 结果被成功取走一次后即移除；两张表都有容量上限，超出时淘汰最早登记的条目。

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::models::SubmissionRecord;

/// 每张表最多保留的条目数
pub const DEFAULT_CAPACITY: usize = 1024;

/// 查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOutcome {
    /// 从未登记过（或已被取走、淘汰）
    Unknown,
    /// 等待超时仍未回报
    Pending,
    /// 已回报
    Done(SubmissionRecord),
}

/// 回报表单
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordReport {
    pub request_id: String,
    pub sid: String,
    pub surl: String,
    pub stime: String,
}

impl RecordReport {
    pub fn into_record(self) -> (String, SubmissionRecord) {
        (
            self.request_id,
            SubmissionRecord {
                sid: self.sid,
                record_url: self.surl,
                submit_time: self.stime,
            },
        )
    }
}

/// 按登记顺序淘汰的有界表
struct BoundedMap<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V> BoundedMap<V> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: &str, value: V) {
        if self.entries.insert(key.to_string(), value).is_some() {
            return;
        }
        self.order.push_back(key.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                debug!("淘汰最早的条目 {}", oldest);
                self.entries.remove(&oldest);
            }
        }
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

type Slot = watch::Sender<Option<SubmissionRecord>>;

/// 请求编号 → 提交记录
pub struct PendingResults {
    slots: Mutex<BoundedMap<Slot>>,
}

impl Default for PendingResults {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PendingResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(BoundedMap::new(capacity)),
        }
    }

    /// 登记一个等待中的请求
    pub fn register(&self, request_id: &str) {
        let (tx, _) = watch::channel(None);
        self.lock().insert(request_id, tx);
    }

    /// 写入回报；未登记的编号返回 false
    pub fn resolve(&self, request_id: &str, record: SubmissionRecord) -> bool {
        match self.lock().get(request_id) {
            Some(slot) => {
                slot.send_replace(Some(record));
                true
            }
            None => false,
        }
    }

    /// 最多等待 `timeout` 取得结果，取得后移除该条目
    pub async fn wait(&self, request_id: &str, timeout: Duration) -> PendingOutcome {
        let Some(mut rx) = self.lock().get(request_id).map(|slot| slot.subscribe()) else {
            return PendingOutcome::Unknown;
        };

        let record = match tokio::time::timeout(timeout, rx.wait_for(|value| value.is_some())).await {
            Ok(Ok(value)) => value.clone(),
            _ => None,
        };
        match record {
            Some(record) => {
                self.lock().remove(request_id);
                PendingOutcome::Done(record)
            }
            None => PendingOutcome::Pending,
        }
    }

    /// 当前保留的条目数
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BoundedMap<Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 提交编号 → 评测结果
pub struct VerdictBoard {
    verdicts: Mutex<BoundedMap<String>>,
}

impl Default for VerdictBoard {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl VerdictBoard {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            verdicts: Mutex::new(BoundedMap::new(capacity)),
        }
    }

    pub fn record(&self, sid: &str, status: &str) {
        self.lock().insert(sid, status.to_string());
    }

    pub fn get(&self, sid: &str) -> Option<String> {
        self.lock().get(sid).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BoundedMap<String>> {
        self.verdicts.lock().unwrap_or_else(|e| e.into_inner())
    }
}
