//! 编排会话
//!
//! 一次请求从导航到回报的全部可变状态，只归编排器所有

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::{PageKind, SubmissionRequest};
use crate::orchestrator::event::{EventSender, OrchestratorEvent, TimerKind};

/// 会话所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 没有请求
    Idle,
    /// 正在前往表单页
    Navigating,
    /// 已提交，等待提交列表
    Submitted,
    /// 已读取提交列表
    RecordExtracted,
    /// 嵌入页面已销毁
    Closed,
}

/// 页面加载后要执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 忽略这次加载
    Ignore,
    /// 填写并提交表单
    Fill,
    /// 读取提交记录
    Extract,
}

/// 编排会话
pub struct OrchestrationSession {
    generation: u64,
    active_request: Option<SubmissionRequest>,
    /// 嵌入页面是否存在
    pub frame_present: bool,
    /// 提交记录是否已回报
    pub report_sent: bool,
    /// 嵌入页面是否已为当前请求销毁
    pub already_closed: bool,
    /// 当前请求是否已经尝试过填写提交
    pub submitted: bool,
    /// 提交列表页地址
    pub listing_url: Option<String>,
    phase: Phase,
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl OrchestrationSession {
    pub fn new() -> Self {
        Self {
            generation: 0,
            active_request: None,
            frame_present: false,
            report_sent: false,
            already_closed: false,
            submitted: false,
            listing_url: None,
            phase: Phase::Idle,
            timers: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_request(&self) -> Option<&SubmissionRequest> {
        self.active_request.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        debug!("会话阶段: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// 用新请求替换当前会话
    ///
    /// 先同步取消旧会话的全部定时器，再重置标志位
    pub fn supersede(&mut self, request: SubmissionRequest) {
        self.cancel_all_timers();
        self.generation += 1;
        self.active_request = Some(request);
        self.report_sent = false;
        self.already_closed = false;
        self.submitted = false;
        self.listing_url = None;
        self.phase = Phase::Navigating;
    }

    /// 定时器事件是否属于当前会话
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// 页面加载后的动作，只取决于页面种类和会话标志位
    ///
    /// 尚未提交时到达的提交列表属于被取代的旧请求，不读取
    pub fn next_step(&self, kind: PageKind) -> Step {
        if self.active_request.is_none() || self.already_closed {
            return Step::Ignore;
        }
        match kind {
            PageKind::Blank => Step::Ignore,
            PageKind::Listing if self.submitted => Step::Extract,
            PageKind::Listing => Step::Ignore,
            PageKind::Form | PageKind::Unknown if !self.submitted => Step::Fill,
            PageKind::Form | PageKind::Unknown => Step::Ignore,
        }
    }

    /// 启动（或重新启动）一个会话定时器
    ///
    /// 到期时向编排器发送带当前 generation 的 `Timer` 事件
    pub fn arm(&mut self, kind: TimerKind, delay: Duration, events: &EventSender) {
        self.cancel(kind);
        let generation = self.generation;
        let events = events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(OrchestratorEvent::Timer { generation, kind });
        });
        self.timers.insert(kind, handle);
    }

    /// 取消一个会话定时器
    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timers.remove(&kind) {
            handle.abort();
        }
    }

    /// 取消全部会话定时器
    pub fn cancel_all_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    /// 是否有尚未触发的定时器
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers
            .get(&kind)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Default for OrchestrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OrchestrationSession {
    fn drop(&mut self) {
        self.cancel_all_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::event::channel;

    #[test]
    fn test_next_step_without_request_ignores_everything() {
        let session = OrchestrationSession::new();
        for kind in [PageKind::Form, PageKind::Listing, PageKind::Blank, PageKind::Unknown] {
            assert_eq!(session.next_step(kind), Step::Ignore);
        }
    }

    #[test]
    fn test_next_step_transitions() {
        let mut session = OrchestrationSession::new();
        session.supersede(SubmissionRequest::new("C", "code"));

        assert_eq!(session.next_step(PageKind::Blank), Step::Ignore);
        assert_eq!(session.next_step(PageKind::Form), Step::Fill);
        assert_eq!(session.next_step(PageKind::Unknown), Step::Fill);
        assert_eq!(session.next_step(PageKind::Listing), Step::Ignore);

        session.submitted = true;
        assert_eq!(session.next_step(PageKind::Form), Step::Ignore);
        assert_eq!(session.next_step(PageKind::Listing), Step::Extract);

        session.already_closed = true;
        assert_eq!(session.next_step(PageKind::Listing), Step::Ignore);
    }

    #[test]
    fn test_supersede_resets_flags() {
        let mut session = OrchestrationSession::new();
        session.supersede(SubmissionRequest::new("A", "a"));
        session.report_sent = true;
        session.already_closed = true;
        session.submitted = true;
        let first = session.generation();

        session.supersede(SubmissionRequest::new("B", "b"));
        assert!(!session.report_sent);
        assert!(!session.already_closed);
        assert!(!session.submitted);
        assert_eq!(session.phase(), Phase::Navigating);
        assert!(!session.is_current(first));
        assert_eq!(session.active_request().map(|r| r.problem_code.as_str()), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_cancels_pending_timers() {
        let (tx, mut rx) = channel();
        let mut session = OrchestrationSession::new();
        session.supersede(SubmissionRequest::new("A", "a"));
        session.arm(TimerKind::Renavigate, Duration::from_secs(1), &tx);
        session.arm(TimerKind::Close, Duration::from_millis(400), &tx);
        assert!(session.is_armed(TimerKind::Close));

        session.supersede(SubmissionRequest::new("B", "b"));
        assert!(!session.is_armed(TimerKind::Renavigate));
        assert!(!session.is_armed(TimerKind::Close));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_debounces() {
        let (tx, mut rx) = channel();
        let mut session = OrchestrationSession::new();
        session.supersede(SubmissionRequest::new("A", "a"));

        session.arm(TimerKind::Close, Duration::from_millis(400), &tx);
        tokio::time::sleep(Duration::from_millis(300)).await;
        session.arm(TimerKind::Close, Duration::from_millis(400), &tx);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            OrchestratorEvent::Timer {
                generation: session.generation(),
                kind: TimerKind::Close
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
