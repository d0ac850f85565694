use tokio::sync::mpsc;

use crate::models::SubmissionRequest;

/// 会话定时器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 提交后强制跳转到提交列表
    Renavigate,
    /// 到达提交列表后延迟关闭嵌入页面
    Close,
}

/// 编排器事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// 入站提交请求
    Request(SubmissionRequest),
    /// 嵌入页面加载完成
    Loaded { url: String },
    /// 会话定时器到期，`generation` 用于丢弃旧会话的定时器
    Timer { generation: u64, kind: TimerKind },
}

pub type EventSender = mpsc::UnboundedSender<OrchestratorEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<OrchestratorEvent>;

/// 创建编排器事件通道
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
