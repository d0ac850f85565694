//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 提交自动化状态机：独占嵌入页面，决定导航目标，
//! 触发适配器的填写/提交/读取，并保证每个请求最多回报一次。
//!
//! ## 模块划分
//!
//! ### `event` - 事件
//! - 入站请求、页面加载完成、定时器到期三类事件
//! - 所有事件进入同一个通道，由编排器任务逐个处理
//!
//! ### `session` - 会话
//! - 当前请求及其标志位、定时器句柄
//! - 新请求到来时先取消旧定时器，再整体替换
//!
//! ### `submission` - 状态机
//! - Idle → Navigating → Filling → Submitted → RecordExtracted → Closing → Idle
//!
//! ## 层次关系
//!
//! ```text
//! ingress (WebSocket 推送)
//!     ↓ OrchestratorEvent::Request
//! orchestrator::SubmissionOrchestrator ← OrchestratorEvent::Loaded / Timer
//!     ↓
//! browser::BrowsingSurface + adapter::PageAdapter
//!     ↓
//! clients::Reporter / services::ScorePoller
//! ```

pub mod event;
pub mod session;
pub mod submission;

pub use event::{channel, EventReceiver, EventSender, OrchestratorEvent, TimerKind};
pub use session::{OrchestrationSession, Phase, Step};
pub use submission::{OrchestratorSettings, SubmissionOrchestrator};
