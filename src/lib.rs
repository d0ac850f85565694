//! # QOJ Submit Relay
//!
//! 把操作端推送的代码自动提交到 QOJ，读取提交记录并轮询评测结果，
//! 再把两者回报给操作端
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - `JsExecutor` 持有 Page，只暴露 eval / 导航能力
//! - `browser/` - 浏览器连接、无头启动、嵌入页面生命周期
//!
//! ### ② 适配层（Adapter）
//! - `adapter/` - 评测站点相关的全部细节：页面分类、表单填写、表格解析
//!
//! ### ③ 业务能力层（Services / Clients）
//! - `services/score_poller` - 评测结果轮询
//! - `clients/report_client` - 回报接口
//!
//! ### ④ 编排层（Orchestration）
//! - `ingress/` - WebSocket 推送接入
//! - `orchestrator/` - 提交状态机，独占嵌入页面
//!
//! ### 操作端
//! - `bridge/` - 桥接服务（广播推送、收集回报）
//! - `cli/` - 命令行，含 `submit` 子命令
//!
//! ## 模块结构

pub mod adapter;
pub mod app;
pub mod bridge;
pub mod browser;
pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod ingress;
pub mod models;
pub mod orchestrator;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{SubmissionRecord, SubmissionRequest};
pub use orchestrator::SubmissionOrchestrator;
