//! 操作端桥接服务
//!
//! 接收命令行推送的源文件，广播给已连接的中继，
//! 并收集中继回报的提交记录和评测结果

pub mod hub;
pub mod pending;
pub mod server;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::error::{AppError, AppResult};

pub use hub::ClientHub;
pub use pending::{PendingOutcome, PendingResults, RecordReport, VerdictBoard};
pub use server::{router, BridgeState};

/// 绑定地址并运行桥接服务
pub async fn serve(bind: &str, default_language: &str) -> AppResult<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| AppError::Bridge(format!("绑定 {} 失败: {}", bind, e)))?;
    serve_on(listener, Arc::new(BridgeState::new(default_language))).await
}

/// 在已绑定的监听器上运行桥接服务
pub async fn serve_on(listener: TcpListener, state: Arc<BridgeState>) -> AppResult<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Bridge(e.to_string()))?;
    info!("🌉 桥接服务已启动: http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Bridge(e.to_string()))
}
