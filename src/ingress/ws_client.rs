//! WebSocket 推送客户端
//!
//! 连接断开后按固定间隔无限重连；无法解析的消息直接丢弃

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::adapter::HostPage;
use crate::error::{AppError, AppResult, IngressError};
use crate::models::SubmissionRequest;
use crate::orchestrator::{EventSender, OrchestratorEvent};

/// 入站客户端
pub struct IngressClient {
    url: String,
    reconnect_delay: Duration,
    host: Arc<dyn HostPage>,
    events: EventSender,
}

impl IngressClient {
    pub fn new(
        url: impl Into<String>,
        reconnect_delay: Duration,
        host: Arc<dyn HostPage>,
        events: EventSender,
    ) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
            host,
            events,
        }
    }

    /// 保持连接直到事件通道关闭
    pub async fn run(self) -> AppResult<()> {
        loop {
            match self.connect_once().await {
                Ok(()) => info!("🔌 推送连接已断开"),
                Err(e @ AppError::Ingress(IngressError::ChannelClosed)) => {
                    return Err(e);
                }
                Err(e) => warn!("⚠️ 推送连接失败: {}", e),
            }
            if self.events.is_closed() {
                return Err(IngressError::ChannelClosed.into());
            }
            debug!("{} 毫秒后重连", self.reconnect_delay.as_millis());
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// 建立一次连接并读取到断开为止
    async fn connect_once(&self) -> AppResult<()> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| IngressError::ConnectFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        info!("✓ 已连接推送服务: {}", self.url);

        let (_write, mut read) = stream.split();
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    self.dispatch(text.as_str()).await?;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("⚠️ 读取推送消息失败: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// 处理一条推送消息，返回是否转发给了编排器
    pub async fn dispatch(&self, text: &str) -> AppResult<bool> {
        let Some(request) = SubmissionRequest::from_message(text) else {
            debug!("丢弃无效推送消息: {}", crate::utils::truncate_text(text, 80));
            return Ok(false);
        };

        match self.host.context().await {
            Ok(context) if !context.is_relevant(&request.problem_code) => {
                info!(
                    "[请求 {}] 宿主页面绑定的是题目 {}，忽略题目 {}",
                    request.label(),
                    context.bound_problem.as_deref().unwrap_or("-"),
                    request.problem_code
                );
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) => debug!("读取宿主页面失败，不做相关性过滤: {}", e),
        }

        self.events
            .send(OrchestratorEvent::Request(request))
            .map_err(|_| IngressError::ChannelClosed)?;
        Ok(true)
    }
}
