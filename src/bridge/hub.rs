//! 中继客户端连接表
//!
//! 每个 WebSocket 连接有一个写任务，广播只是向各写任务的通道投递

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

type ClientMap = HashMap<Uuid, mpsc::UnboundedSender<String>>;

/// 已连接的中继客户端
#[derive(Default)]
pub struct ClientHub {
    clients: Mutex<ClientMap>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientMap> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登记一个客户端，返回它的编号和待发送消息的接收端
    pub fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.lock().insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 向全部客户端广播，投递失败的连接被移除；返回仍在线的客户端数
    pub fn broadcast<T: Serialize>(&self, payload: &T) -> usize {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ 序列化广播消息失败: {}", e);
                return self.len();
            }
        };

        let mut clients = self.lock();
        clients.retain(|id, tx| {
            let alive = tx.send(text.clone()).is_ok();
            if !alive {
                debug!("移除已断开的客户端 {}", id);
            }
            alive
        });
        clients.len()
    }

    /// 服务一个已升级的连接，直到任一方向断开
    pub async fn serve_socket(&self, socket: WebSocket) {
        let (id, mut outbox) = self.register();
        info!("🔗 中继客户端已连接 ({}), 当前 {} 个", id, self.len());

        let (mut sink, mut stream) = socket.split();
        let writer = tokio::spawn(async move {
            while let Some(text) = outbox.recv().await {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        // 客户端发来的内容一律忽略，只用来感知断开
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }

        writer.abort();
        self.unregister(&id);
        info!("中继客户端已断开 ({}), 剩余 {} 个", id, self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_prunes_dead_clients() {
        let hub = ClientHub::new();
        let (_, mut alive) = hub.register();
        let (_, dead) = hub.register();
        drop(dead);

        let sent = hub.broadcast(&serde_json::json!({"problemCode": "A"}));
        assert_eq!(sent, 1);
        assert_eq!(hub.len(), 1);
        assert_eq!(alive.try_recv().unwrap(), r#"{"problemCode":"A"}"#);
    }

    #[test]
    fn test_broadcast_without_clients() {
        let hub = ClientHub::new();
        assert_eq!(hub.broadcast(&serde_json::json!({})), 0);
        assert!(hub.is_empty());
    }
}
