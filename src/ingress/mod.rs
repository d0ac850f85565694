//! 请求入站
//!
//! 连接操作端的 WebSocket 推送，把合法且与宿主页面相关的提交请求
//! 转换为编排器事件

pub mod ws_client;

pub use ws_client::IngressClient;
