//! 嵌入页面
//!
//! 由编排器独占：创建、导航、销毁都只发生在这里。
//! 页面每次加载完成都会向编排器发送一个 `Loaded` 事件。

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::EventLoadEventFired;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::{PageAdapter, QojAdapter};
use crate::config::ListingLayout;
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::JsExecutor;
use crate::orchestrator::{EventSender, OrchestratorEvent};

/// 页面创建后的占位地址
pub const BLANK_URL: &str = "about:blank";

/// 嵌入页面的生命周期能力
#[async_trait]
pub trait BrowsingSurface: Send {
    /// 导航到 `url`；页面不存在时先创建，存在时复用
    async fn navigate(&mut self, url: &str) -> AppResult<()>;

    /// 页面当前是否存在
    fn is_present(&self) -> bool;

    /// 当前页面的适配器
    fn adapter(&self) -> Option<Arc<dyn PageAdapter>>;

    /// 销毁页面，释放全部引用
    async fn detach(&mut self) -> AppResult<()>;
}

struct SurfacePage {
    executor: JsExecutor,
    adapter: Arc<dyn PageAdapter>,
    listener: JoinHandle<()>,
}

/// 基于浏览器新标签页的嵌入页面
pub struct ChromeSurface {
    browser: Arc<Browser>,
    events: EventSender,
    listing_pattern: String,
    layout: ListingLayout,
    page: Option<SurfacePage>,
}

impl ChromeSurface {
    pub fn new(
        browser: Arc<Browser>,
        events: EventSender,
        listing_pattern: impl Into<String>,
        layout: ListingLayout,
    ) -> Self {
        Self {
            browser,
            events,
            listing_pattern: listing_pattern.into(),
            layout,
            page: None,
        }
    }

    async fn create_page(&self) -> AppResult<SurfacePage> {
        let page = self
            .browser
            .new_page(BLANK_URL)
            .await
            .map_err(|e| BrowserError::PageCreationFailed { source: Box::new(e) })?;
        let listener = spawn_load_listener(page.clone(), self.events.clone()).await?;

        let executor = JsExecutor::new(page);
        let adapter: Arc<dyn PageAdapter> = Arc::new(QojAdapter::new(
            executor.clone(),
            self.listing_pattern.clone(),
            self.layout.clone(),
        ));
        debug!("嵌入页面已创建");
        Ok(SurfacePage {
            executor,
            adapter,
            listener,
        })
    }
}

/// 把页面的 load 事件转发给编排器
async fn spawn_load_listener(page: Page, events: EventSender) -> AppResult<JoinHandle<()>> {
    let mut loads = page.event_listener::<EventLoadEventFired>().await?;
    Ok(tokio::spawn(async move {
        while loads.next().await.is_some() {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            if events.send(OrchestratorEvent::Loaded { url }).is_err() {
                break;
            }
        }
    }))
}

#[async_trait]
impl BrowsingSurface for ChromeSurface {
    async fn navigate(&mut self, url: &str) -> AppResult<()> {
        if self.page.is_none() {
            self.page = Some(self.create_page().await?);
        }
        let page = self.page.as_ref().ok_or(BrowserError::SurfaceMissing)?;
        info!("🧭 嵌入页面导航到: {}", url);
        page.executor.navigate(url).await
    }

    fn is_present(&self) -> bool {
        self.page.is_some()
    }

    fn adapter(&self) -> Option<Arc<dyn PageAdapter>> {
        self.page.as_ref().map(|p| p.adapter.clone())
    }

    async fn detach(&mut self) -> AppResult<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        page.listener.abort();
        if let Err(e) = page.executor.page().clone().close().await {
            warn!("关闭嵌入页面失败: {}", e);
        }
        info!("🧹 嵌入页面已销毁");
        Ok(())
    }
}
