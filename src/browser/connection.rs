use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// 连接到调试端口上已运行的浏览器，并找到宿主页面
///
/// 优先复用地址以 `target_url` 开头的已打开标签页（操作者可能已经登录并打开了比赛页面），
/// 找不到时新开一个标签页并导航过去
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if url.starts_with(target_url) {
                info!("✓ 找到宿主页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到宿主页面，创建新页面并导航到: {}", target_url);
    let page = browser.new_page(target_url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        BrowserError::PageCreationFailed { source: Box::new(e) }
    })?;
    info!("已导航到: {}", target_url);

    Ok((browser, page))
}
