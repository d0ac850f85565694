//! JS 执行器 - 基础设施层
//!
//! 持有一个 Page，只暴露“执行 JS / 导航 / 读地址”的能力

use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源
/// - 暴露 eval() 能力
/// - 不认识提交请求 / 提交记录
/// - 不管理页面生命周期
#[derive(Clone)]
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 发起导航，不等待页面加载完成
    ///
    /// 加载完成由页面的 load 事件通知
    pub async fn navigate(&self, url: &str) -> AppResult<()> {
        self.page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    /// 把浏览器中的 cookie 拼成 `Cookie` 请求头
    pub async fn cookie_header(&self) -> AppResult<Option<String>> {
        let cookies = self.page.get_cookies().await?;
        if cookies.is_empty() {
            return Ok(None);
        }
        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(Some(header))
    }
}
