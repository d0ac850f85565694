//! 记录页状态读取
//!
//! 不经过嵌入页面，直接带着浏览器 cookie 抓取记录页 HTML

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::COOKIE;
use tracing::debug;

use crate::adapter::StatusReader;
use crate::error::{AdapterError, AppResult};

struct Patterns {
    tbody: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
    numeric_entity: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        tbody: Regex::new(r"(?is)<tbody[^>]*>(.*?)</tbody>").expect("合法的正则"),
        row: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("合法的正则"),
        cell: Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("合法的正则"),
        tag: Regex::new(r"(?s)<[^>]+>").expect("合法的正则"),
        numeric_entity: Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("合法的正则"),
    })
}

/// 去掉标签并解码实体
///
/// 只识别数字实体和 `&nbsp;` `&lt;` `&gt;` `&quot;` `&#39;` `&amp;`，
/// 其它命名实体原样保留（评测结果单元格里不会出现）
fn cell_text(html: &str) -> String {
    let p = patterns();
    let text = p.tag.replace_all(html, " ");
    let text = p.numeric_entity.replace_all(&text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从记录页 HTML 中读取第一行的评测结果单元格
///
/// 找不到表格、行或该列时返回 `None`
pub fn parse_status_cell(html: &str, result_column: usize) -> Option<String> {
    let p = patterns();
    let body = p
        .tbody
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html);
    let row = p.row.captures(body)?.get(1)?.as_str();
    let cell = p.cell.captures_iter(row).nth(result_column)?.get(1)?.as_str();
    Some(cell_text(cell))
}

/// 基于 HTTP 的状态读取器
pub struct HttpStatusReader {
    http: reqwest::Client,
    result_column: usize,
}

impl HttpStatusReader {
    pub fn new(result_column: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            result_column,
        }
    }
}

#[async_trait]
impl StatusReader for HttpStatusReader {
    async fn read_status_cell(
        &self,
        record_url: &str,
        cookie: Option<&str>,
    ) -> AppResult<Option<String>> {
        let mut request = self.http.get(record_url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let fetch_failed = |message: String| AdapterError::StatusFetchFailed {
            url: record_url.to_string(),
            message,
        };

        let response = request.send().await.map_err(|e| fetch_failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_failed(format!("HTTP {}", response.status())).into());
        }
        let html = response.text().await.map_err(|e| fetch_failed(e.to_string()))?;

        let status = parse_status_cell(&html, self.result_column);
        debug!("记录页 {} 状态: {:?}", record_url, status);
        Ok(status)
    }
}
