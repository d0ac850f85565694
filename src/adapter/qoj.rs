//! QOJ 页面适配器
//!
//! 通过 JsExecutor 在页面内执行脚本完成查询和填写

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::adapter::{HostPage, PageAdapter};
use crate::config::ListingLayout;
use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::models::{ListingCell, PageContext, PageKind, SubmissionRecord};

/// 页面信号
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSignals {
    url: String,
    has_form: bool,
}

/// 填写脚本的执行结果
#[derive(Debug, Deserialize)]
struct FillOutcome {
    ok: bool,
    #[serde(default)]
    step: String,
    #[serde(default)]
    mode: String,
}

const CLASSIFY_JS: &str = r#"
(() => {
    const form = document.querySelector('form#form-answer, #tab-submit-answer form');
    const toggle = document.querySelector('input[name$="_upload_type"]');
    const editor = document.querySelector('textarea[name$="_editor"]');
    return { url: location.href, hasForm: !!(form || toggle || editor) };
})()
"#;

const TOP_ROW_JS: &str = r#"
(() => {
    const row = document.querySelector('table tbody tr');
    if (!row) return [];
    return Array.from(row.querySelectorAll('td')).map(td => {
        const a = td.querySelector('a');
        return { text: (td.innerText || td.textContent || '').trim(), href: a ? a.href : null };
    });
})()
"#;

/// 生成填写并提交的脚本
///
/// 代码和语言以 JSON 字面量注入，避免手工转义
fn fill_script(code: &str, language: Option<&str>) -> AppResult<String> {
    let code = serde_json::to_string(code)?;
    let language = serde_json::to_string(&language)?;
    Ok(format!(
        r##"
((code, language) => {{
    const visible = el => !!el && el.offsetParent !== null;
    const fire = (el, type) => el.dispatchEvent(new Event(type, {{ bubbles: true }}));

    const tab = document.querySelector('a[href="#tab-submit-answer"]');
    if (tab) tab.click();

    const select = document.querySelector('select[name$="_language"]');
    if (select && language) {{
        const option = Array.from(select.options).find(o => o.value === language || o.text.trim() === language);
        if (option) {{
            select.value = option.value;
            fire(select, 'change');
        }}
    }}

    const editor = document.querySelector('textarea[name$="_editor"]');
    const file = document.querySelector('input[type="file"][name$="_file"]');
    let mode;
    if (visible(editor) || (editor && !visible(file))) {{
        const editorRadio = document.querySelector('input[name$="_upload_type"][value="editor"]');
        if (editorRadio && !editorRadio.checked) {{ editorRadio.click(); }}
        editor.value = code;
        const cm = editor.nextElementSibling && editor.nextElementSibling.CodeMirror;
        if (cm) cm.setValue(code);
        fire(editor, 'input');
        fire(editor, 'change');
        mode = 'editor';
    }} else if (file) {{
        const dt = new DataTransfer();
        dt.items.add(new File([code], 'answer.code', {{ type: 'text/plain' }}));
        file.files = dt.files;
        fire(file, 'input');
        fire(file, 'change');
        mode = 'file';
    }} else {{
        return {{ ok: false, step: 'editor' }};
    }}

    const button = document.querySelector('#button-submit-answer, form#form-answer button[type="submit"]');
    if (!button) return {{ ok: false, step: 'submit', mode }};
    button.click();
    return {{ ok: true, mode }};
}})({code}, {language})
"##
    ))
}

/// 嵌入页面适配器
pub struct QojAdapter {
    executor: JsExecutor,
    listing_pattern: String,
    layout: ListingLayout,
}

impl QojAdapter {
    pub fn new(executor: JsExecutor, listing_pattern: impl Into<String>, layout: ListingLayout) -> Self {
        Self {
            executor,
            listing_pattern: listing_pattern.into(),
            layout,
        }
    }
}

#[async_trait]
impl PageAdapter for QojAdapter {
    async fn classify_current_page(&self) -> AppResult<PageKind> {
        let signals: PageSignals = self.executor.eval_as(CLASSIFY_JS).await?;
        let kind = PageKind::classify(&signals.url, signals.has_form, &self.listing_pattern);
        debug!("页面分类: {} -> {:?}", signals.url, kind);
        Ok(kind)
    }

    async fn fill_and_submit(&self, code: &str, language: Option<&str>) -> AppResult<()> {
        let script = fill_script(code, language)?;
        let outcome: FillOutcome = self.executor.eval_as(script).await?;
        if !outcome.ok {
            return Err(AppError::control_missing(outcome.step));
        }
        info!("📤 已点击提交 (输入方式: {})", outcome.mode);
        Ok(())
    }

    async fn extract_top_record(&self) -> AppResult<Option<SubmissionRecord>> {
        let cells: Vec<ListingCell> = self.executor.eval_as(TOP_ROW_JS).await?;
        Ok(SubmissionRecord::from_row(&cells, &self.layout))
    }

    async fn cookie_header(&self) -> AppResult<Option<String>> {
        self.executor.cookie_header().await
    }
}

/// 宿主页面信息
#[derive(Debug, Deserialize)]
struct HostSignals {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

const HOST_JS: &str = r#"
(() => {
    const header = document.querySelector('h1.page-header, .page-header h1, h1');
    return { url: location.href, title: header ? header.textContent.trim() : null };
})()
"#;

fn problem_title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*#?([A-Za-z][0-9]*)\s*[.、:]").expect("合法的正则"))
}

/// 从题目标题（如 "C. Counting"）中提取题号
///
/// 只有题目页才会绑定题号
pub fn bound_problem_from(url: &str, title: Option<&str>) -> Option<String> {
    if !url.contains("/problem/") {
        return None;
    }
    let caps = problem_title_pattern().captures(title?)?;
    Some(caps.get(1)?.as_str().to_ascii_uppercase())
}

/// 宿主页面适配器
pub struct QojHostPage {
    executor: JsExecutor,
}

impl QojHostPage {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl HostPage for QojHostPage {
    async fn context(&self) -> AppResult<PageContext> {
        let signals: HostSignals = self.executor.eval_as(HOST_JS).await?;
        let bound = bound_problem_from(&signals.url, signals.title.as_deref());
        Ok(PageContext::new(signals.url, bound))
    }

    async fn problem_link(&self, problem_code: &str) -> AppResult<Option<String>> {
        let code = serde_json::to_string(problem_code)?;
        let script = format!(
            r#"
((code) => {{
    const wanted = code.trim().toUpperCase();
    for (const row of document.querySelectorAll('table tr')) {{
        const first = row.querySelector('td, th');
        if (!first || first.textContent.trim().toUpperCase() !== wanted) continue;
        const a = row.querySelector('a[href*="/problem/"]');
        if (a) return a.href;
    }}
    for (const a of document.querySelectorAll('a[href*="/problem/"]')) {{
        if (a.textContent.trim().toUpperCase().startsWith(wanted + '.')) return a.href;
    }}
    return null;
}})({code})
"#
        );
        let link: Option<String> = self.executor.eval_as(script).await?;
        Ok(link)
    }
}
