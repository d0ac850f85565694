//! 测试替身
//!
//! 提供：
//! - [`FakePage`] / [`FakeSurface`] / [`FakeAdapter`]：不需要浏览器的嵌入页面
//! - [`FakeHostPage`]：固定上下文的宿主页面
//! - [`ScriptedStatusReader`]：按脚本返回评测状态
//! - [`RecordingReporter`]：记录所有回报而不发请求
//!
//! 编排器、轮询器的单元测试和 `tests/` 下的集成测试共用这些替身

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::adapter::{HostPage, PageAdapter, StatusReader};
use crate::browser::BrowsingSurface;
use crate::clients::Reporter;
use crate::error::{AdapterError, AppError, AppResult};
use crate::models::{PageContext, PageKind, SubmissionRecord};
use crate::orchestrator::{EventSender, OrchestratorEvent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
struct FakePageState {
    current_url: String,
    navigations: Vec<String>,
    fills: Vec<(String, Option<String>)>,
    detaches: usize,
    extract_calls: usize,
    top_record: Option<SubmissionRecord>,
    fail_fill: bool,
    cookie: Option<String>,
}

/// 假页面的共享状态，测试持有一份句柄用来设置和检查
#[derive(Clone, Debug, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakePageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置提交列表最新一行
    pub fn set_top_record(&self, record: Option<SubmissionRecord>) {
        lock(&self.state).top_record = record;
    }

    /// 让下一次以及之后的填写全部失败
    pub fn set_fail_fill(&self, fail: bool) {
        lock(&self.state).fail_fill = fail;
    }

    pub fn set_cookie(&self, cookie: impl Into<String>) {
        lock(&self.state).cookie = Some(cookie.into());
    }

    /// 模拟页面自行跳转（例如提交后站点重定向）
    pub fn set_current_url(&self, url: impl Into<String>) {
        lock(&self.state).current_url = url.into();
    }

    pub fn current_url(&self) -> String {
        lock(&self.state).current_url.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        lock(&self.state).navigations.clone()
    }

    pub fn fills(&self) -> Vec<(String, Option<String>)> {
        lock(&self.state).fills.clone()
    }

    pub fn detaches(&self) -> usize {
        lock(&self.state).detaches
    }

    pub fn extract_calls(&self) -> usize {
        lock(&self.state).extract_calls
    }
}

/// 不需要浏览器的嵌入页面
pub struct FakeSurface {
    page: FakePage,
    present: bool,
    auto_load: Option<EventSender>,
}

impl FakeSurface {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            present: false,
            auto_load: None,
        }
    }

    /// 每次导航后立即发送一个 `Loaded` 事件
    pub fn with_auto_load(mut self, events: EventSender) -> Self {
        self.auto_load = Some(events);
        self
    }

    pub fn page(&self) -> &FakePage {
        &self.page
    }
}

#[async_trait]
impl BrowsingSurface for FakeSurface {
    async fn navigate(&mut self, url: &str) -> AppResult<()> {
        {
            let mut state = lock(&self.page.state);
            state.current_url = url.to_string();
            state.navigations.push(url.to_string());
        }
        self.present = true;
        if let Some(events) = &self.auto_load {
            let _ = events.send(OrchestratorEvent::Loaded {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.present
    }

    fn adapter(&self) -> Option<Arc<dyn PageAdapter>> {
        if !self.present {
            return None;
        }
        Some(Arc::new(FakeAdapter {
            page: self.page.clone(),
        }))
    }

    async fn detach(&mut self) -> AppResult<()> {
        if self.present {
            self.present = false;
            lock(&self.page.state).detaches += 1;
        }
        Ok(())
    }
}

/// 假页面的适配器
///
/// 路径含 `/problem/` 视为表单页，含 `/submissions` 视为提交列表
pub struct FakeAdapter {
    page: FakePage,
}

#[async_trait]
impl PageAdapter for FakeAdapter {
    async fn classify_current_page(&self) -> AppResult<PageKind> {
        let url = self.page.current_url();
        Ok(PageKind::classify(&url, url.contains("/problem/"), "/submissions"))
    }

    async fn fill_and_submit(&self, code: &str, language: Option<&str>) -> AppResult<()> {
        let mut state = lock(&self.page.state);
        state
            .fills
            .push((code.to_string(), language.map(str::to_string)));
        if state.fail_fill {
            return Err(AppError::control_missing("#button-submit-answer"));
        }
        Ok(())
    }

    async fn extract_top_record(&self) -> AppResult<Option<SubmissionRecord>> {
        let mut state = lock(&self.page.state);
        state.extract_calls += 1;
        Ok(state.top_record.clone())
    }

    async fn cookie_header(&self) -> AppResult<Option<String>> {
        Ok(lock(&self.page.state).cookie.clone())
    }
}

/// 固定上下文的宿主页面
pub struct FakeHostPage {
    url: String,
    bound_problem: Option<String>,
    links: HashMap<String, String>,
    fail_context: bool,
}

impl FakeHostPage {
    pub fn new(url: impl Into<String>, bound_problem: Option<&str>) -> Self {
        Self {
            url: url.into(),
            bound_problem: bound_problem.map(str::to_string),
            links: HashMap::new(),
            fail_context: false,
        }
    }

    /// 在导航表中加入一个题目链接
    pub fn with_link(mut self, problem_code: &str, url: impl Into<String>) -> Self {
        self.links.insert(problem_code.to_uppercase(), url.into());
        self
    }

    /// 读取上下文总是失败
    pub fn unreadable(mut self) -> Self {
        self.fail_context = true;
        self
    }
}

#[async_trait]
impl HostPage for FakeHostPage {
    async fn context(&self) -> AppResult<PageContext> {
        if self.fail_context {
            return Err(AppError::Other("宿主页面不可读".to_string()));
        }
        Ok(PageContext::new(self.url.clone(), self.bound_problem.clone()))
    }

    async fn problem_link(&self, problem_code: &str) -> AppResult<Option<String>> {
        Ok(self.links.get(&problem_code.to_uppercase()).cloned())
    }
}

type ScriptedRead = Result<Option<String>, String>;

/// 按脚本返回评测状态的读取器
///
/// 脚本耗尽后一直返回 `Ok(None)`
#[derive(Default)]
pub struct ScriptedStatusReader {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedRead>>>,
    calls: Mutex<HashMap<String, usize>>,
    last_cookie: Mutex<Option<String>>,
}

impl ScriptedStatusReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加若干次读取结果
    pub fn script(&self, record_url: &str, statuses: &[Option<&str>]) {
        let mut scripts = lock(&self.scripts);
        let queue = scripts.entry(record_url.to_string()).or_default();
        queue.extend(statuses.iter().map(|s| Ok(s.map(str::to_string))));
    }

    /// 追加 `count` 次读取失败
    pub fn fail_next(&self, record_url: &str, count: usize) {
        let mut scripts = lock(&self.scripts);
        let queue = scripts.entry(record_url.to_string()).or_default();
        queue.extend((0..count).map(|_| Err("connection reset".to_string())));
    }

    pub fn calls(&self, record_url: &str) -> usize {
        lock(&self.calls).get(record_url).copied().unwrap_or(0)
    }

    pub fn last_cookie(&self) -> Option<String> {
        lock(&self.last_cookie).clone()
    }
}

#[async_trait]
impl StatusReader for ScriptedStatusReader {
    async fn read_status_cell(
        &self,
        record_url: &str,
        cookie: Option<&str>,
    ) -> AppResult<Option<String>> {
        *lock(&self.calls).entry(record_url.to_string()).or_default() += 1;
        *lock(&self.last_cookie) = cookie.map(str::to_string);

        let next = lock(&self.scripts)
            .get_mut(record_url)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(AdapterError::StatusFetchFailed {
                url: record_url.to_string(),
                message,
            }
            .into()),
            None => Ok(None),
        }
    }
}

/// 记录所有回报的替身
#[derive(Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<(String, SubmissionRecord)>>,
    verdicts: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn records(&self) -> Vec<(String, SubmissionRecord)> {
        lock(&self.records).clone()
    }

    pub fn verdicts(&self) -> Vec<(String, String)> {
        lock(&self.verdicts).clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_record(&self, request_id: &str, record: &SubmissionRecord) {
        lock(&self.records).push((request_id.to_string(), record.clone()));
    }

    fn report_verdict(&self, sid: &str, status: &str) {
        lock(&self.verdicts).push((sid.to_string(), status.to_string()));
    }
}
