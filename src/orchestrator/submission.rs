//! 提交状态机
//!
//! 单个任务顺序处理事件通道中的全部事件，因此不存在并行执行；
//! 但请求、页面加载、定时器三类事件之间的先后顺序不确定。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::adapter::{HostPage, PageAdapter};
use crate::browser::BrowsingSurface;
use crate::clients::Reporter;
use crate::config::Config;
use crate::models::{PageContext, PageKind, SubmissionRequest};
use crate::orchestrator::event::{EventReceiver, EventSender, OrchestratorEvent, TimerKind};
use crate::orchestrator::session::{OrchestrationSession, Phase, Step};
use crate::services::{render_preview, ScorePoller};

/// 状态机参数
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// 评测站点根地址
    pub judge_base_url: String,
    /// 宿主页面不可读时使用的地址
    pub fallback_url: String,
    /// 提交列表页路径片段
    pub listing_pattern: String,
    /// 提交后强制跳转的延迟
    pub renavigate_delay: Duration,
    /// 关闭嵌入页面的防抖延迟
    pub close_delay: Duration,
    /// 是否输出请求预览
    pub preview: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            judge_base_url: config.judge_base_url.clone(),
            fallback_url: config.target_url.clone(),
            listing_pattern: config.listing_path_pattern.clone(),
            renavigate_delay: config.renavigate_delay(),
            close_delay: config.close_delay(),
            preview: config.preview,
        }
    }
}

/// 提交编排器
pub struct SubmissionOrchestrator<S: BrowsingSurface> {
    surface: S,
    host: Arc<dyn HostPage>,
    reporter: Arc<dyn Reporter>,
    poller: Arc<ScorePoller>,
    events: EventSender,
    settings: OrchestratorSettings,
    session: OrchestrationSession,
}

impl<S: BrowsingSurface> SubmissionOrchestrator<S> {
    pub fn new(
        surface: S,
        host: Arc<dyn HostPage>,
        reporter: Arc<dyn Reporter>,
        poller: Arc<ScorePoller>,
        events: EventSender,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            surface,
            host,
            reporter,
            poller,
            events,
            settings,
            session: OrchestrationSession::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn session(&self) -> &OrchestrationSession {
        &self.session
    }

    /// 事件循环，通道关闭时退出
    pub async fn run(mut self, mut events: EventReceiver) {
        info!("🎬 编排器开始处理事件");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        self.session.cancel_all_timers();
        info!("事件通道已关闭，编排器退出");
    }

    /// 处理单个事件
    pub async fn handle(&mut self, event: OrchestratorEvent) {
        match event {
            OrchestratorEvent::Request(request) => self.on_request(request).await,
            OrchestratorEvent::Loaded { url } => self.on_loaded(&url).await,
            OrchestratorEvent::Timer { generation, kind } => {
                if !self.session.is_current(generation) {
                    debug!("丢弃旧会话的定时器 {:?} (generation {})", kind, generation);
                    return;
                }
                match kind {
                    TimerKind::Renavigate => self.on_renavigate_timer().await,
                    TimerKind::Close => self.close().await,
                }
            }
        }
    }

    /// 新请求：取代当前会话并导航到表单页
    async fn on_request(&mut self, request: SubmissionRequest) {
        self.session.supersede(request.clone());
        info!(
            "[请求 {}] 📥 收到提交请求: 题目 {} (代码 {} 字节)",
            request.label(),
            request.problem_code,
            request.code.len()
        );
        if self.settings.preview {
            info!("\n{}", render_preview(&request));
        }

        let context = match self.host.context().await {
            Ok(context) => context,
            Err(e) => {
                warn!("[请求 {}] ⚠️ 读取宿主页面失败: {}", request.label(), e);
                PageContext::new(self.settings.fallback_url.clone(), None)
            }
        };
        let nav_link = match self.host.problem_link(&request.problem_code).await {
            Ok(link) => link,
            Err(e) => {
                debug!("[请求 {}] 导航表查找失败: {}", request.label(), e);
                None
            }
        };

        let target = context.resolve_target(
            nav_link,
            &request.problem_code,
            &self.settings.judge_base_url,
        );
        self.session.listing_url = Some(
            context.listing_url(&self.settings.judge_base_url, &self.settings.listing_pattern),
        );

        if let Err(e) = self.surface.navigate(&target).await {
            error!("[请求 {}] ❌ 导航到表单页失败: {}", request.label(), e);
        }
        self.session.frame_present = self.surface.is_present();
    }

    /// 页面加载完成：分类后填写或读取记录
    async fn on_loaded(&mut self, url: &str) {
        let Some(request) = self.session.active_request().cloned() else {
            debug!("没有进行中的请求，忽略页面加载: {}", url);
            return;
        };
        if PageKind::classify(url, false, &self.settings.listing_pattern) == PageKind::Blank {
            debug!("[请求 {}] 忽略空白页加载", request.label());
            return;
        }
        let Some(adapter) = self.surface.adapter() else {
            debug!("[请求 {}] 嵌入页面不存在，忽略加载事件", request.label());
            return;
        };

        let kind = match adapter.classify_current_page().await {
            Ok(kind) => kind,
            Err(e) => {
                warn!("[请求 {}] ⚠️ 页面分类失败: {}", request.label(), e);
                return;
            }
        };
        debug!("[请求 {}] 页面加载: {} ({:?})", request.label(), url, kind);

        match self.session.next_step(kind) {
            Step::Ignore => debug!("[请求 {}] 无需处理此次加载", request.label()),
            Step::Fill => self.fill(&request, adapter.as_ref()).await,
            Step::Extract => self.extract(&request, adapter.as_ref()).await,
        }
    }

    async fn fill(&mut self, request: &SubmissionRequest, adapter: &dyn PageAdapter) {
        info!("[请求 {}] ✍️ 填写表单", request.label());
        self.session.submitted = true;
        if let Err(e) = adapter
            .fill_and_submit(&request.code, request.language.as_deref())
            .await
        {
            warn!("[请求 {}] ⚠️ 填写或提交失败，跳过: {}", request.label(), e);
        }
        self.session.set_phase(Phase::Submitted);
        self.session
            .arm(TimerKind::Renavigate, self.settings.renavigate_delay, &self.events);
    }

    async fn extract(&mut self, request: &SubmissionRequest, adapter: &dyn PageAdapter) {
        self.session.cancel(TimerKind::Renavigate);
        self.session.set_phase(Phase::RecordExtracted);

        if !self.session.report_sent {
            match adapter.extract_top_record().await {
                Ok(Some(record)) => {
                    self.session.report_sent = true;
                    info!(
                        "[请求 {}] 📄 读取到提交记录: sid={} 时间={}",
                        request.label(),
                        record.sid,
                        record.submit_time
                    );
                    match &request.request_id {
                        Some(request_id) => {
                            self.reporter.report_record(request_id, &record);
                            let cookie = match adapter.cookie_header().await {
                                Ok(cookie) => cookie,
                                Err(e) => {
                                    debug!("读取 cookie 失败: {}", e);
                                    None
                                }
                            };
                            self.poller.start(&record, cookie);
                        }
                        None => info!("请求没有编号，不回报也不轮询"),
                    }
                }
                Ok(None) => info!("[请求 {}] 提交记录尚不可用", request.label()),
                Err(e) => warn!("[请求 {}] ⚠️ 读取提交记录失败: {}", request.label(), e),
            }
        }

        self.session
            .arm(TimerKind::Close, self.settings.close_delay, &self.events);
    }

    /// 提交后页面没有自动跳转时，强制导航到提交列表
    async fn on_renavigate_timer(&mut self) {
        if self.session.already_closed || !self.surface.is_present() {
            debug!("嵌入页面已关闭，跳过强制跳转");
            return;
        }
        let Some(listing_url) = self.session.listing_url.clone() else {
            return;
        };
        if let Err(e) = self.surface.navigate(&listing_url).await {
            warn!("⚠️ 跳转到提交列表失败: {}", e);
        }
    }

    /// 销毁嵌入页面；重复调用只生效一次
    pub async fn close(&mut self) {
        if self.session.already_closed {
            debug!("嵌入页面已关闭，忽略重复关闭");
            return;
        }
        self.session.already_closed = true;
        self.session.cancel(TimerKind::Renavigate);

        if let Err(e) = self.surface.detach().await {
            warn!("⚠️ 销毁嵌入页面失败: {}", e);
        }
        self.session.frame_present = false;
        self.session.set_phase(Phase::Closed);
    }
}
