use std::sync::Arc;

use chromiumoxide::{Browser, Page};
use tracing::{error, info, warn};

use crate::adapter::{HostPage, HttpStatusReader, QojHostPage};
use crate::browser::{self, ChromeSurface};
use crate::clients::{ReportClient, Reporter};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::JsExecutor;
use crate::ingress::IngressClient;
use crate::orchestrator::{self, OrchestratorSettings, SubmissionOrchestrator};
use crate::services::ScorePoller;
use crate::utils::logging::log_startup;

/// 中继主结构
pub struct App {
    config: Config,
    browser: Arc<Browser>,
    host_page: Page,
}

impl App {
    /// 连接（或启动）浏览器并打开宿主页面
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let (browser, host_page) = if config.launch_headless {
            browser::launch_headless_browser(
                &config.target_url,
                config.chrome_executable.as_deref(),
            )
            .await?
        } else {
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
                .await?
        };

        Ok(Self {
            config,
            browser: Arc::new(browser),
            host_page,
        })
    }

    /// 运行中继，直到收到 Ctrl-C 或事件通道关闭
    pub async fn run(self) -> AppResult<()> {
        let config = &self.config;
        let (events, receiver) = orchestrator::channel();

        let host: Arc<dyn HostPage> =
            Arc::new(QojHostPage::new(JsExecutor::new(self.host_page.clone())));
        let surface = ChromeSurface::new(
            self.browser.clone(),
            events.clone(),
            config.listing_path_pattern.clone(),
            config.listing.clone(),
        );
        let reporter: Arc<dyn Reporter> = Arc::new(ReportClient::new(&config.report_base_url));
        let poller = Arc::new(ScorePoller::new(
            Arc::new(HttpStatusReader::new(config.listing.result_column)),
            reporter.clone(),
            config.poll_interval(),
        ));

        let orchestrator = SubmissionOrchestrator::new(
            surface,
            host.clone(),
            reporter,
            poller,
            events.clone(),
            OrchestratorSettings::from_config(config),
        );
        let ingress = IngressClient::new(
            config.ws_url.clone(),
            config.reconnect_delay(),
            host,
            events,
        );

        let orchestrator_task = tokio::spawn(orchestrator.run(receiver));
        info!("✅ 中继已就绪，等待推送");

        let result = tokio::select! {
            result = ingress.run() => {
                if let Err(e) = &result {
                    error!("❌ 入站连接终止: {}", e);
                }
                result
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("监听退出信号失败: {}", e);
                }
                info!("收到退出信号，正在停止");
                Ok(())
            }
        };

        orchestrator_task.abort();
        info!("{}", "=".repeat(60));
        info!("🏁 中继已停止");
        result
    }
}
