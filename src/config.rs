//! 程序配置
//!
//! 优先级：环境变量 > TOML 配置文件 > 默认值

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 提交列表表格的列布局
///
/// 不同版本的评测页面列数不同（7 或 8 列），因此作为配置项而不是写死
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingLayout {
    /// 一行至少需要的列数，不足则视为记录尚不可用
    pub min_columns: usize,
    /// 提交编号所在列（含记录链接）
    pub id_column: usize,
    /// 评测结果所在列
    pub result_column: usize,
    /// 提交时间所在列
    pub time_column: usize,
}

impl Default for ListingLayout {
    fn default() -> Self {
        Self {
            min_columns: 8,
            id_column: 0,
            result_column: 3,
            time_column: 7,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 是否自行启动无头浏览器（否则连接调试端口上已有的浏览器）
    pub launch_headless: bool,
    /// 无头模式下的浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 宿主页面 URL（比赛页面）
    pub target_url: String,
    /// 评测站点根地址
    pub judge_base_url: String,
    /// 操作端 WebSocket 推送地址
    pub ws_url: String,
    /// 回报接口根地址
    pub report_base_url: String,
    /// 断线重连间隔（毫秒）
    pub reconnect_delay_ms: u64,
    /// 提交后强制跳转到提交列表的延迟（毫秒）
    pub renavigate_delay_ms: u64,
    /// 到达提交列表后关闭嵌入页面的延迟（毫秒）
    pub close_delay_ms: u64,
    /// 评测结果轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 判定“提交列表页”的路径片段
    pub listing_path_pattern: String,
    /// 提交列表表格列布局
    pub listing: ListingLayout,
    /// 是否输出请求预览
    pub preview: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 桥接服务监听地址
    pub bridge_bind: String,
    /// 桥接服务默认语言
    pub default_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            launch_headless: false,
            chrome_executable: None,
            target_url: "https://qoj.ac/contests".to_string(),
            judge_base_url: "https://qoj.ac".to_string(),
            ws_url: "ws://127.0.0.1:8000/ws".to_string(),
            report_base_url: "http://127.0.0.1:8000".to_string(),
            reconnect_delay_ms: 3000,
            renavigate_delay_ms: 1000,
            close_delay_ms: 400,
            poll_interval_ms: 3000,
            listing_path_pattern: "/submissions".to_string(),
            listing: ListingLayout::default(),
            preview: false,
            verbose_logging: false,
            bridge_bind: "0.0.0.0:8000".to_string(),
            default_language: "C++26".to_string(),
        }
    }
}

impl Config {
    /// 仅从环境变量加载（未设置的项使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，再叠加环境变量
    ///
    /// 文件不存在时直接退回默认值
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", path.display());
            let config = Self::from_env();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(self.browser_debug_port),
            launch_headless: env_parse("LAUNCH_HEADLESS").unwrap_or(self.launch_headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(self.chrome_executable),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            judge_base_url: std::env::var("JUDGE_BASE_URL").unwrap_or(self.judge_base_url),
            ws_url: std::env::var("WS_URL").unwrap_or(self.ws_url),
            report_base_url: std::env::var("REPORT_BASE_URL").unwrap_or(self.report_base_url),
            reconnect_delay_ms: env_parse("RECONNECT_DELAY_MS").unwrap_or(self.reconnect_delay_ms),
            renavigate_delay_ms: env_parse("RENAVIGATE_DELAY_MS").unwrap_or(self.renavigate_delay_ms),
            close_delay_ms: env_parse("CLOSE_DELAY_MS").unwrap_or(self.close_delay_ms),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms),
            listing_path_pattern: std::env::var("LISTING_PATH_PATTERN").unwrap_or(self.listing_path_pattern),
            listing: self.listing,
            preview: env_parse("PREVIEW").unwrap_or(self.preview),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            bridge_bind: std::env::var("BRIDGE_BIND").unwrap_or(self.bridge_bind),
            default_language: std::env::var("DEFAULT_LANGUAGE").unwrap_or(self.default_language),
        }
    }

    /// 校验配置的一致性
    pub fn validate(&self) -> AppResult<()> {
        let layout = &self.listing;
        let max_column = layout.id_column.max(layout.result_column).max(layout.time_column);
        if max_column >= layout.min_columns {
            return Err(ConfigError::InvalidValue {
                key: "listing".to_string(),
                message: format!(
                    "列索引 {} 超出最少列数 {}",
                    max_column, layout.min_columns
                ),
            }
            .into());
        }
        if self.listing_path_pattern.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "listing_path_pattern".to_string(),
                message: "不能为空".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn renavigate_delay(&self) -> Duration {
        Duration::from_millis(self.renavigate_delay_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
