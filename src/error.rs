use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 页面适配器错误（页面上缺少预期控件等）
    #[error("页面适配错误: {0}")]
    Adapter(#[from] AdapterError),
    /// 回报接口调用错误
    #[error("回报错误: {0}")]
    Report(#[from] ReportError),
    /// 入站连接错误
    #[error("入站连接错误: {0}")]
    Ingress(#[from] IngressError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 桥接服务错误
    #[error("桥接服务错误: {0}")]
    Bridge(String),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
    /// 嵌入页面不存在
    #[error("嵌入页面不存在")]
    SurfaceMissing,
}

/// 页面适配错误
#[derive(Debug, Error)]
pub enum AdapterError {
    /// 页面上找不到预期控件
    #[error("页面缺少控件: {0}")]
    ControlMissing(String),
    /// 脚本返回了无法识别的结果
    #[error("脚本返回异常结果: {0}")]
    UnexpectedResult(String),
    /// 状态页请求失败
    #[error("状态页请求失败 ({url}): {message}")]
    StatusFetchFailed { url: String, message: String },
}

/// 回报接口错误
#[derive(Debug, Error)]
pub enum ReportError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 对端返回非成功状态码
    #[error("对端返回错误状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },
}

/// 入站连接错误
#[derive(Debug, Error)]
pub enum IngressError {
    /// WebSocket 连接失败
    #[error("连接 {url} 失败: {message}")]
    ConnectFailed { url: String, message: String },
    /// 事件通道已关闭
    #[error("事件通道已关闭")]
    ChannelClosed,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {message}")]
    ReadFailed { path: String, message: String },
    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {message}")]
    ParseFailed { path: String, message: String },
    /// 配置值非法
    #[error("配置项 {key} 非法: {message}")]
    InvalidValue { key: String, message: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Adapter(AdapterError::UnexpectedResult(err.to_string()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Report(ReportError::RequestFailed {
            endpoint,
            source: err,
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::ParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建控件缺失错误
    pub fn control_missing(what: impl Into<String>) -> Self {
        AppError::Adapter(AdapterError::ControlMissing(what.into()))
    }

    /// 创建回报请求失败错误
    pub fn report_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Report(ReportError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
