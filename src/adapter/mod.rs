//! 页面适配层
//!
//! 评测站点相关的一切（选择器、表格布局、页面结构）都在这里，
//! 编排器和轮询器只依赖下面的 trait

pub mod qoj;
pub mod status_reader;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{PageContext, PageKind, SubmissionRecord};

pub use qoj::{QojAdapter, QojHostPage};
pub use status_reader::HttpStatusReader;

/// 嵌入页面的读写能力
///
/// 只在当前已加载的页面内读写，不管理页面生命周期
#[async_trait]
pub trait PageAdapter: Send + Sync {
    /// 判断当前加载的是哪种页面
    async fn classify_current_page(&self) -> AppResult<PageKind>;

    /// 填写表单并点击提交
    async fn fill_and_submit(&self, code: &str, language: Option<&str>) -> AppResult<()>;

    /// 读取提交列表最新一行；记录不完整时返回 `None`
    async fn extract_top_record(&self) -> AppResult<Option<SubmissionRecord>>;

    /// 当前页面的 cookie，供轮询器转发
    async fn cookie_header(&self) -> AppResult<Option<String>>;
}

/// 宿主页面（操作者打开的比赛页面）的只读能力
#[async_trait]
pub trait HostPage: Send + Sync {
    /// 读取宿主页面上下文
    async fn context(&self) -> AppResult<PageContext>;

    /// 在比赛导航表中查找题目链接
    async fn problem_link(&self, problem_code: &str) -> AppResult<Option<String>>;
}

/// 读取记录页上的评测状态
#[async_trait]
pub trait StatusReader: Send + Sync {
    async fn read_status_cell(
        &self,
        record_url: &str,
        cookie: Option<&str>,
    ) -> AppResult<Option<String>>;
}
