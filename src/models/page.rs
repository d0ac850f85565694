//! 页面分类与宿主页面上下文

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// 嵌入页面当前加载的逻辑页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// 提交表单页（题目页的提交标签）
    Form,
    /// 提交列表页
    Listing,
    /// 占位空白页
    Blank,
    /// 无法识别（登录跳转、错误页等）
    Unknown,
}

impl PageKind {
    /// 根据页面信号分类
    ///
    /// - `url`: 嵌入页面当前地址
    /// - `has_submit_form`: 页面上是否渲染了提交表单（代码框/文件切换）
    /// - `listing_pattern`: 提交列表页的路径片段
    pub fn classify(url: &str, has_submit_form: bool, listing_pattern: &str) -> Self {
        let url = url.trim();
        if url.is_empty() || url.starts_with("about:blank") {
            return PageKind::Blank;
        }

        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());
        if path.contains(listing_pattern) {
            return PageKind::Listing;
        }

        if has_submit_form {
            PageKind::Form
        } else {
            PageKind::Unknown
        }
    }
}

fn contest_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/contest/(\d+)").expect("合法的正则"))
}

/// 宿主页面（操作者打开的比赛页面）的上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    /// 宿主页面地址
    pub url: String,
    /// 比赛编号
    pub contest_id: Option<String>,
    /// 页面已绑定的题号（正在查看某道题时）
    pub bound_problem: Option<String>,
}

impl PageContext {
    pub fn new(url: impl Into<String>, bound_problem: Option<String>) -> Self {
        let url = url.into();
        let contest_id = contest_id_pattern()
            .captures(&url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        Self {
            url,
            contest_id,
            bound_problem: bound_problem.filter(|p| !p.trim().is_empty()),
        }
    }

    /// 页面是否可以提交该题
    ///
    /// 页面已绑定其它题目时返回 false
    pub fn is_relevant(&self, problem_code: &str) -> bool {
        match &self.bound_problem {
            Some(bound) => bound.trim().eq_ignore_ascii_case(problem_code.trim()),
            None => true,
        }
    }

    /// 决定表单页的导航目标
    ///
    /// 优先使用导航表中的题目链接，其次用比赛编号拼接，最后退回宿主页面地址
    pub fn resolve_target(
        &self,
        nav_link: Option<String>,
        problem_code: &str,
        judge_base_url: &str,
    ) -> String {
        if let Some(link) = nav_link.filter(|l| !l.trim().is_empty()) {
            return link;
        }
        match &self.contest_id {
            Some(cid) => format!(
                "{}/contest/{}/problem/{}",
                judge_base_url.trim_end_matches('/'),
                cid,
                problem_code
            ),
            None => self.url.clone(),
        }
    }

    /// 提交列表页地址
    pub fn listing_url(&self, judge_base_url: &str, listing_pattern: &str) -> String {
        let base = judge_base_url.trim_end_matches('/');
        match &self.contest_id {
            Some(cid) => format!("{}/contest/{}{}", base, cid, listing_pattern),
            None => format!("{}{}", base, listing_pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: &str = "/submissions";

    #[test]
    fn test_classify() {
        assert_eq!(PageKind::classify("about:blank", true, PATTERN), PageKind::Blank);
        assert_eq!(PageKind::classify("", false, PATTERN), PageKind::Blank);
        assert_eq!(
            PageKind::classify("https://qoj.ac/contest/1/submissions?submitter=me", false, PATTERN),
            PageKind::Listing
        );
        assert_eq!(
            PageKind::classify("https://qoj.ac/contest/1/problem/7", true, PATTERN),
            PageKind::Form
        );
        assert_eq!(
            PageKind::classify("https://qoj.ac/login", false, PATTERN),
            PageKind::Unknown
        );
        // 记录页不是列表页
        assert_eq!(
            PageKind::classify("https://qoj.ac/submission/99", false, PATTERN),
            PageKind::Unknown
        );
    }

    #[test]
    fn test_relevance_filter() {
        let ctx = PageContext::new("https://qoj.ac/contest/5/problem/12", Some("B".into()));
        assert!(!ctx.is_relevant("A"));
        assert!(ctx.is_relevant("B"));
        assert!(ctx.is_relevant("b"));

        let unbound = PageContext::new("https://qoj.ac/contest/5", None);
        assert!(unbound.is_relevant("A"));
    }

    #[test]
    fn test_resolve_target_fallbacks() {
        let ctx = PageContext::new("https://qoj.ac/contest/5", None);
        assert_eq!(ctx.contest_id.as_deref(), Some("5"));
        assert_eq!(
            ctx.resolve_target(Some("https://qoj.ac/contest/5/problem/12".into()), "C", "https://qoj.ac"),
            "https://qoj.ac/contest/5/problem/12"
        );
        assert_eq!(
            ctx.resolve_target(None, "C", "https://qoj.ac/"),
            "https://qoj.ac/contest/5/problem/C"
        );

        let bare = PageContext::new("https://qoj.ac/problem/1", None);
        assert_eq!(bare.contest_id, None);
        assert_eq!(bare.resolve_target(None, "C", "https://qoj.ac"), "https://qoj.ac/problem/1");
    }

    #[test]
    fn test_listing_url() {
        let ctx = PageContext::new("https://qoj.ac/contest/5", None);
        assert_eq!(
            ctx.listing_url("https://qoj.ac", PATTERN),
            "https://qoj.ac/contest/5/submissions"
        );
        assert_eq!(
            PageContext::default().listing_url("https://qoj.ac", PATTERN),
            "https://qoj.ac/submissions"
        );
    }
}
