//! 请求预览
//!
//! 仅用于调试观察，对流程没有任何影响

use crate::models::SubmissionRequest;
use crate::utils::logging::truncate_text;

/// 预览中代码最多显示的行数
const PREVIEW_LINES: usize = 12;
/// 每行最多显示的字符数
const PREVIEW_WIDTH: usize = 72;

/// 把请求渲染成带边框的文本块
pub fn render_preview(request: &SubmissionRequest) -> String {
    let rule = "─".repeat(PREVIEW_WIDTH + 4);
    let mut out = String::new();
    out.push_str(&format!("┌{}\n", rule));
    out.push_str(&format!("│ 题号: {}\n", request.problem_code));
    out.push_str(&format!(
        "│ 语言: {}\n",
        request.language.as_deref().unwrap_or("(页面默认)")
    ));
    out.push_str(&format!("│ 请求: {}\n", request.label()));
    out.push_str(&format!("├{}\n", rule));

    let total = request.code.lines().count();
    for line in request.code.lines().take(PREVIEW_LINES) {
        out.push_str(&format!("│ {}\n", truncate_text(line, PREVIEW_WIDTH)));
    }
    if total > PREVIEW_LINES {
        out.push_str(&format!("│ ... (还有 {} 行)\n", total - PREVIEW_LINES));
    }
    out.push_str(&format!("└{}", rule));
    out
}
