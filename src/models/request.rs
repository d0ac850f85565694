//! 提交请求
//!
//! 由操作端通过 WebSocket 推送，入站后不可变

use serde::{Deserialize, Serialize};

/// 一次提交请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// 题号（比赛内的字母编号，如 "C"）
    pub problem_code: String,
    /// 语言（评测站点的语言选项值）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// 源代码
    pub code: String,
    /// 请求编号，用于回报时关联；缺失时不回报
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// 推送消息的原始形态，所有字段均可缺失
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundMessage {
    problem_code: Option<String>,
    language: Option<String>,
    code: Option<String>,
    request_id: Option<String>,
    #[allow(dead_code)]
    timestamp: Option<String>,
}

impl SubmissionRequest {
    pub fn new(problem_code: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            problem_code: problem_code.into(),
            language: None,
            code: code.into(),
            request_id: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// 解析一条推送消息
    ///
    /// 无法解析、缺少 `problemCode` 或 `code` 的消息返回 `None`，调用方直接丢弃
    pub fn from_message(text: &str) -> Option<Self> {
        let message: InboundMessage = serde_json::from_str(text).ok()?;

        let problem_code = non_empty(message.problem_code)?;
        let code = non_empty(message.code)?;

        Some(Self {
            problem_code: problem_code.trim().to_string(),
            language: non_empty(message.language),
            code,
            request_id: non_empty(message.request_id),
        })
    }

    /// 请求的日志标识
    pub fn label(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_message() {
        let request = SubmissionRequest::from_message(
            r#"{"problemCode":"C","language":"C++26","code":"int main(){}","requestId":"r1","timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(request.problem_code, "C");
        assert_eq!(request.language.as_deref(), Some("C++26"));
        assert_eq!(request.code, "int main(){}");
        assert_eq!(request.request_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_optional_fields_absent() {
        let request =
            SubmissionRequest::from_message(r#"{"problemCode":"A","code":"x"}"#).unwrap();
        assert_eq!(request.language, None);
        assert_eq!(request.request_id, None);
        assert_eq!(request.label(), "-");
    }

    #[test]
    fn test_missing_required_fields_are_dropped() {
        assert!(SubmissionRequest::from_message(r#"{"code":"x"}"#).is_none());
        assert!(SubmissionRequest::from_message(r#"{"problemCode":"A"}"#).is_none());
        assert!(SubmissionRequest::from_message(r#"{"problemCode":"","code":"x"}"#).is_none());
        assert!(SubmissionRequest::from_message("not json").is_none());
        assert!(SubmissionRequest::from_message("[1,2,3]").is_none());
    }
}
