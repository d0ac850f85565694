//! 提交记录与评测状态

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ListingLayout;

/// 提交列表中读取到的一条提交记录
///
/// 三个字段缺一不可；缺失任意一个视为“记录尚不可用”
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// 提交编号
    pub sid: String,
    /// 记录页面地址
    #[serde(rename = "surl")]
    pub record_url: String,
    /// 提交时间
    #[serde(rename = "stime")]
    pub submit_time: String,
}

/// 表格单元格：文本 + 单元格内第一个链接
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingCell {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: Option<String>,
}

impl ListingCell {
    pub fn new(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            href: href.map(str::to_string),
        }
    }
}

impl SubmissionRecord {
    /// 从提交列表最新一行解析记录
    ///
    /// 列数不足时输出警告并返回 `None`，避免错读其它列
    pub fn from_row(cells: &[ListingCell], layout: &ListingLayout) -> Option<Self> {
        if cells.len() < layout.min_columns {
            if !cells.is_empty() {
                warn!(
                    "⚠️ 提交列表行只有 {} 列，期望至少 {} 列，请检查列布局配置",
                    cells.len(),
                    layout.min_columns
                );
            }
            return None;
        }

        let id_cell = cells.get(layout.id_column)?;
        let sid = id_cell.text.trim().trim_start_matches('#').to_string();
        let record_url = id_cell.href.as_deref().unwrap_or_default().trim().to_string();
        let submit_time = cells.get(layout.time_column)?.text.trim().to_string();

        if sid.is_empty() || record_url.is_empty() || submit_time.is_empty() {
            return None;
        }

        Some(Self {
            sid,
            record_url,
            submit_time,
        })
    }
}

/// 评测状态
///
/// "Waiting" 与 "Judging" 是仅有的两个非终态，其它非空值均为终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictStatus(String);

impl VerdictStatus {
    const PENDING: [&'static str; 2] = ["Waiting", "Judging"];

    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否为终态（空值不算）
    pub fn is_terminal(&self) -> bool {
        !self.0.is_empty() && !Self::PENDING.contains(&self.0.as_str())
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, href: Option<&str>, time: &str) -> Vec<ListingCell> {
        let mut cells = vec![ListingCell::new(id, href)];
        for text in ["C", "me", "Waiting", "0ms", "0kb", "C++26"] {
            cells.push(ListingCell::new(text, None));
        }
        cells.push(ListingCell::new(time, None));
        cells
    }

    #[test]
    fn test_complete_row() {
        let cells = row("#99", Some("https://qoj.ac/submission/99"), "12:00:00");
        let record = SubmissionRecord::from_row(&cells, &ListingLayout::default()).unwrap();
        assert_eq!(record.sid, "99");
        assert_eq!(record.record_url, "https://qoj.ac/submission/99");
        assert_eq!(record.submit_time, "12:00:00");
    }

    #[test]
    fn test_incomplete_row_yields_nothing() {
        let layout = ListingLayout::default();
        assert!(SubmissionRecord::from_row(&row("", None, "12:00"), &layout).is_none());
        assert!(SubmissionRecord::from_row(&row("99", None, "12:00"), &layout).is_none());
        assert!(SubmissionRecord::from_row(&row("99", Some("/submission/99"), " "), &layout).is_none());
    }

    #[test]
    fn test_short_row_is_rejected() {
        let mut cells = row("99", Some("/submission/99"), "12:00");
        cells.truncate(7);
        assert!(SubmissionRecord::from_row(&cells, &ListingLayout::default()).is_none());
    }

    #[test]
    fn test_seven_column_layout() {
        let cells: Vec<ListingCell> = [
            ("99", Some("/submission/99")),
            ("C", None),
            ("me", None),
            ("Waiting", None),
            ("0ms", None),
            ("C++26", None),
            ("12:00", None),
        ]
        .into_iter()
        .map(|(text, href)| ListingCell::new(text, href))
        .collect();

        let seven = ListingLayout {
            min_columns: 7,
            time_column: 6,
            ..ListingLayout::default()
        };
        let record = SubmissionRecord::from_row(&cells, &seven).unwrap();
        assert_eq!(record.submit_time, "12:00");
    }

    #[test]
    fn test_verdict_terminality() {
        assert!(!VerdictStatus::new("").is_terminal());
        assert!(!VerdictStatus::new("Waiting").is_terminal());
        assert!(!VerdictStatus::new(" Judging ").is_terminal());
        assert!(VerdictStatus::new("Accepted").is_terminal());
        assert!(VerdictStatus::new("Wrong Answer").is_terminal());
        assert!(VerdictStatus::new("45").is_terminal());
    }

    #[test]
    fn test_record_form_field_names() {
        let record = SubmissionRecord {
            sid: "1".into(),
            record_url: "u".into(),
            submit_time: "t".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["surl"], "u");
        assert_eq!(json["stime"], "t");
    }
}
