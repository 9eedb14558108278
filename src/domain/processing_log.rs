// ==========================================
// 车皮路由对账系统 - 处理日志领域模型
// ==========================================
// 用途: 每次对账 / 文件导入 / 费用处理留一条记录
// 对齐: processing_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub log_id: String,
    pub operation: String,         // 如 "reconcile" / "import_reference"
    pub status: LogStatus,
    pub file_name: Option<String>,
    pub message: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// LogStatus - 处理状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Success,
    Skipped,
    Error,
}

impl LogStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUCCESS" => Some(LogStatus::Success),
            "SKIPPED" => Some(LogStatus::Skipped),
            "ERROR" => Some(LogStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Success => write!(f, "SUCCESS"),
            LogStatus::Skipped => write!(f, "SKIPPED"),
            LogStatus::Error => write!(f, "ERROR"),
        }
    }
}
