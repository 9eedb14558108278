// ==========================================
// 车皮路由对账系统 - 对账诊断与汇总
// ==========================================
// 职责: 去重诊断 / 共享路由号诊断 / 运行汇总 / 路由建议
// ==========================================

use crate::domain::movement::ReconciledRecord;
use crate::domain::types::BatchId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 被折叠的重复组（(路由号, 车号, 运单号) 相同的多条记录）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub route_id: String,
    pub wagon_no: String,
    pub invoice_no: String,
    pub occurrences: usize,
    pub kept_report_at: NaiveDateTime,
}

/// 一个路由号被多个 (车号, 运单号) 共用
///
/// 只报告，不纠正
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedRouteGroup {
    pub route_id: String,
    pub pairs: Vec<(String, String)>,
}

// ==========================================
// ReconcileDiagnostics - 对账诊断
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileDiagnostics {
    pub total_batches: usize,
    pub unresolved_batches: usize,
    pub unresolved_batch_ids: Vec<BatchId>,
    pub unresolved_records: usize,
    pub invalid_month_records: usize, // 显式月份越界的重车记录
    pub conflicting_planning_keys: usize,

    // ===== 去重 =====
    pub duplicate_group_count: usize,
    pub duplicate_samples: Vec<DuplicateGroup>,

    // ===== 共享路由号 =====
    pub shared_identifier_group_count: usize,
    pub shared_identifier_samples: Vec<SharedRouteGroup>,
}

// ==========================================
// ReconcileOutcome - 一次对账的完整结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub records: Vec<ReconciledRecord>,
    pub diagnostics: ReconcileDiagnostics,
}

// ==========================================
// RunSummary - 面向调用方的运行汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed_files: Vec<String>,
    pub skipped_files: Vec<(String, String)>, // (文件名, 原因)
    pub input_records: usize,
    pub skipped_rows: usize,
    pub output_records: usize,
    pub unresolved_batches: usize,
    pub unresolved_records: usize,
    pub duplicate_groups: usize,
    pub shared_identifier_groups: usize,
    pub export_path: Option<String>,
}

// ==========================================
// RouteSuggestion - 路由建议
// ==========================================
// 重车按 (月份, 发站, 到站, 车种) 分组计数，附带已有 ЗНП
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSuggestion {
    pub month: u32,
    pub departure_station: String,
    pub destination_station: String,
    pub wagon_type: String,
    pub count: usize,
    pub existing_route_id: Option<String>,
}
