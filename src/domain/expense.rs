// ==========================================
// 车皮路由对账系统 - 费用匹配领域模型
// ==========================================
// 职责: 费用行 / 匹配结果 / 费用汇总
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ExpenseRow - 费用文件中的一行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub wagon_no: String,   // 已标准化
    pub invoice_no: String, // 已标准化
    pub row_number: usize,
    pub source_file: String,
}

// ==========================================
// ExpenseMatch - 匹配结果
// ==========================================
// route_code: 对账路由号转为整数（缺失/非数字 → 0）
// accounting_code: 有效代码解析结果（"для 1С" 列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseMatch {
    pub row: ExpenseRow,
    pub route_code: i64,
    pub accounting_code: String,
    pub matched: bool,
}

impl ExpenseMatch {
    pub fn is_active(&self) -> bool {
        self.accounting_code != crate::engine::active_code::NOT_ACTIVE
    }
}

// ==========================================
// ExpenseSummary - 单次费用匹配汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub total_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub ambiguous_rows: usize, // 同一 (车号, 运单号) 对应多个路由号
    pub inactive_rows: usize,  // 解析结果为"非有效代码"
}

// ==========================================
// ExpenseFolderSummary - 费用目录处理汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFolderSummary {
    pub processed_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub error_files: Vec<(String, String)>, // (文件名, 错误信息)
    pub totals: ExpenseSummary,
}
