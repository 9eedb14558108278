// ==========================================
// 车皮路由对账系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 只有整次对账无法继续时才返回错误；单条记录问题计入诊断
// ==========================================

use thiserror::Error;

/// 对账引擎错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("月份推导失败: 没有任何重车记录得到有效月份（共 {loaded_records} 条重车记录）")]
    MonthDerivationFailed { loaded_records: usize },

    #[error("参照表缺失: {0}")]
    MissingReferenceTable(String),

    #[error("输入未按 (车号, 报告日期) 排序: 第 {index} 条记录")]
    UnsortedInput { index: usize },

    #[error("对账已取消 (阶段: {stage})")]
    Cancelled { stage: String },
}

/// Result 类型别名
pub type ReconcileResult<T> = Result<T, ReconcileError>;
