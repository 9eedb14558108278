// ==========================================
// 车皮路由对账系统 - 领域模型层
// ==========================================
// 职责: 定义车皮动态、参照表、诊断汇总等领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod expense;
pub mod movement;
pub mod processing_log;
pub mod reference;
pub mod report;
pub mod types;

// 重导出核心类型
pub use expense::{ExpenseFolderSummary, ExpenseMatch, ExpenseRow, ExpenseSummary};
pub use movement::{MovementRecord, ReconciledRecord, RouteKey};
pub use processing_log::{LogStatus, ProcessingLogEntry};
pub use reference::{
    ActiveCodeSet, ExceptionEntry, MappingEdge, OverrideEntry, PlanningCode, PlanningKey,
    ReferenceSnapshot,
};
pub use report::{
    DuplicateGroup, ReconcileDiagnostics, ReconcileOutcome, RouteSuggestion, RunSummary,
    SharedRouteGroup,
};
pub use types::{BatchId, CellValue, LoadStatus, MappingStrategy, ResolutionSource};
