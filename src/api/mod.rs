// ==========================================
// 车皮路由对账系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行入口调用
// ==========================================

pub mod error;
pub mod expense_api;
pub mod reconcile_api;
pub mod reference_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use expense_api::{ExpenseApi, EXPENSE_OUTPUT_DIR};
pub use reconcile_api::{ReconcileApi, ReconcileRequest};
pub use reference_api::{ReferenceApi, ReferenceImportSummary};
