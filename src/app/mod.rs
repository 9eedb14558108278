// ==========================================
// 车皮路由对账系统 - 应用层
// ==========================================
// 职责: 装配共享状态，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::AppState;
