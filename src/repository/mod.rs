// ==========================================
// 车皮路由对账系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod error;
pub mod processing_log_repo;
pub mod reference_repo;
pub mod wagon_invoice_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use processing_log_repo::ProcessingLogRepository;
pub use reference_repo::ReferenceRepository;
pub use wagon_invoice_repo::WagonInvoiceRepository;
