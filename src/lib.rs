// ==========================================
// 车皮路由对账系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 主流程: 日报导入 → 批次切分 → ЗНП 解析 → 覆写 / 传播 → 去重 → 导出
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 对账规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 结果导出
pub mod exporter;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchId, CellValue, LoadStatus, MappingStrategy, ResolutionSource};

// 领域实体
pub use domain::{
    MovementRecord, ReconcileOutcome, ReconciledRecord, ReferenceSnapshot, RouteKey, RunSummary,
};

// 引擎
pub use engine::{
    ActiveCodeResolver, BatchSegmenter, DuplicateResolver, ExpenseMatcher, IdentifierResolver,
    MappingGraph, ReconcilePipeline,
};

// API
pub use api::{ExpenseApi, ReconcileApi, ReferenceApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车皮路由对账系统";
