// ==========================================
// 车皮路由对账系统 - 引擎层
// ==========================================
// 职责: 实现对账规则（批次切分 / 路由号解析 / 传播 / 去重 / 有效代码）
// 红线: Engine 不拼 SQL, 只消费参照快照
// ==========================================

pub mod active_code;
pub mod dedup;
pub mod error;
pub mod expense_matcher;
pub mod history_merge;
pub mod identifier_resolver;
pub mod key_normalizer;
pub mod orchestrator;
pub mod override_applier;
pub mod propagator;
pub mod route_suggestion;
pub mod segmenter;

// 重导出核心引擎
pub use active_code::{ActiveCodeResolver, MappingGraph, MatrixEdgeBuilder, NOT_ACTIVE};
pub use dedup::{DedupOutcome, DuplicateResolver};
pub use error::{ReconcileError, ReconcileResult};
pub use expense_matcher::{coerce_route_code, ExpenseMatcher};
pub use history_merge::merge_history;
pub use identifier_resolver::{CandidateResolution, IdentifierResolver, RouteCandidate};
pub use key_normalizer::{normalize_cell, normalize_str};
pub use orchestrator::{PipelineOptions, ReconcilePipeline};
pub use override_applier::OverrideApplier;
pub use propagator::{BatchPropagator, PropagationStats};
pub use route_suggestion::suggest_routes;
pub use segmenter::{BatchSegmenter, SortedMovements};
