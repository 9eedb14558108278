// ==========================================
// 车皮路由对账系统 - 对账管道编排器
// ==========================================
// 用途: 按顺序执行各阶段，阶段之间检查取消标志
// 流程: 批次切分 → 候选解析 → 覆写应用 → 批次传播 → 去重
// 红线: 参照数据为单次运行的只读快照；去重之后不再修改记录
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::reference::ReferenceSnapshot;
use crate::domain::report::{ReconcileDiagnostics, ReconcileOutcome};
use crate::engine::dedup::DuplicateResolver;
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::history_merge::merge_history;
use crate::engine::identifier_resolver::IdentifierResolver;
use crate::engine::override_applier::OverrideApplier;
use crate::engine::propagator::BatchPropagator;
use crate::engine::segmenter::{BatchSegmenter, SortedMovements};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// PipelineOptions - 管道参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub duplicate_sample_limit: usize,
    pub shared_identifier_sample_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            duplicate_sample_limit: 3,
            shared_identifier_sample_limit: 5,
        }
    }
}

// ==========================================
// ReconcilePipeline - 对账管道
// ==========================================
pub struct ReconcilePipeline {
    segmenter: BatchSegmenter,
    resolver: IdentifierResolver,
    overrides: OverrideApplier,
    propagator: BatchPropagator,
    dedup: DuplicateResolver,
    cancel: Arc<AtomicBool>,
}

impl ReconcilePipeline {
    /// 创建新的对账管道
    ///
    /// # 参数
    /// - options: 诊断样本数等参数
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            segmenter: BatchSegmenter::new(),
            resolver: IdentifierResolver::new(),
            overrides: OverrideApplier::new(),
            propagator: BatchPropagator::new(),
            dedup: DuplicateResolver::new(
                options.duplicate_sample_limit,
                options.shared_identifier_sample_limit,
            ),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 使用外部取消标志
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// 取消标志句柄（置 true 后在下一个阶段边界生效）
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check_cancelled(&self, stage: &str) -> ReconcileResult<()> {
        if self.cancel.load(Ordering::SeqCst) {
            info!(stage, "对账已取消");
            return Err(ReconcileError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }

    /// 合并历史记录后执行对账
    ///
    /// # 参数
    /// - prior: 历史对账输入；Some 时（即使没有行）总按 (车号, 运单) 合并
    /// - incoming: 新导入的记录
    /// - snapshot: 参照数据快照
    pub fn run_with_history(
        &self,
        prior: Option<Vec<MovementRecord>>,
        incoming: Vec<MovementRecord>,
        snapshot: &ReferenceSnapshot,
    ) -> ReconcileResult<ReconcileOutcome> {
        self.check_cancelled("merge")?;
        let merged = match prior {
            Some(prior) => merge_history(prior, incoming),
            None => incoming,
        };
        self.run(SortedMovements::sort(merged), snapshot)
    }

    /// 执行完整对账流程
    ///
    /// # 返回
    /// - Ok(ReconcileOutcome): 对账输出 + 诊断
    /// - Err: 月份推导失败 / 计划表缺失 / 已取消
    #[instrument(skip_all, fields(count = movements.len()))]
    pub fn run(
        &self,
        mut movements: SortedMovements,
        snapshot: &ReferenceSnapshot,
    ) -> ReconcileResult<ReconcileOutcome> {
        info!(
            records = movements.len(),
            planning_codes = snapshot.planning_codes.len(),
            exceptions = snapshot.exceptions.len(),
            overrides = snapshot.overrides.len(),
            "开始执行对账流程"
        );

        // ==========================================
        // 步骤1: 批次切分
        // ==========================================
        self.check_cancelled("segment")?;
        let total_batches = self.segmenter.assign(&mut movements);
        let mut records = movements.into_inner();

        // ==========================================
        // 步骤2: 候选解析
        // ==========================================
        self.check_cancelled("resolve")?;
        let resolution = self.resolver.resolve(&records, snapshot)?;

        // ==========================================
        // 步骤3: 覆写应用
        // ==========================================
        self.check_cancelled("override")?;
        let finals = self.overrides.apply(&records, &resolution, snapshot);

        // ==========================================
        // 步骤4: 批次传播
        // ==========================================
        self.check_cancelled("propagate")?;
        let stats = self.propagator.propagate(&mut records, finals);

        // ==========================================
        // 步骤5: 去重
        // ==========================================
        self.check_cancelled("dedup")?;
        let dedup = self.dedup.resolve(records);

        debug!(
            total_batches,
            propagated_batches = stats.total_batches,
            "各阶段执行完毕"
        );

        let diagnostics = ReconcileDiagnostics {
            total_batches,
            unresolved_batches: stats.unresolved_batches(),
            unresolved_batch_ids: stats.unresolved_batch_ids,
            unresolved_records: dedup.excluded_unresolved,
            invalid_month_records: resolution.invalid_month_records,
            conflicting_planning_keys: resolution.conflicting_planning_keys,
            duplicate_group_count: dedup.duplicate_group_count,
            duplicate_samples: dedup.duplicate_samples,
            shared_identifier_group_count: dedup.shared_group_count,
            shared_identifier_samples: dedup.shared_samples,
        };

        info!(
            output_records = dedup.records.len(),
            unresolved_batches = diagnostics.unresolved_batches,
            unresolved_records = diagnostics.unresolved_records,
            duplicate_groups = diagnostics.duplicate_group_count,
            shared_identifier_groups = diagnostics.shared_identifier_group_count,
            "对账流程完成"
        );

        Ok(ReconcileOutcome {
            records: dedup.records,
            diagnostics,
        })
    }
}

impl Default for ReconcilePipeline {
    fn default() -> Self {
        Self::new(PipelineOptions::default())
    }
}
