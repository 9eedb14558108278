// ==========================================
// 车皮路由对账系统 - 对账 API
// ==========================================
// 职责: 日报导入 → 历史合并 → 对账管道 → 落库 → 导出
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::movement::MovementRecord;
use crate::domain::processing_log::LogStatus;
use crate::domain::report::{ReconcileOutcome, RouteSuggestion, RunSummary};
use crate::engine::orchestrator::{PipelineOptions, ReconcilePipeline};
use crate::engine::route_suggestion::suggest_routes;
use crate::exporter::{export_full_table, export_route_ids};
use crate::importer::{FolderImport, MovementImporter, StgDailyImporter};
use crate::repository::{ProcessingLogRepository, ReferenceRepository, WagonInvoiceRepository};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const OPERATION: &str = "reconcile";

/// 对账请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// 日报目录
    pub stg_folder: PathBuf,
    /// 历史日报文件（可选，与日报格式一致）
    pub existing_data: Option<PathBuf>,
    /// Route_ID 导出路径
    pub export_path: PathBuf,
    /// 对账全表导出路径（可选）
    pub full_table_path: Option<PathBuf>,
}

/// 对账API
pub struct ReconcileApi {
    reference_repo: Arc<ReferenceRepository>,
    wagon_repo: Arc<WagonInvoiceRepository>,
    log_repo: Arc<ProcessingLogRepository>,
    importer: StgDailyImporter,
    options: PipelineOptions,
    cancel: Arc<AtomicBool>,
}

impl ReconcileApi {
    pub fn new(
        reference_repo: Arc<ReferenceRepository>,
        wagon_repo: Arc<WagonInvoiceRepository>,
        log_repo: Arc<ProcessingLogRepository>,
        file_prefix: &str,
        options: PipelineOptions,
    ) -> Self {
        Self {
            reference_repo,
            wagon_repo,
            log_repo,
            importer: StgDailyImporter::new(file_prefix),
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 取消标志（置 true 后当前对账在下一个阶段边界停止）
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// 执行一次完整对账
    ///
    /// # 返回
    /// - Ok(RunSummary): 处理/跳过/未解析统计 + 导出路径
    /// - Err: 日报目录不可读 / 对账致命错误 / 落库或导出失败
    #[instrument(skip_all, fields(stg_folder = %request.stg_folder.display()))]
    pub async fn run(&self, request: &ReconcileRequest) -> ApiResult<RunSummary> {
        let folder = self.importer.import_folder(&request.stg_folder).await?;
        for (file, reason) in &folder.skipped_files {
            self.log_repo
                .log_operation("import_stg", LogStatus::Skipped, Some(file), Some(reason))?;
        }

        let (prior, prior_skipped) = self.load_prior(request.existing_data.as_ref()).await;
        let mut summary = self.summarize_import(&folder);
        if let Some(skipped) = prior_skipped {
            summary.skipped_files.push(skipped);
        }

        let outcome = match self.reconcile(prior, folder.records) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "对账失败");
                self.log_repo
                    .log_operation(OPERATION, LogStatus::Error, None, Some(&e.to_string()))?;
                return Err(e);
            }
        };

        self.wagon_repo.replace_all(&outcome.records)?;
        export_route_ids(&outcome.records, &request.export_path)?;
        if let Some(full_path) = &request.full_table_path {
            export_full_table(&outcome.records, full_path)?;
        }

        let diagnostics = &outcome.diagnostics;
        summary.output_records = outcome.records.len();
        summary.unresolved_batches = diagnostics.unresolved_batches;
        summary.unresolved_records = diagnostics.unresolved_records;
        summary.duplicate_groups = diagnostics.duplicate_group_count;
        summary.shared_identifier_groups = diagnostics.shared_identifier_group_count;
        summary.export_path = Some(request.export_path.display().to_string());

        let export_name = request.export_path.display().to_string();
        self.log_repo.log_operation(
            OPERATION,
            LogStatus::Success,
            Some(&export_name),
            Some(&format!(
                "输出 {} 条, 未解析批次 {}, 重复组 {}",
                summary.output_records, summary.unresolved_batches, summary.duplicate_groups
            )),
        )?;

        info!(
            processed_files = summary.processed_files.len(),
            skipped_files = summary.skipped_files.len(),
            output_records = summary.output_records,
            "对账完成"
        );
        Ok(summary)
    }

    /// 路由建议（不落库）
    pub async fn suggest(&self, stg_folder: &Path) -> ApiResult<Vec<RouteSuggestion>> {
        let folder = self.importer.import_folder(stg_folder).await?;
        let planning_codes = self.reference_repo.list_planning_codes()?;
        Ok(suggest_routes(&folder.records, &planning_codes))
    }

    fn reconcile(
        &self,
        prior: Option<Vec<MovementRecord>>,
        incoming: Vec<MovementRecord>,
    ) -> ApiResult<ReconcileOutcome> {
        let snapshot = self.reference_repo.load_snapshot()?;
        let pipeline = ReconcilePipeline::new(self.options).with_cancel_flag(self.cancel_handle());
        Ok(pipeline.run_with_history(prior, incoming, &snapshot)?)
    }

    /// 读取历史日报；失败时记为跳过文件并按无历史继续
    async fn load_prior(
        &self,
        existing: Option<&PathBuf>,
    ) -> (Option<Vec<MovementRecord>>, Option<(String, String)>) {
        let Some(path) = existing else {
            return (None, None);
        };
        match self.importer.import_file(path).await {
            Ok(file) => {
                info!(file = %file.file_name, records = file.records.len(), "历史数据已读取");
                (Some(file.records), None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "历史数据读取失败，按无历史继续");
                (None, Some((path.display().to_string(), e.to_string())))
            }
        }
    }

    fn summarize_import(&self, folder: &FolderImport) -> RunSummary {
        RunSummary {
            processed_files: folder.processed_files.clone(),
            skipped_files: folder.skipped_files.clone(),
            input_records: folder.records.len(),
            skipped_rows: folder.skipped_rows,
            ..Default::default()
        }
    }
}
