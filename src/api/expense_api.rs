// ==========================================
// 车皮路由对账系统 - 费用匹配 API
// ==========================================
// 职责: 费用目录逐文件读取 → 联接路由键 → 有效代码 → 导出
// 分级: 单个文件失败只计入 error_files，不中断目录处理
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::expense::{ExpenseFolderSummary, ExpenseSummary};
use crate::domain::movement::RouteKey;
use crate::domain::processing_log::LogStatus;
use crate::engine::active_code::{ActiveCodeResolver, MappingGraph};
use crate::engine::expense_matcher::ExpenseMatcher;
use crate::exporter::export_expense_sheet;
use crate::importer::{ExpenseReader, ReferenceImporter};
use crate::repository::{ProcessingLogRepository, ReferenceRepository, WagonInvoiceRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument};

const OPERATION: &str = "process_expenses";

/// 费用结果输出子目录
pub const EXPENSE_OUTPUT_DIR: &str = "Expenses_processed";

pub struct ExpenseApi {
    reference_repo: Arc<ReferenceRepository>,
    wagon_repo: Arc<WagonInvoiceRepository>,
    log_repo: Arc<ProcessingLogRepository>,
    reader: ExpenseReader,
}

impl ExpenseApi {
    pub fn new(
        reference_repo: Arc<ReferenceRepository>,
        wagon_repo: Arc<WagonInvoiceRepository>,
        log_repo: Arc<ProcessingLogRepository>,
    ) -> Self {
        Self {
            reference_repo,
            wagon_repo,
            log_repo,
            reader: ExpenseReader::new(),
        }
    }

    /// 路由键来源: 指定的 Route_ID 文件，否则取最近一次对账结果
    fn load_route_keys(&self, route_id_file: Option<&Path>) -> ApiResult<Vec<RouteKey>> {
        match route_id_file {
            Some(path) => Ok(ReferenceImporter::new().read_route_keys(path)?.entries),
            None => Ok(self.wagon_repo.list_route_keys()?),
        }
    }

    /// 处理费用目录
    ///
    /// # 参数
    /// - expense_folder: 费用文件目录
    /// - output_dir: 结果目录（写入 <output_dir>/Expenses_processed/）
    /// - route_id_file: 外部 Route_ID 文件（可选）
    #[instrument(skip_all, fields(folder = %expense_folder.display()))]
    pub fn process_folder(
        &self,
        expense_folder: &Path,
        output_dir: &Path,
        route_id_file: Option<&Path>,
    ) -> ApiResult<ExpenseFolderSummary> {
        let route_keys = self.load_route_keys(route_id_file)?;
        if route_keys.is_empty() {
            return Err(ApiError::NotFound(
                "没有可用的路由键，请先执行对账或指定 Route_ID 文件".to_string(),
            ));
        }

        let snapshot = self.reference_repo.load_snapshot()?;
        let graph = MappingGraph::from_edges(&snapshot.mapping_edges);
        let matcher = ExpenseMatcher::new(
            &route_keys,
            ActiveCodeResolver::new(&snapshot.active_codes, &graph),
        );

        let files = self.reader.list_expense_files(expense_folder)?;
        let target_dir = output_dir.join(EXPENSE_OUTPUT_DIR);
        std::fs::create_dir_all(&target_dir).map_err(|e| {
            ApiError::InternalError(format!("无法创建输出目录 {}: {}", target_dir.display(), e))
        })?;

        let mut summary = ExpenseFolderSummary::default();
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            match self.process_file(&path, &target_dir, &matcher) {
                Ok(file_summary) => {
                    accumulate(&mut summary.totals, &file_summary);
                    self.log_repo
                        .log_operation(OPERATION, LogStatus::Success, Some(&name), None)?;
                    summary.processed_files.push(name);
                }
                Err(e) => {
                    error!(file = %name, error = %e, "费用文件处理失败，已跳过");
                    let message = e.to_string();
                    self.log_repo.log_operation(
                        OPERATION,
                        LogStatus::Error,
                        Some(&name),
                        Some(&message),
                    )?;
                    summary.skipped_files.push(name.clone());
                    summary.error_files.push((name, message));
                }
            }
        }

        info!(
            processed = summary.processed_files.len(),
            skipped = summary.skipped_files.len(),
            matched_rows = summary.totals.matched_rows,
            unmatched_rows = summary.totals.unmatched_rows,
            "费用目录处理完成"
        );
        Ok(summary)
    }

    fn process_file(
        &self,
        path: &Path,
        target_dir: &Path,
        matcher: &ExpenseMatcher<'_>,
    ) -> ApiResult<ExpenseSummary> {
        let sheet = self.reader.read(path)?;
        let (matches, file_summary) = matcher.match_rows(sheet.rows.clone());
        export_expense_sheet(&sheet, &matches, &output_file(target_dir, path))?;
        Ok(file_summary)
    }
}

/// 结果文件: 与源文件同名，扩展名改为 .csv
fn output_file(target_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "expenses".to_string());
    target_dir.join(format!("{}.csv", stem))
}

fn accumulate(totals: &mut ExpenseSummary, file: &ExpenseSummary) {
    totals.total_rows += file.total_rows;
    totals.matched_rows += file.matched_rows;
    totals.unmatched_rows += file.unmatched_rows;
    totals.ambiguous_rows += file.ambiguous_rows;
    totals.inactive_rows += file.inactive_rows;
}
