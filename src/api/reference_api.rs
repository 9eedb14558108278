// ==========================================
// 车皮路由对账系统 - 参照表 API
// ==========================================
// 职责: 参照表文件导入与落库
// 规则: 计划表 / 例外 / 覆写追加写入；有效代码 / 映射矩阵整表替换
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::processing_log::LogStatus;
use crate::domain::types::MappingStrategy;
use crate::importer::{ReferenceImporter, ReferenceTable};
use crate::repository::{ProcessingLogRepository, ReferenceRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const OPERATION: &str = "import_reference";

/// 参照表导入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImportSummary {
    pub table: ReferenceTable,
    pub file_name: String,
    pub written: usize,
    pub skipped_rows: usize,
}

pub struct ReferenceApi {
    reference_repo: Arc<ReferenceRepository>,
    log_repo: Arc<ProcessingLogRepository>,
    importer: ReferenceImporter,
    mapping_strategy: MappingStrategy,
}

impl ReferenceApi {
    pub fn new(
        reference_repo: Arc<ReferenceRepository>,
        log_repo: Arc<ProcessingLogRepository>,
        mapping_strategy: MappingStrategy,
    ) -> Self {
        Self {
            reference_repo,
            log_repo,
            importer: ReferenceImporter::new(),
            mapping_strategy,
        }
    }

    /// 导入一张参照表
    ///
    /// # 参数
    /// - table: 参照表类别
    /// - path: 源文件（.csv/.xlsx/.xls）
    pub fn import(&self, table: ReferenceTable, path: &Path) -> ApiResult<ReferenceImportSummary> {
        let file_name = path.display().to_string();
        let result = self.import_inner(table, path);

        match &result {
            Ok(summary) => {
                self.log_repo.log_operation(
                    OPERATION,
                    LogStatus::Success,
                    Some(&file_name),
                    Some(&format!(
                        "{}: 写入 {} 条, 跳过 {} 行",
                        table, summary.written, summary.skipped_rows
                    )),
                )?;
            }
            Err(e) => {
                self.log_repo.log_operation(
                    OPERATION,
                    LogStatus::Error,
                    Some(&file_name),
                    Some(&e.to_string()),
                )?;
            }
        }
        result
    }

    fn import_inner(&self, table: ReferenceTable, path: &Path) -> ApiResult<ReferenceImportSummary> {
        let (written, skipped_rows) = match table {
            ReferenceTable::PlanningCode => {
                let read = self.importer.read_planning_codes(path)?;
                (self.reference_repo.append_planning_codes(&read.entries)?, read.skipped_rows)
            }
            ReferenceTable::Exception => {
                let read = self.importer.read_exceptions(path)?;
                (self.reference_repo.append_exceptions(&read.entries)?, read.skipped_rows)
            }
            ReferenceTable::Override => {
                let read = self.importer.read_overrides(path)?;
                (self.reference_repo.append_overrides(&read.entries)?, read.skipped_rows)
            }
            ReferenceTable::ActiveCode => {
                let codes = self.importer.read_active_codes(path)?;
                (self.reference_repo.replace_active_codes(&codes)?, 0)
            }
            ReferenceTable::Matrix => {
                let rows = self.importer.read_matrix_rows(path)?;
                (
                    self.reference_repo
                        .replace_matrix_rows(&rows, self.mapping_strategy)?,
                    0,
                )
            }
        };

        info!(%table, written, skipped_rows, "参照表导入完成");
        Ok(ReferenceImportSummary {
            table,
            file_name: path.display().to_string(),
            written,
            skipped_rows,
        })
    }
}
