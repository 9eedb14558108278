// ==========================================
// 车皮路由对账系统 - STGDaily 日报导入器
// ==========================================
// 流程:
//   1. 文件读取与解析（类型化单元格）
//   2. 必需列校验（缺列 → 整个文件跳过）
//   3. 字段映射与键标准化（行级错误 → 该行跳过并计数）
// 目录导入: 文件名前缀过滤 + 按文件名排序 + 并发解析
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, MOVEMENT_REQUIRED};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::MovementImporter;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 行级错误保留的样本数
const ROW_ERROR_SAMPLES: usize = 5;

/// 支持的扩展名
const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// 单个文件导入结果
#[derive(Debug, Clone, Default)]
pub struct FileImport {
    pub file_name: String,
    pub records: Vec<MovementRecord>,
    pub skipped_rows: usize,
    pub row_error_samples: Vec<String>,
}

/// 目录导入结果
#[derive(Debug, Clone, Default)]
pub struct FolderImport {
    pub records: Vec<MovementRecord>,
    pub processed_files: Vec<String>,
    pub skipped_files: Vec<(String, String)>, // (文件名, 原因)
    pub skipped_rows: usize,
}

// ==========================================
// StgDailyImporter - 日报导入器
// ==========================================
pub struct StgDailyImporter {
    file_prefix: String,
    parser: UniversalFileParser,
    mapper: FieldMapper,
}

impl StgDailyImporter {
    /// 创建日报导入器
    ///
    /// # 参数
    /// - file_prefix: 目录导入时的文件名前缀（如 "STGDaily_"）
    pub fn new(file_prefix: impl Into<String>) -> Self {
        Self {
            file_prefix: file_prefix.into(),
            parser: UniversalFileParser,
            mapper: FieldMapper::new(),
        }
    }

    /// 列出目录中待导入的文件（按文件名排序）
    pub fn list_daily_files(&self, folder: &Path) -> ImportResult<Vec<PathBuf>> {
        if !folder.is_dir() {
            return Err(ImportError::FileNotFound(folder.display().to_string()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                let name_ok = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&self.file_prefix))
                    .unwrap_or(false);
                let ext_ok = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false);
                name_ok && ext_ok
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn import_file_sync(&self, path: &Path) -> ImportResult<FileImport> {
        let file_name = display_name(path);
        let table = self.parser.parse_table(path)?;
        table.require_columns(MOVEMENT_REQUIRED)?;

        let mut result = FileImport {
            file_name: file_name.clone(),
            ..Default::default()
        };

        for row in &table.rows {
            match self.mapper.map_movement(row) {
                Ok(record) => result.records.push(record),
                Err(e) if e.is_row_level() => {
                    warn!(file = %file_name, row = row.row_number, error = %e, "跳过无效行");
                    result.skipped_rows += 1;
                    if result.row_error_samples.len() < ROW_ERROR_SAMPLES {
                        result.row_error_samples.push(e.to_string());
                    }
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            file = %file_name,
            records = result.records.len(),
            skipped_rows = result.skipped_rows,
            "日报文件解析完成"
        );
        Ok(result)
    }
}

#[async_trait]
impl MovementImporter for StgDailyImporter {
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<FileImport> {
        self.import_file_sync(file_path.as_ref())
    }

    async fn import_folder<P: AsRef<Path> + Send>(&self, folder: P) -> ImportResult<FolderImport> {
        let folder = folder.as_ref().to_path_buf();
        let files = self.list_daily_files(&folder)?;

        if files.is_empty() {
            warn!(folder = %folder.display(), prefix = %self.file_prefix, "目录中没有日报文件");
            return Ok(FolderImport::default());
        }
        info!(count = files.len(), folder = %folder.display(), "开始批量导入日报文件");

        let import_tasks = files.into_iter().map(|path| async move {
            let name = display_name(&path);
            (name, self.import_file(path).await)
        });

        // 并发执行所有导入任务（结果保持文件名顺序）
        let results = join_all(import_tasks).await;

        let mut summary = FolderImport::default();
        for (name, result) in results {
            match result {
                Ok(file) => {
                    summary.skipped_rows += file.skipped_rows;
                    summary.records.extend(file.records);
                    summary.processed_files.push(name);
                }
                Err(e) => {
                    error!(file = %name, error = %e, "日报文件导入失败，已跳过");
                    summary.skipped_files.push((name, e.to_string()));
                }
            }
        }

        info!(
            processed = summary.processed_files.len(),
            skipped = summary.skipped_files.len(),
            records = summary.records.len(),
            skipped_rows = summary.skipped_rows,
            "批量导入完成"
        );
        Ok(summary)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
