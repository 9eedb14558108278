// ==========================================
// 车皮路由对账系统 - 导入接口定义
// ==========================================
// 职责: 定义文件解析与车皮动态导入接口（不包含实现）
// ==========================================

use crate::domain::types::CellValue;
use crate::importer::error::ImportResult;
use crate::importer::movement_importer::{FileImport, FolderImport};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// MovementImporter Trait
// ==========================================
// 用途: 车皮动态日报导入主接口
// 实现者: StgDailyImporter
#[async_trait]
pub trait MovementImporter: Send + Sync {
    /// 导入单个日报文件
    ///
    /// # 参数
    /// - file_path: 日报文件路径（.xlsx/.xls/.csv）
    ///
    /// # 返回
    /// - Ok(FileImport): 解析成功的记录 + 被跳过的行数
    /// - Err: 文件级错误（不存在、格式不支持、缺少必需列）
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<FileImport>;

    /// 导入目录下所有日报文件（并发执行）
    ///
    /// # 说明
    /// - 只处理文件名以配置前缀开头的文件，按文件名排序
    /// - 单个文件失败时跳过并记入汇总，不影响其他文件
    /// - 目录本身不可读时返回错误
    async fn import_folder<P: AsRef<Path> + Send>(&self, folder: P) -> ImportResult<FolderImport>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件第一个工作表为单元格网格（不识别表头）
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok(Vec<Vec<CellValue>>): 按文件顺序的所有行
    /// - Err: 文件读取错误、格式错误
    fn parse_grid(&self, file_path: &Path) -> ImportResult<Vec<Vec<CellValue>>>;
}
