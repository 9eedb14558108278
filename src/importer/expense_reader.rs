// ==========================================
// 车皮路由对账系统 - 费用文件读取
// ==========================================
// 流程:
//   1. 前 10 行内探测表头（"номер вагона" + "номер документа"）
//   2. 丢弃表头之上的标题行
//   3. 逐行映射为 ExpenseRow（保留原始表格供导出）
// ==========================================

use crate::domain::expense::ExpenseRow;
use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{columns, FieldMapper, EXPENSE_REQUIRED};
use crate::importer::file_parser::{HeaderLocator, SheetTable, UniversalFileParser};
use std::path::{Path, PathBuf};
use tracing::info;

/// 费用目录支持的扩展名
const EXPENSE_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// 一个已读取的费用文件
#[derive(Debug, Clone)]
pub struct ExpenseSheet {
    pub file_name: String,
    pub table: SheetTable,
    pub rows: Vec<ExpenseRow>,
}

pub struct ExpenseReader {
    parser: UniversalFileParser,
    mapper: FieldMapper,
    locator: HeaderLocator,
}

impl ExpenseReader {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
            mapper: FieldMapper::new(),
            locator: HeaderLocator::new(&[columns::EXPENSE_WAGON_NO, columns::EXPENSE_INVOICE_NO]),
        }
    }

    /// 列出费用目录中的文件（按文件名排序）
    pub fn list_expense_files(&self, folder: &Path) -> ImportResult<Vec<PathBuf>> {
        if !folder.is_dir() {
            return Err(ImportError::FileNotFound(folder.display().to_string()));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| EXPENSE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// 读取单个费用文件
    ///
    /// # 返回
    /// - Err(HeaderNotFound): 前 10 行内没有表头
    /// - Err(EmptyData): 表头之下没有数据
    pub fn read(&self, path: &Path) -> ImportResult<ExpenseSheet> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut grid = self.parser.parse_grid(path)?;
        let header_index = self.locator.locate(&grid)?;
        // 表头大小写不敏感，统一为标准列名
        if let Some(header_row) = grid.get_mut(header_index) {
            for cell in header_row.iter_mut() {
                let text = cell.to_string().trim().to_lowercase();
                if let Some(canonical) = [columns::EXPENSE_WAGON_NO, columns::EXPENSE_INVOICE_NO]
                    .into_iter()
                    .find(|c| c.to_lowercase() == text)
                {
                    *cell = CellValue::from_text(canonical);
                }
            }
        }
        let table = SheetTable::from_grid(grid, header_index);
        table.require_columns(EXPENSE_REQUIRED)?;
        if table.rows.is_empty() {
            return Err(ImportError::EmptyData(file_name));
        }

        let rows: Vec<ExpenseRow> = table
            .rows
            .iter()
            .map(|row| self.mapper.map_expense(row, &file_name))
            .collect();

        info!(file = %file_name, rows = rows.len(), "费用文件读取完成");
        Ok(ExpenseSheet {
            file_name,
            table,
            rows,
        })
    }
}

impl Default for ExpenseReader {
    fn default() -> Self {
        Self::new()
    }
}
