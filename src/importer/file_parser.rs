// ==========================================
// 车皮路由对账系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 类型化单元格网格 → 按表头组织的行记录
// ==========================================

use crate::domain::types::CellValue;
use crate::importer::data_cleaner::{excel_serial_to_datetime, parse_datetime_text};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1251;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// 表头探测的默认扫描行数
pub const HEADER_SCAN_ROWS: usize = 10;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// RawRow - 按表头组织的一行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize, // 文件中的行号（从 1 开始）
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: HashMap<String, CellValue>) -> Self {
        Self { row_number, cells }
    }

    /// 取单元格（列不存在时返回 Empty）
    pub fn get(&self, header: &str) -> &CellValue {
        self.cells.get(header).unwrap_or(&EMPTY_CELL)
    }

    /// 按别名依次取第一个非空单元格
    pub fn get_any(&self, headers: &[&str]) -> &CellValue {
        headers
            .iter()
            .map(|h| self.get(h))
            .find(|cell| !cell.is_empty())
            .unwrap_or(&EMPTY_CELL)
    }
}

// ==========================================
// SheetTable - 带表头的工作表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetTable {
    /// 以指定行为表头构建（表头之上的行丢弃，完全空白的行跳过）
    pub fn from_grid(grid: Vec<Vec<CellValue>>, header_index: usize) -> Self {
        let mut grid_rows = grid.into_iter().enumerate().skip(header_index);
        let headers: Vec<String> = match grid_rows.next() {
            Some((_, header_row)) => header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
            None => return Self::default(),
        };

        let mut rows = Vec::new();
        for (index, row) in grid_rows {
            if row.iter().all(CellValue::is_empty) {
                continue;
            }
            let mut cells = HashMap::new();
            for (col_idx, cell) in row.into_iter().enumerate() {
                if let Some(header) = headers.get(col_idx).filter(|h| !h.is_empty()) {
                    // 重名列以第一列为准
                    cells.entry(header.clone()).or_insert(cell);
                }
            }
            rows.push(RawRow::new(index + 1, cells));
        }

        Self { headers, rows }
    }

    pub fn has_column(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// 校验必需列（每组别名至少存在一个）
    pub fn require_columns(&self, required: &[&[&str]]) -> ImportResult<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|aliases| !aliases.iter().any(|alias| self.has_column(alias)))
            .map(|aliases| aliases.first().copied().unwrap_or_default().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns(missing))
        }
    }
}

// ==========================================
// HeaderLocator - 表头探测
// ==========================================
// 用于表头之上带有标题/说明行的文件（费用文件）
pub struct HeaderLocator {
    expected: Vec<String>,
    max_scan_rows: usize,
}

impl HeaderLocator {
    pub fn new(expected: &[&str]) -> Self {
        Self {
            expected: expected.iter().map(|s| s.trim().to_lowercase()).collect(),
            max_scan_rows: HEADER_SCAN_ROWS,
        }
    }

    pub fn with_max_scan_rows(mut self, max_scan_rows: usize) -> Self {
        self.max_scan_rows = max_scan_rows;
        self
    }

    /// 在前 N 行中找到包含全部期望列的行（大小写不敏感）
    ///
    /// # 返回
    /// - Ok(index): 表头所在行下标（从 0 开始）
    /// - Err(HeaderNotFound)
    pub fn locate(&self, grid: &[Vec<CellValue>]) -> ImportResult<usize> {
        grid.iter()
            .take(self.max_scan_rows)
            .position(|row| {
                let values: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_lowercase())
                    .collect();
                self.expected.iter().all(|e| values.contains(e))
            })
            .ok_or_else(|| ImportError::HeaderNotFound {
                expected: self.expected.clone(),
                scanned_rows: self.max_scan_rows.min(grid.len()),
            })
    }
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_grid(&self, file_path: &Path) -> ImportResult<Vec<Vec<CellValue>>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let bytes = std::fs::read(file_path)?;
        let text = decode_csv_bytes(&bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(CellValue::from_text).collect());
        }

        Ok(grid)
    }
}

/// CSV 字节解码
///
/// 合法 UTF-8（可带 BOM）按 UTF-8 读取，否则按 cp1251（Windows 西里尔）解码
pub fn decode_csv_bytes(bytes: &[u8]) -> Cow<'_, str> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1251.decode_without_bom_handling(body).0,
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_grid(&self, file_path: &Path) -> ImportResult<Vec<Vec<CellValue>>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect())
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from_text(s),
        Data::Float(f) => CellValue::Float(*f),
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime_text(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::from_text(s)),
        Data::DurationIso(s) => CellValue::from_text(s),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse_grid<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<Vec<CellValue>>> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_grid(path),
            "xlsx" | "xls" => ExcelParser.parse_grid(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// 解析为首行表头的工作表
    pub fn parse_table<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<SheetTable> {
        let grid = self.parse_grid(file_path)?;
        Ok(SheetTable::from_grid(grid, 0))
    }

    /// 解析并探测表头位置
    pub fn parse_table_with_header<P: AsRef<Path>>(
        &self,
        file_path: P,
        locator: &HeaderLocator,
    ) -> ImportResult<SheetTable> {
        let grid = self.parse_grid(file_path)?;
        let header_index = locator.locate(&grid)?;
        Ok(SheetTable::from_grid(grid, header_index))
    }
}
