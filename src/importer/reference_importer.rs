// ==========================================
// 车皮路由对账系统 - 参照表导入器
// ==========================================
// 职责: 从 CSV/Excel 读取 ЗНП 计划表 / 例外表 / 覆写表 / 有效代码 / 映射矩阵
// 红线: 只负责解析；落库由仓储层完成
// ==========================================

use crate::domain::movement::RouteKey;
use crate::domain::reference::{ExceptionEntry, OverrideEntry, PlanningCode};
use crate::engine::key_normalizer::normalize_cell;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{
    columns, FieldMapper, EXCEPTION_REQUIRED, OVERRIDE_REQUIRED, PLANNING_REQUIRED,
};
use crate::importer::file_parser::{RawRow, SheetTable, UniversalFileParser};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

// ==========================================
// ReferenceTable - 参照表类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    PlanningCode,
    Exception,
    Override,
    ActiveCode,
    Matrix,
}

impl ReferenceTable {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "znp" | "planning" | "planning_code" => Some(ReferenceTable::PlanningCode),
            "exceptions" | "exception" => Some(ReferenceTable::Exception),
            "overrides" | "override" => Some(ReferenceTable::Override),
            "active" | "active_code" | "active_routes" => Some(ReferenceTable::ActiveCode),
            "matrix" => Some(ReferenceTable::Matrix),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceTable::PlanningCode => "planning_code",
            ReferenceTable::Exception => "route_exception",
            ReferenceTable::Override => "route_override",
            ReferenceTable::ActiveCode => "active_route",
            ReferenceTable::Matrix => "matrix_mapping",
        };
        write!(f, "{}", name)
    }
}

/// 参照表读取结果
#[derive(Debug, Clone, Default)]
pub struct ReferenceImport<T> {
    pub entries: Vec<T>,
    pub skipped_rows: usize,
}

pub struct ReferenceImporter {
    parser: UniversalFileParser,
    mapper: FieldMapper,
    cleaner: DataCleaner,
}

impl ReferenceImporter {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
            mapper: FieldMapper::new(),
            cleaner: DataCleaner,
        }
    }

    pub fn read_planning_codes(&self, path: &Path) -> ImportResult<ReferenceImport<PlanningCode>> {
        self.read_rows(path, PLANNING_REQUIRED, |row| self.mapper.map_planning_code(row))
    }

    pub fn read_exceptions(&self, path: &Path) -> ImportResult<ReferenceImport<ExceptionEntry>> {
        self.read_rows(path, EXCEPTION_REQUIRED, |row| self.mapper.map_exception(row))
    }

    pub fn read_overrides(&self, path: &Path) -> ImportResult<ReferenceImport<OverrideEntry>> {
        self.read_rows(path, OVERRIDE_REQUIRED, |row| self.mapper.map_override(row))
    }

    /// 有效代码: 取 route_id 列，没有该列时取第一列
    pub fn read_active_codes(&self, path: &Path) -> ImportResult<Vec<String>> {
        let table = self.parser.parse_table(path)?;
        let column = if table.has_column(columns::ACTIVE_ROUTE_ID) {
            columns::ACTIVE_ROUTE_ID.to_string()
        } else {
            table
                .headers
                .first()
                .cloned()
                .ok_or_else(|| ImportError::MissingColumns(vec![columns::ACTIVE_ROUTE_ID.to_string()]))?
        };

        let codes: Vec<String> = table
            .rows
            .iter()
            .filter_map(|row| self.cleaner.cell_text(row.get(&column)))
            .collect();
        info!(file = %path.display(), count = codes.len(), "有效代码读取完成");
        Ok(codes)
    }

    /// 映射矩阵: 首行为表头（丢弃），其余每行为一组等价代码
    pub fn read_matrix_rows(&self, path: &Path) -> ImportResult<Vec<Vec<String>>> {
        let grid = self.parser.parse_grid(path)?;
        let rows: Vec<Vec<String>> = grid
            .iter()
            .skip(1)
            .map(|row| {
                row.iter()
                    .filter_map(|cell| self.cleaner.cell_text(cell))
                    .collect::<Vec<String>>()
            })
            .filter(|values| !values.is_empty())
            .collect();
        info!(file = %path.display(), rows = rows.len(), "映射矩阵读取完成");
        Ok(rows)
    }

    /// Route_ID 导出文件 → 路由键（费用匹配的外部参照）
    pub fn read_route_keys(&self, path: &Path) -> ImportResult<ReferenceImport<RouteKey>> {
        self.read_rows(
            path,
            &[&[columns::ROUTE_ID], &[columns::WAGON_NO], &[columns::INVOICE_NO]],
            |row| {
                let route_id = self.cleaner.cell_text(row.get(columns::ROUTE_ID)).ok_or_else(|| {
                    ImportError::KeyMissing {
                        row: row.row_number,
                        field: columns::ROUTE_ID.to_string(),
                    }
                })?;
                Ok(RouteKey {
                    route_id,
                    wagon_no: normalize_cell(row.get(columns::WAGON_NO)),
                    invoice_no: normalize_cell(row.get(columns::INVOICE_NO)),
                })
            },
        )
    }

    fn read_rows<T, F>(
        &self,
        path: &Path,
        required: &[&[&str]],
        map: F,
    ) -> ImportResult<ReferenceImport<T>>
    where
        F: Fn(&RawRow) -> ImportResult<T>,
    {
        let table: SheetTable = self.parser.parse_table(path)?;
        table.require_columns(required)?;

        let mut result = ReferenceImport {
            entries: Vec::with_capacity(table.rows.len()),
            skipped_rows: 0,
        };
        for row in &table.rows {
            match map(row) {
                Ok(entry) => result.entries.push(entry),
                Err(e) if e.is_row_level() => {
                    warn!(file = %path.display(), row = row.row_number, error = %e, "参照表行无效，已跳过");
                    result.skipped_rows += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            file = %path.display(),
            entries = result.entries.len(),
            skipped_rows = result.skipped_rows,
            "参照表读取完成"
        );
        Ok(result)
    }
}

impl Default for ReferenceImporter {
    fn default() -> Self {
        Self::new()
    }
}
