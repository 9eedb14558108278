// ==========================================
// 车皮路由对账系统 - 字段映射器实现
// ==========================================
// 职责: 源文件列名 → 领域记录映射 + 类型转换
// 覆盖: STGDaily 日报 / ЗНП 计划表 / 例外表 / 覆写表 / 有效代码 / 费用文件
// ==========================================

use crate::domain::expense::ExpenseRow;
use crate::domain::movement::MovementRecord;
use crate::domain::reference::{ExceptionEntry, OverrideEntry, PlanningCode};
use crate::domain::types::{BatchId, CellValue, LoadStatus};
use crate::engine::key_normalizer::normalize_cell;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;

// ==========================================
// 源文件列名
// ==========================================
pub mod columns {
    pub const WAGON_NO: &str = "Вагон №";
    pub const INVOICE_NO: &str = "Накладная №";
    pub const DEPARTURE_STATION: &str = "Ст. отправления";
    pub const DESTINATION_STATION: &str = "Ст. назначения";
    pub const WAGON_TYPE: &str = "Тип вагона";
    pub const LOAD_STATUS: &str = "Груж\\пор";
    pub const REPORT_DATE: &str = "Отчетная дата";
    pub const DEPARTURE_ARRIVAL: &str = "Прибытие на ст. отправл.";
    pub const DESTINATION_ARRIVAL: &str = "Прибытие на ст. назн.";
    pub const MONTH: &str = "Месяц";
    pub const ROUTE_ID: &str = "ЗНП";
    pub const EXCEPTION_ROUTE_ID: &str = "ExceptionRouteID";
    pub const OVERRIDE_ROUTE_ID: &str = "ЗНП Override";
    pub const ACTIVE_ROUTE_ID: &str = "route_id";
    pub const BATCH_ID: &str = "Batch ID";
    pub const WN_CODE: &str = "W&N";
    pub const LANE: &str = "Custom";
    pub const ACCOUNTING_CODE: &str = "для 1С";

    // 费用文件原始列名（匹配前改名为 Вагон № / Накладная №）
    pub const EXPENSE_WAGON_NO: &str = "Номер вагона";
    pub const EXPENSE_INVOICE_NO: &str = "Номер документа";
}

use columns::*;

/// STGDaily 日报必需列
pub const MOVEMENT_REQUIRED: &[&[&str]] = &[
    &[WAGON_NO],
    &[INVOICE_NO],
    &[DEPARTURE_STATION],
    &[DESTINATION_STATION],
    &[LOAD_STATUS],
    &[REPORT_DATE],
];

pub const PLANNING_REQUIRED: &[&[&str]] = &[
    &[MONTH],
    &[DEPARTURE_STATION],
    &[DESTINATION_STATION],
    &[WAGON_TYPE],
    &[ROUTE_ID],
];

pub const EXCEPTION_REQUIRED: &[&[&str]] = &[&[INVOICE_NO], &[EXCEPTION_ROUTE_ID, ROUTE_ID]];

pub const OVERRIDE_REQUIRED: &[&[&str]] =
    &[&[WAGON_NO], &[INVOICE_NO], &[ROUTE_ID, OVERRIDE_ROUTE_ID]];

/// 费用文件必需列（原始列名或已改名列名）
pub const EXPENSE_REQUIRED: &[&[&str]] = &[
    &[EXPENSE_WAGON_NO, WAGON_NO],
    &[EXPENSE_INVOICE_NO, INVOICE_NO],
];

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 日报行 → MovementRecord
    ///
    /// # 参数
    /// - row: 原始行记录
    ///
    /// # 返回
    /// - Ok(MovementRecord): 联接键已标准化，管道字段为初始值
    /// - Err: 行级错误（联接键为空 / 重空状态无法识别 / 报告日期无法解析）
    pub fn map_movement(&self, row: &RawRow) -> ImportResult<MovementRecord> {
        let row_number = row.row_number;

        let wagon_no = self.require_key(row, &[WAGON_NO])?;
        let invoice_no = self.require_key(row, &[INVOICE_NO])?;

        let status_text = self.text(row.get(LOAD_STATUS));
        let load_status = LoadStatus::parse(&status_text).ok_or_else(|| {
            ImportError::FieldMappingError {
                row: row_number,
                message: format!("{} 无法识别: '{}'", LOAD_STATUS, status_text),
            }
        })?;

        let report_cell = row.get(REPORT_DATE);
        let report_at =
            self.cleaner
                .parse_datetime(report_cell)
                .ok_or_else(|| ImportError::DateFormatError {
                    row: row_number,
                    field: REPORT_DATE.to_string(),
                    value: report_cell.to_string(),
                })?;

        Ok(MovementRecord {
            wagon_no,
            invoice_no,
            departure_station: self.text(row.get(DEPARTURE_STATION)),
            destination_station: self.text(row.get(DESTINATION_STATION)),
            wagon_type: self.text(row.get(WAGON_TYPE)),
            load_status,
            report_at,
            departure_arrival_at: self.cleaner.parse_datetime(row.get(DEPARTURE_ARRIVAL)),
            destination_arrival_at: self.cleaner.parse_datetime(row.get(DESTINATION_ARRIVAL)),
            month: self.cleaner.parse_month(row.get(MONTH)),
            batch_id: BatchId::UNASSIGNED,
            route_id: None,
            route_source: None,
            row_number,
        })
    }

    /// ЗНП 计划表行 → PlanningCode
    pub fn map_planning_code(&self, row: &RawRow) -> ImportResult<PlanningCode> {
        let month = self
            .cleaner
            .parse_month(row.get(MONTH))
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| ImportError::TypeConversionError {
                row: row.row_number,
                field: MONTH.to_string(),
                message: format!("月份无效: '{}'", row.get(MONTH)),
            })?;

        Ok(PlanningCode {
            month,
            departure_station: self.text(row.get(DEPARTURE_STATION)),
            destination_station: self.text(row.get(DESTINATION_STATION)),
            wagon_type: self.text(row.get(WAGON_TYPE)),
            route_id: self.require_text(row, &[ROUTE_ID])?,
        })
    }

    /// 例外表行 → ExceptionEntry
    pub fn map_exception(&self, row: &RawRow) -> ImportResult<ExceptionEntry> {
        Ok(ExceptionEntry {
            invoice_no: self.require_key(row, &[INVOICE_NO])?,
            route_id: self.require_text(row, &[EXCEPTION_ROUTE_ID, ROUTE_ID])?,
        })
    }

    /// 覆写表行 → OverrideEntry
    pub fn map_override(&self, row: &RawRow) -> ImportResult<OverrideEntry> {
        Ok(OverrideEntry {
            wagon_no: self.require_key(row, &[WAGON_NO])?,
            invoice_no: self.require_key(row, &[INVOICE_NO])?,
            route_id: self.require_text(row, &[ROUTE_ID, OVERRIDE_ROUTE_ID])?,
        })
    }

    /// 费用行 → ExpenseRow（支持原始列名与改名后列名）
    ///
    /// 键为空的行保留（匹配阶段必然落空），保证输出与源文件逐行对齐
    pub fn map_expense(&self, row: &RawRow, source_file: &str) -> ExpenseRow {
        ExpenseRow {
            wagon_no: normalize_cell(row.get_any(&[EXPENSE_WAGON_NO, WAGON_NO])),
            invoice_no: normalize_cell(row.get_any(&[EXPENSE_INVOICE_NO, INVOICE_NO])),
            row_number: row.row_number,
            source_file: source_file.to_string(),
        }
    }

    // ===== 内部工具 =====

    fn text(&self, cell: &CellValue) -> String {
        self.cleaner.cell_text(cell).unwrap_or_default()
    }

    fn require_key(&self, row: &RawRow, headers: &[&str]) -> ImportResult<String> {
        let key = normalize_cell(row.get_any(headers));
        if key.is_empty() {
            return Err(ImportError::KeyMissing {
                row: row.row_number,
                field: headers.first().copied().unwrap_or_default().to_string(),
            });
        }
        Ok(key)
    }

    fn require_text(&self, row: &RawRow, headers: &[&str]) -> ImportResult<String> {
        self.cleaner
            .cell_text(row.get_any(headers))
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row.row_number,
                message: format!("{} 为空", headers.first().copied().unwrap_or_default()),
            })
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use std::collections::HashMap;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        let map: HashMap<String, CellValue> = cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        RawRow::new(7, map)
    }

    fn movement_row(status: &str) -> RawRow {
        row(&[
            (WAGON_NO, CellValue::Int(52345678)),
            (INVOICE_NO, CellValue::from_text("ЭА123")),
            (DEPARTURE_STATION, CellValue::from_text(" Курган ")),
            (DESTINATION_STATION, CellValue::from_text("Омск")),
            (WAGON_TYPE, CellValue::from_text("ПВ")),
            (LOAD_STATUS, CellValue::from_text(status)),
            (
                REPORT_DATE,
                CellValue::DateTime(
                    NaiveDate::from_ymd_opt(2024, 3, 5)
                        .unwrap()
                        .and_hms_opt(10, 0, 0)
                        .unwrap(),
                ),
            ),
            (DESTINATION_ARRIVAL, CellValue::from_text("07.03.2024 12:00")),
        ])
    }

    #[test]
    fn test_map_movement() {
        let record = FieldMapper::new().map_movement(&movement_row("ГРУЖ")).unwrap();
        assert_eq!(record.wagon_no, "52345678");
        assert_eq!(record.invoice_no, "ЭА123");
        assert_eq!(record.departure_station, "Курган");
        assert_eq!(record.load_status, LoadStatus::Loaded);
        assert_eq!(record.report_at.month(), 3);
        assert_eq!(record.destination_arrival_at.map(|d| d.day()), Some(7));
        assert!(record.departure_arrival_at.is_none());
        assert_eq!(record.month, None);
        assert_eq!(record.row_number, 7);
    }

    #[test]
    fn test_map_movement_rejects_unknown_status() {
        let err = FieldMapper::new().map_movement(&movement_row("РЕМ")).unwrap_err();
        assert!(err.is_row_level());
        assert!(matches!(err, ImportError::FieldMappingError { row: 7, .. }));
    }

    #[test]
    fn test_map_movement_requires_keys() {
        let cells = row(&[
            (INVOICE_NO, CellValue::from_text("10")),
            (LOAD_STATUS, CellValue::from_text("ПОР")),
        ]);
        let err = FieldMapper::new().map_movement(&cells).unwrap_err();
        assert!(matches!(err, ImportError::KeyMissing { .. }));
    }

    #[test]
    fn test_map_planning_code() {
        let code = FieldMapper::new()
            .map_planning_code(&row(&[
                (MONTH, CellValue::Float(3.0)),
                (DEPARTURE_STATION, CellValue::from_text("Курган")),
                (DESTINATION_STATION, CellValue::from_text("Омск")),
                (WAGON_TYPE, CellValue::from_text("ПВ")),
                (ROUTE_ID, CellValue::Int(1001)),
            ]))
            .unwrap();
        assert_eq!(code.month, 3);
        assert_eq!(code.route_id, "1001");
    }

    #[test]
    fn test_map_override_accepts_alias_column() {
        let entry = FieldMapper::new()
            .map_override(&row(&[
                (WAGON_NO, CellValue::from_text("1")),
                (INVOICE_NO, CellValue::from_text("10")),
                (OVERRIDE_ROUTE_ID, CellValue::from_text("777")),
            ]))
            .unwrap();
        assert_eq!(entry.wagon_no, "00000001");
        assert_eq!(entry.invoice_no, "00000010");
        assert_eq!(entry.route_id, "777");
    }

    #[test]
    fn test_map_expense_renames_columns() {
        let expense = FieldMapper::new()
            .map_expense(
                &row(&[
                    (EXPENSE_WAGON_NO, CellValue::Float(1.0)),
                    (EXPENSE_INVOICE_NO, CellValue::from_text("10")),
                ]),
                "март.xlsx",
            );
        assert_eq!(expense.wagon_no, "00000001");
        assert_eq!(expense.invoice_no, "00000010");
        assert_eq!(expense.source_file, "март.xlsx");
    }
}
