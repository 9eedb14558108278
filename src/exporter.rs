// ==========================================
// 车皮路由对账系统 - 结果导出
// ==========================================
// 输出（CSV, UTF-8）:
//   1. Route_ID 导出: ЗНП / Вагон № / Накладная №
//   2. 对账全表（列名与日报一致，可作为下次运行的历史数据）
//   3. 费用匹配结果（原始列 + ЗНП + для 1С）
//   4. 路由建议
// ==========================================

use crate::domain::expense::ExpenseMatch;
use crate::domain::movement::ReconciledRecord;
use crate::domain::report::RouteSuggestion;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::expense_reader::ExpenseSheet;
use crate::importer::field_mapper::columns;
use chrono::NaiveDateTime;
use csv::Writer;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 导出错误
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("导出文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("导出数据不一致: {0}")]
    Mismatch(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// 默认 Route_ID 导出路径: <output_dir>/Route_ID_<YYYYmmdd_HHMMSS>.csv
pub fn default_route_id_path(output_dir: &Path, now: NaiveDateTime) -> PathBuf {
    output_dir.join(format!("Route_ID_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

fn create_writer(path: &Path) -> ExportResult<Writer<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Writer::from_path(path)?)
}

fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// 导出 Route_ID 文件
///
/// # 返回
/// - Ok(usize): 写出的数据行数
pub fn export_route_ids(records: &[ReconciledRecord], path: &Path) -> ExportResult<usize> {
    let mut writer = create_writer(path)?;
    writer.write_record([columns::ROUTE_ID, columns::WAGON_NO, columns::INVOICE_NO])?;
    for record in records {
        writer.write_record([
            record.route_id.as_str(),
            record.wagon_no(),
            record.invoice_no(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "Route_ID 已导出");
    Ok(records.len())
}

/// 导出对账全表
pub fn export_full_table(records: &[ReconciledRecord], path: &Path) -> ExportResult<usize> {
    let mut writer = create_writer(path)?;
    writer.write_record([
        columns::MONTH,
        columns::ROUTE_ID,
        columns::BATCH_ID,
        columns::WAGON_NO,
        columns::INVOICE_NO,
        columns::WN_CODE,
        columns::LOAD_STATUS,
        columns::DEPARTURE_STATION,
        columns::DESTINATION_STATION,
        columns::WAGON_TYPE,
        columns::DEPARTURE_ARRIVAL,
        columns::REPORT_DATE,
        columns::DESTINATION_ARRIVAL,
        columns::LANE,
    ])?;

    for record in records {
        let m = &record.movement;
        writer.write_record([
            m.join_month().map(|v| v.to_string()).unwrap_or_default(),
            record.route_id.clone(),
            m.batch_id.to_string(),
            m.wagon_no.clone(),
            m.invoice_no.clone(),
            m.wn_code(),
            m.load_status.to_source_str().to_string(),
            m.departure_station.clone(),
            m.destination_station.clone(),
            m.wagon_type.clone(),
            format_datetime(m.departure_arrival_at),
            format_datetime(Some(m.report_at)),
            format_datetime(m.destination_arrival_at),
            m.lane_label(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "对账全表已导出");
    Ok(records.len())
}

/// 导出费用匹配结果
///
/// 原始列保持原顺序（费用文件的 Номер вагона / Номер документа 改名为 Вагон № / Накладная №），
/// 已有的 ЗНП / для 1С 列被新值替换，追加在末尾
pub fn export_expense_sheet(
    sheet: &ExpenseSheet,
    matches: &[ExpenseMatch],
    path: &Path,
) -> ExportResult<usize> {
    if sheet.table.rows.len() != matches.len() {
        return Err(ExportError::Mismatch(format!(
            "{}: 数据行 {} 条, 匹配结果 {} 条",
            sheet.file_name,
            sheet.table.rows.len(),
            matches.len()
        )));
    }

    let source_headers: Vec<&String> = sheet
        .table
        .headers
        .iter()
        .filter(|h| h.as_str() != columns::ROUTE_ID && h.as_str() != columns::ACCOUNTING_CODE)
        .collect();

    let mut writer = create_writer(path)?;
    let mut header_row: Vec<String> = source_headers
        .iter()
        .map(|h| match h.as_str() {
            columns::EXPENSE_WAGON_NO => columns::WAGON_NO.to_string(),
            columns::EXPENSE_INVOICE_NO => columns::INVOICE_NO.to_string(),
            other => other.to_string(),
        })
        .collect();
    header_row.push(columns::ROUTE_ID.to_string());
    header_row.push(columns::ACCOUNTING_CODE.to_string());
    writer.write_record(&header_row)?;

    let cleaner = DataCleaner;
    for (row, matched) in sheet.table.rows.iter().zip(matches) {
        let mut values: Vec<String> = source_headers
            .iter()
            .map(|h| cleaner.cell_text(row.get(h)).unwrap_or_default())
            .collect();
        values.push(matched.route_code.to_string());
        values.push(matched.accounting_code.clone());
        writer.write_record(&values)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = matches.len(), "费用结果已导出");
    Ok(matches.len())
}

/// 导出路由建议
pub fn export_suggestions(suggestions: &[RouteSuggestion], path: &Path) -> ExportResult<usize> {
    let mut writer = create_writer(path)?;
    writer.write_record([
        columns::MONTH,
        columns::DEPARTURE_STATION,
        columns::DESTINATION_STATION,
        columns::WAGON_TYPE,
        "Количество",
        columns::ROUTE_ID,
    ])?;
    for s in suggestions {
        writer.write_record([
            s.month.to_string(),
            s.departure_station.clone(),
            s.destination_station.clone(),
            s.wagon_type.clone(),
            s.count.to_string(),
            s.existing_route_id.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = suggestions.len(), "路由建议已导出");
    Ok(suggestions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expense::ExpenseRow;
    use crate::domain::movement::MovementRecord;
    use crate::domain::types::{BatchId, CellValue, LoadStatus, ResolutionSource};
    use crate::importer::file_parser::SheetTable;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn dt(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn reconciled() -> ReconciledRecord {
        ReconciledRecord {
            route_id: "1001".to_string(),
            movement: MovementRecord {
                wagon_no: "00000001".to_string(),
                invoice_no: "00000010".to_string(),
                departure_station: "Курган".to_string(),
                destination_station: "Омск".to_string(),
                wagon_type: "ПВ".to_string(),
                load_status: LoadStatus::Loaded,
                report_at: dt(1),
                departure_arrival_at: None,
                destination_arrival_at: Some(dt(3)),
                month: None,
                batch_id: BatchId(1),
                route_id: Some("1001".to_string()),
                route_source: Some(ResolutionSource::PlanningCode),
                row_number: 2,
            },
        }
    }

    #[test]
    fn test_default_route_id_path() {
        let path = default_route_id_path(Path::new("/out"), dt(5));
        assert_eq!(path, PathBuf::from("/out/Route_ID_20240305_080000.csv"));
    }

    #[test]
    fn test_export_route_ids_and_full_table() {
        let dir = TempDir::new().unwrap();
        let route_path = dir.path().join("nested").join("Route_ID.csv");
        export_route_ids(&[reconciled()], &route_path).unwrap();
        let content = std::fs::read_to_string(&route_path).unwrap();
        assert_eq!(content, "ЗНП,Вагон №,Накладная №\n1001,00000001,00000010\n");

        let full_path = dir.path().join("full.csv");
        export_full_table(&[reconciled()], &full_path).unwrap();
        let content = std::fs::read_to_string(&full_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("Месяц,ЗНП,Batch ID,Вагон №"));
        assert!(lines[1].starts_with("3,1001,1,00000001,00000010,0000000100000010,ГРУЖ"));
        assert!(lines[1].ends_with("2024-03-03 08:00:00,Курган - Омск"));
    }

    #[test]
    fn test_export_expense_sheet_appends_columns() {
        let dir = TempDir::new().unwrap();
        let grid = vec![
            vec![
                CellValue::from_text("Номер вагона"),
                CellValue::from_text("Номер документа"),
                CellValue::from_text("Сумма"),
                CellValue::from_text("ЗНП"),
            ],
            vec![
                CellValue::Float(1.0),
                CellValue::from_text("10"),
                CellValue::Float(500.5),
                CellValue::from_text("old"),
            ],
        ];
        let sheet = ExpenseSheet {
            file_name: "exp.csv".to_string(),
            table: SheetTable::from_grid(grid, 0),
            rows: vec![],
        };
        let matches = vec![ExpenseMatch {
            row: ExpenseRow {
                wagon_no: "00000001".to_string(),
                invoice_no: "00000010".to_string(),
                row_number: 2,
                source_file: "exp.csv".to_string(),
            },
            route_code: 1001,
            accounting_code: "900".to_string(),
            matched: true,
        }];

        let path = dir.path().join("exp.csv");
        export_expense_sheet(&sheet, &matches, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Вагон №,Накладная №,Сумма,ЗНП,для 1С\n1,10,500.5,1001,900\n"
        );

        assert!(matches!(
            export_expense_sheet(&sheet, &[], &path),
            Err(ExportError::Mismatch(_))
        ));
    }
}
