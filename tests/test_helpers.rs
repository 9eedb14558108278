// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、车皮动态记录构造、CSV 测试文件写入
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::error::Error;
use std::path::Path;
use tempfile::NamedTempFile;
use wagon_route_recon::domain::types::{BatchId, LoadStatus};
use wagon_route_recon::domain::MovementRecord;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    wagon_route_recon::db::open_and_init(&db_path)?;

    Ok((temp_file, db_path))
}

/// 构造日期时间（当天 08:00）
pub fn dt(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

/// 写出 CSV 测试文件（逐行拼接）
pub fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

// ==========================================
// MovementBuilder - 车皮动态记录构造器
// ==========================================
pub struct MovementBuilder {
    record: MovementRecord,
}

impl MovementBuilder {
    pub fn new(wagon_no: &str, invoice_no: &str, report_at: NaiveDateTime) -> Self {
        Self {
            record: MovementRecord {
                wagon_no: wagon_no.to_string(),
                invoice_no: invoice_no.to_string(),
                departure_station: "Курган".to_string(),
                destination_station: "Омск".to_string(),
                wagon_type: "ПВ".to_string(),
                load_status: LoadStatus::Loaded,
                report_at,
                departure_arrival_at: None,
                destination_arrival_at: None,
                month: None,
                batch_id: BatchId::UNASSIGNED,
                route_id: None,
                route_source: None,
                row_number: 2,
            },
        }
    }

    pub fn empty(mut self) -> Self {
        self.record.load_status = LoadStatus::Empty;
        self
    }

    pub fn lane(mut self, departure: &str, destination: &str) -> Self {
        self.record.departure_station = departure.to_string();
        self.record.destination_station = destination.to_string();
        self
    }

    pub fn wagon_type(mut self, wagon_type: &str) -> Self {
        self.record.wagon_type = wagon_type.to_string();
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.record.month = Some(month);
        self
    }

    pub fn row(mut self, row_number: usize) -> Self {
        self.record.row_number = row_number;
        self
    }

    pub fn build(self) -> MovementRecord {
        self.record
    }
}
