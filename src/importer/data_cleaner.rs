// ==========================================
// 车皮路由对账系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 日期时间解析 / 月份转换
// 日期格式: ISO / dd.mm.yyyy[ HH:MM[:SS]] / Excel 序列号
// ==========================================

use crate::domain::types::CellValue;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// 带时间的文本格式（按顺序尝试）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// 纯日期文本格式
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y%m%d"];

/// Excel 序列号合理范围（1900-01-01 ~ 9999-12-31）
const EXCEL_SERIAL_MIN: f64 = 1.0;
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM）
    pub fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 单元格转文本（空值 → None）
    ///
    /// 整值浮点去掉小数部分（60.0 → "60"）
    pub fn cell_text(&self, cell: &CellValue) -> Option<String> {
        let text = match cell {
            CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
            other => other.to_string(),
        };
        self.normalize_null(Some(text))
    }

    /// 解析日期时间单元格
    ///
    /// # 返回
    /// - Some: 日期时间单元格 / Excel 序列号 / 可识别的文本
    /// - None: 空值或无法识别
    pub fn parse_datetime(&self, cell: &CellValue) -> Option<NaiveDateTime> {
        match cell {
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Float(f) => excel_serial_to_datetime(*f),
            CellValue::Int(n) => excel_serial_to_datetime(*n as f64),
            CellValue::Text(s) => parse_datetime_text(s),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    /// 解析月份单元格
    ///
    /// # 返回
    /// - None: 空值（调用方按报告日期推导）
    /// - Some(0): 非空但无法解析（后续视为无效月份）
    /// - Some(m): 原始数值，不做范围校验
    pub fn parse_month(&self, cell: &CellValue) -> Option<u32> {
        if cell.is_empty() {
            return None;
        }
        let value = match cell {
            CellValue::Int(n) => u32::try_from(*n).ok(),
            CellValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => {
                Some(*f as u32)
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<u32>()
                    .ok()
                    .or_else(|| match trimmed.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => {
                            Some(f as u32)
                        }
                        _ => None,
                    })
            }
            _ => None,
        };
        Some(value.unwrap_or(0))
    }
}

/// 文本日期时间解析
pub fn parse_datetime_text(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Excel 序列号 → 日期时间（1900 日期系统，纪元 1899-12-30）
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(EXCEL_SERIAL_MIN..=EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  Курган  "), "Курган");
        assert_eq!(cleaner.normalize_null(Some("   ".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some(" x ".to_string())),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_cell_text_drops_integral_fraction() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.cell_text(&CellValue::Float(60.0)), Some("60".to_string()));
        assert_eq!(cleaner.cell_text(&CellValue::Empty), None);
    }

    #[test]
    fn test_parse_datetime_text_formats() {
        assert_eq!(
            parse_datetime_text("2024-03-05 08:30:00"),
            Some(dt(2024, 3, 5, 8, 30, 0))
        );
        assert_eq!(
            parse_datetime_text("05.03.2024 08:30"),
            Some(dt(2024, 3, 5, 8, 30, 0))
        );
        assert_eq!(parse_datetime_text("05.03.2024"), Some(dt(2024, 3, 5, 0, 0, 0)));
        assert_eq!(parse_datetime_text("2024-03-05"), Some(dt(2024, 3, 5, 0, 0, 0)));
        assert_eq!(parse_datetime_text("вчера"), None);
    }

    #[test]
    fn test_excel_serial_conversion() {
        // 45356 = 2024-03-05
        assert_eq!(excel_serial_to_datetime(45356.0), Some(dt(2024, 3, 5, 0, 0, 0)));
        assert_eq!(excel_serial_to_datetime(45356.5), Some(dt(2024, 3, 5, 12, 0, 0)));
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_parse_month() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_month(&CellValue::Int(3)), Some(3));
        assert_eq!(cleaner.parse_month(&CellValue::Float(4.0)), Some(4));
        assert_eq!(cleaner.parse_month(&CellValue::from_text("12")), Some(12));
        assert_eq!(cleaner.parse_month(&CellValue::from_text("март")), Some(0));
        assert_eq!(cleaner.parse_month(&CellValue::Empty), None);
    }
}
