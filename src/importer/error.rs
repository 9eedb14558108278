// ==========================================
// 车皮路由对账系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 文件级错误 → 跳过整个文件；行级错误 → 跳过该行并计数
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("未找到表头 (前 {scanned_rows} 行): 期望列 {expected:?}")]
    HeaderNotFound {
        expected: Vec<String>,
        scanned_rows: usize,
    },

    #[error("缺少必需列: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("表头之下没有数据行: {0}")]
    EmptyData(String),

    // ===== 数据映射错误 =====
    #[error("字段映射失败 (行 {row}): {message}")]
    FieldMappingError { row: usize, message: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("日期格式错误 (行 {row}, 字段 {field}): 无法识别 {value}")]
    DateFormatError {
        row: usize,
        field: String,
        value: String,
    },

    #[error("联接键缺失 (行 {row}): {field} 为空")]
    KeyMissing { row: usize, field: String },
}

impl ImportError {
    /// 是否为行级错误（跳过该行而非整个文件）
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            ImportError::FieldMappingError { .. }
                | ImportError::TypeConversionError { .. }
                | ImportError::DateFormatError { .. }
                | ImportError::KeyMissing { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
