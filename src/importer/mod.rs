// ==========================================
// 车皮路由对账系统 - 导入层
// ==========================================
// 职责: 外部文件 → 领域记录
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod expense_reader;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod movement_importer;
pub mod reference_importer;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use expense_reader::{ExpenseReader, ExpenseSheet};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, HeaderLocator, RawRow, SheetTable, UniversalFileParser};
pub use movement_importer::{FileImport, FolderImport, StgDailyImporter};
pub use reference_importer::{ReferenceImport, ReferenceImporter, ReferenceTable};

// 重导出 Trait 接口
pub use importer_trait::{FileParser, MovementImporter};
