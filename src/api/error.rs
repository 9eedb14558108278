// ==========================================
// 车皮路由对账系统 - API层错误类型
// ==========================================
// 职责: 汇总下层错误，转换为调用方可读的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::ReconcileError;
use crate::exporter::ExportError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("对账失败: {0}")]
    ReconcileFailed(#[from] ReconcileError),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入 / 导出 / 配置
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("结果导出失败: {0}")]
    ExportError(#[from] ExportError),

    #[error("配置错误: {0}")]
    ConfigError(#[from] ConfigError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::from(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_import_error_conversion() {
        let err: ApiError = ImportError::FileNotFound("stg/".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = ImportError::MissingColumns(vec!["ЗНП".to_string()]).into();
        assert!(matches!(err, ApiError::ImportError(_)));
    }

    #[test]
    fn test_reconcile_error_is_wrapped() {
        let err: ApiError = ReconcileError::MissingReferenceTable("planning_code".to_string()).into();
        assert!(matches!(err, ApiError::ReconcileFailed(_)));
    }
}
