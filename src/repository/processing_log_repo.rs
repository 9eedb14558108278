// ==========================================
// 车皮路由对账系统 - 处理日志数据仓储
// ==========================================
// 表: processing_log
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::processing_log::{LogStatus, ProcessingLogEntry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ProcessingLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessingLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录一次处理
    ///
    /// # 返回
    /// - `Ok(log_id)`: 新日志的 ID
    pub fn log_operation(
        &self,
        operation: &str,
        status: LogStatus,
        file_name: Option<&str>,
        message: Option<&str>,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let log_id = Uuid::new_v4().to_string();
        let created_at = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();

        conn.execute(
            r#"
            INSERT INTO processing_log (
                log_id, operation, status, file_name, message, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                log_id,
                operation,
                status.to_string(),
                file_name,
                message,
                created_at
            ],
        )?;

        Ok(log_id)
    }

    /// 最近的日志（新 → 旧）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ProcessingLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT log_id, operation, status, file_name, message, created_at
            FROM processing_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let status: String = row.get(2)?;
            let created_at: String = row.get(5)?;
            Ok(ProcessingLogEntry {
                log_id: row.get(0)?,
                operation: row.get(1)?,
                status: LogStatus::parse(&status).unwrap_or(LogStatus::Error),
                file_name: row.get(3)?,
                message: row.get(4)?,
                created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                    .unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    #[test]
    fn test_log_operation_and_list_recent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = ProcessingLogRepository::new(Arc::new(Mutex::new(conn)));

        repo.log_operation("import_reference", LogStatus::Success, Some("znp.csv"), None)
            .unwrap();
        repo.log_operation("reconcile", LogStatus::Error, None, Some("无有效月份"))
            .unwrap();

        let entries = repo.list_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "reconcile");
        assert_eq!(entries[0].status, LogStatus::Error);
        assert_eq!(entries[1].file_name.as_deref(), Some("znp.csv"));

        assert_eq!(repo.list_recent(1).unwrap().len(), 1);
    }
}
