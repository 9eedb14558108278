// ==========================================
// 车皮路由对账系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建库（CREATE TABLE IF NOT EXISTS），可重复执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建库
///
/// 参照表以自增 id 保存插入顺序，读取快照时按 id 排序
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS planning_code (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            month INTEGER NOT NULL,
            departure_station TEXT NOT NULL,
            destination_station TEXT NOT NULL,
            wagon_type TEXT NOT NULL,
            route_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS route_exception (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_no TEXT NOT NULL,
            route_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS route_override (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wagon_no TEXT NOT NULL,
            invoice_no TEXT NOT NULL,
            route_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS active_route (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            route_id TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS matrix_mapping (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_value TEXT NOT NULL,
            target_value TEXT NOT NULL,
            mapping_group TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matrix_mapping_source ON matrix_mapping(source_value);

        CREATE TABLE IF NOT EXISTS wagon_invoice (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            route_id TEXT NOT NULL,
            wagon_no TEXT NOT NULL,
            invoice_no TEXT NOT NULL,
            batch_id INTEGER NOT NULL,
            load_status TEXT NOT NULL,
            departure_station TEXT NOT NULL,
            destination_station TEXT NOT NULL,
            wagon_type TEXT NOT NULL,
            report_at TEXT NOT NULL,
            route_source TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_wagon_invoice_pair ON wagon_invoice(wagon_no, invoice_no);

        CREATE TABLE IF NOT EXISTS processing_log (
            log_id TEXT PRIMARY KEY,
            operation TEXT NOT NULL,
            status TEXT NOT NULL,
            file_name TEXT,
            message TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保表结构存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
