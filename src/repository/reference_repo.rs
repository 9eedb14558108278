// ==========================================
// 车皮路由对账系统 - 参照表数据仓储
// ==========================================
// 表: planning_code / route_exception / route_override / active_route / matrix_mapping
// 红线: Repository 不含业务逻辑；读取一律按插入顺序（id 升序）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::{
    ActiveCodeSet, ExceptionEntry, MappingEdge, OverrideEntry, PlanningCode, ReferenceSnapshot,
};
use crate::domain::types::MappingStrategy;
use crate::engine::active_code::MatrixEdgeBuilder;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// ReferenceRepository - 参照表仓储
// ==========================================
pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    /// 创建新的 ReferenceRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 追加写入（计划表 / 例外 / 覆写）
    // ==========================================

    /// 追加 ЗНП 计划代码
    ///
    /// # 返回
    /// - Ok(usize): 写入的记录数
    pub fn append_planning_codes(&self, codes: &[PlanningCode]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        for code in codes {
            tx.execute(
                r#"
                INSERT INTO planning_code (
                    month, departure_station, destination_station, wagon_type, route_id
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    code.month,
                    code.departure_station,
                    code.destination_station,
                    code.wagon_type,
                    code.route_id,
                ],
            )?;
        }
        tx.commit()?;
        Ok(codes.len())
    }

    pub fn append_exceptions(&self, entries: &[ExceptionEntry]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        for entry in entries {
            tx.execute(
                "INSERT INTO route_exception (invoice_no, route_id) VALUES (?1, ?2)",
                params![entry.invoice_no, entry.route_id],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn append_overrides(&self, entries: &[OverrideEntry]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        for entry in entries {
            tx.execute(
                "INSERT INTO route_override (wagon_no, invoice_no, route_id) VALUES (?1, ?2, ?3)",
                params![entry.wagon_no, entry.invoice_no, entry.route_id],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    // ==========================================
    // 整表替换（有效代码 / 映射矩阵）
    // ==========================================

    /// 替换有效代码表（空白代码跳过，重复代码只保留一条）
    ///
    /// # 返回
    /// - Ok(usize): 实际写入的代码数
    pub fn replace_active_codes(&self, codes: &[String]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM active_route", [])?;

        let mut count = 0;
        for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            count += tx.execute(
                "INSERT OR IGNORE INTO active_route (route_id) VALUES (?1)",
                params![code],
            )?;
        }
        tx.commit()?;
        info!(count, "有效代码表已替换");
        Ok(count)
    }

    /// 以矩阵行替换映射边（按指定策略建边）
    ///
    /// # 参数
    /// - rows: 矩阵文件的数据行（每行一组等价代码）
    /// - strategy: 建边策略
    pub fn replace_matrix_rows(
        &self,
        rows: &[Vec<String>],
        strategy: MappingStrategy,
    ) -> RepositoryResult<usize> {
        let edges = MatrixEdgeBuilder::new(strategy).build(rows);
        self.replace_mapping_edges(&edges)
    }

    pub fn replace_mapping_edges(&self, edges: &[MappingEdge]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM matrix_mapping", [])?;
        for edge in edges {
            tx.execute(
                r#"
                INSERT INTO matrix_mapping (source_value, target_value, mapping_group)
                VALUES (?1, ?2, ?3)
                "#,
                params![edge.source, edge.target, edge.group],
            )?;
        }
        tx.commit()?;
        info!(edges = edges.len(), "映射矩阵已替换");
        Ok(edges.len())
    }

    // ==========================================
    // 读取
    // ==========================================

    pub fn list_planning_codes(&self) -> RepositoryResult<Vec<PlanningCode>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT month, departure_station, destination_station, wagon_type, route_id
            FROM planning_code
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PlanningCode {
                month: row.get(0)?,
                departure_station: row.get(1)?,
                destination_station: row.get(2)?,
                wagon_type: row.get(3)?,
                route_id: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_exceptions(&self) -> RepositoryResult<Vec<ExceptionEntry>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT invoice_no, route_id FROM route_exception ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ExceptionEntry {
                invoice_no: row.get(0)?,
                route_id: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_overrides(&self) -> RepositoryResult<Vec<OverrideEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT wagon_no, invoice_no, route_id FROM route_override ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(OverrideEntry {
                wagon_no: row.get(0)?,
                invoice_no: row.get(1)?,
                route_id: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_active_codes(&self) -> RepositoryResult<ActiveCodeSet> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT route_id FROM active_route ORDER BY id")?;
        let codes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes.into_iter().collect())
    }

    pub fn list_mapping_edges(&self) -> RepositoryResult<Vec<MappingEdge>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_value, target_value, mapping_group FROM matrix_mapping ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MappingEdge {
                source: row.get(0)?,
                target: row.get(1)?,
                group: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 读取完整参照快照
    ///
    /// # 返回
    /// - Ok(ReferenceSnapshot): 五张表按插入顺序组成的只读快照
    pub fn load_snapshot(&self) -> RepositoryResult<ReferenceSnapshot> {
        let snapshot = ReferenceSnapshot {
            planning_codes: self.list_planning_codes()?,
            exceptions: self.list_exceptions()?,
            overrides: self.list_overrides()?,
            active_codes: self.list_active_codes()?,
            mapping_edges: self.list_mapping_edges()?,
        };
        debug!(
            planning_codes = snapshot.planning_codes.len(),
            exceptions = snapshot.exceptions.len(),
            overrides = snapshot.overrides.len(),
            active_codes = snapshot.active_codes.len(),
            mapping_edges = snapshot.mapping_edges.len(),
            "参照快照已加载"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn repo() -> ReferenceRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ReferenceRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_planning_codes_keep_insertion_order() {
        let repo = repo();
        let code = |route: &str| PlanningCode {
            month: 3,
            departure_station: "Курган".to_string(),
            destination_station: "Омск".to_string(),
            wagon_type: "ПВ".to_string(),
            route_id: route.to_string(),
        };
        repo.append_planning_codes(&[code("200"), code("100")]).unwrap();
        repo.append_planning_codes(&[code("300")]).unwrap();

        let routes: Vec<String> = repo
            .list_planning_codes()
            .unwrap()
            .into_iter()
            .map(|c| c.route_id)
            .collect();
        assert_eq!(routes, vec!["200", "100", "300"]);
    }

    #[test]
    fn test_replace_active_codes_skips_blanks() {
        let repo = repo();
        repo.replace_active_codes(&["1".to_string(), "2".to_string()])
            .unwrap();
        let written = repo
            .replace_active_codes(&["  ".to_string(), "900".to_string(), "900".to_string()])
            .unwrap();
        assert_eq!(written, 1);
        let active = repo.list_active_codes().unwrap();
        assert_eq!(active.sorted(), vec!["900".to_string()]);
    }

    #[test]
    fn test_replace_matrix_rows_uses_strategy() {
        let repo = repo();
        let rows = vec![vec!["1".to_string(), "2".to_string(), "3".to_string()]];

        repo.replace_matrix_rows(&rows, MappingStrategy::SymmetricClique)
            .unwrap();
        assert_eq!(repo.list_mapping_edges().unwrap().len(), 6);

        repo.replace_matrix_rows(&rows, MappingStrategy::ForwardChain)
            .unwrap();
        let edges = repo.list_mapping_edges().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].source, "1");
        assert_eq!(edges[0].target, "2");
    }
}
