// ==========================================
// 车皮路由对账系统 - 对账结果数据仓储
// ==========================================
// 表: wagon_invoice（最近一次对账的输出）
// 用途: 费用匹配读取 (路由号, 车号, 运单号)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::movement::{ReconciledRecord, RouteKey};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct WagonInvoiceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WagonInvoiceRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 以本次对账输出整表替换
    pub fn replace_all(&self, records: &[ReconciledRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM wagon_invoice", [])?;

        for record in records {
            let m = &record.movement;
            tx.execute(
                r#"
                INSERT INTO wagon_invoice (
                    route_id, wagon_no, invoice_no, batch_id, load_status,
                    departure_station, destination_station, wagon_type,
                    report_at, route_source
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    record.route_id,
                    m.wagon_no,
                    m.invoice_no,
                    m.batch_id.0 as i64,
                    m.load_status.to_string(),
                    m.departure_station,
                    m.destination_station,
                    m.wagon_type,
                    m.report_at,
                    m.route_source.map(|s| s.to_string()),
                ],
            )?;
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// 读取路由键（按写入顺序）
    pub fn list_route_keys(&self) -> RepositoryResult<Vec<RouteKey>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT route_id, wagon_no, invoice_no FROM wagon_invoice ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(RouteKey {
                route_id: row.get(0)?,
                wagon_no: row.get(1)?,
                invoice_no: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM wagon_invoice", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::movement::MovementRecord;
    use crate::domain::types::{BatchId, LoadStatus, ResolutionSource};
    use chrono::NaiveDate;

    fn reconciled(route: &str, wagon: &str, invoice: &str) -> ReconciledRecord {
        ReconciledRecord {
            route_id: route.to_string(),
            movement: MovementRecord {
                wagon_no: wagon.to_string(),
                invoice_no: invoice.to_string(),
                departure_station: "Курган".to_string(),
                destination_station: "Омск".to_string(),
                wagon_type: "ПВ".to_string(),
                load_status: LoadStatus::Loaded,
                report_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap(),
                departure_arrival_at: None,
                destination_arrival_at: None,
                month: None,
                batch_id: BatchId(1),
                route_id: Some(route.to_string()),
                route_source: Some(ResolutionSource::PlanningCode),
                row_number: 2,
            },
        }
    }

    #[test]
    fn test_replace_all_and_list_route_keys() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = WagonInvoiceRepository::from_connection(Arc::new(Mutex::new(conn)));

        repo.replace_all(&[reconciled("1", "00000001", "00000010")])
            .unwrap();
        repo.replace_all(&[
            reconciled("2", "00000002", "00000020"),
            reconciled("3", "00000003", "00000030"),
        ])
        .unwrap();

        let keys = repo.list_route_keys().unwrap();
        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(keys[0].route_id, "2");
        assert_eq!(keys[1].wagon_no, "00000003");
    }
}
