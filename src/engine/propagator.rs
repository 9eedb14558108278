// ==========================================
// 车皮路由对账系统 - 批次传播
// ==========================================
// 职责: 每个非零批次取扫描顺序第一个非空最终路由号，写给全体成员
// 红线: 批次 0 不传播，逐条保留自身结果
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::types::BatchId;
use crate::engine::identifier_resolver::RouteCandidate;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 传播统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub total_batches: usize,
    pub unresolved_batch_ids: Vec<BatchId>,
    pub unresolved_records: usize,
}

impl PropagationStats {
    pub fn unresolved_batches(&self) -> usize {
        self.unresolved_batch_ids.len()
    }
}

pub struct BatchPropagator;

impl BatchPropagator {
    pub fn new() -> Self {
        Self
    }

    /// 传播并写入 route_id / route_source
    ///
    /// # 参数
    /// - records: 扫描顺序的记录
    /// - finals: 与 records 下标对齐的逐条最终路由号
    #[instrument(skip_all, fields(count = records.len()))]
    pub fn propagate(
        &self,
        records: &mut [MovementRecord],
        finals: Vec<Option<RouteCandidate>>,
    ) -> PropagationStats {
        // 批次号 → 第一个非空最终值；批次首次出现顺序
        let mut batch_value: HashMap<BatchId, Option<RouteCandidate>> = HashMap::new();
        let mut batch_order: Vec<BatchId> = Vec::new();

        for (record, final_id) in records.iter().zip(finals.iter()) {
            if !record.batch_id.is_assigned() {
                continue;
            }
            let slot = batch_value.entry(record.batch_id).or_insert_with(|| {
                batch_order.push(record.batch_id);
                None
            });
            if slot.is_none() {
                *slot = final_id.clone();
            }
        }

        for (record, own) in records.iter_mut().zip(finals) {
            let value = if record.batch_id.is_assigned() {
                batch_value.get(&record.batch_id).cloned().flatten()
            } else {
                own
            };
            match value {
                Some(candidate) => {
                    record.route_id = Some(candidate.route_id);
                    record.route_source = Some(candidate.source);
                }
                None => {
                    record.route_id = None;
                    record.route_source = None;
                }
            }
        }

        let unresolved_batch_ids: Vec<BatchId> = batch_order
            .iter()
            .filter(|id| matches!(batch_value.get(id), Some(None)))
            .copied()
            .collect();
        let unresolved_records = records.iter().filter(|r| r.route_id.is_none()).count();

        debug!(
            total_batches = batch_order.len(),
            unresolved_batches = unresolved_batch_ids.len(),
            unresolved_records,
            "批次传播完成"
        );

        PropagationStats {
            total_batches: batch_order.len(),
            unresolved_batch_ids,
            unresolved_records,
        }
    }
}

impl Default for BatchPropagator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{LoadStatus, ResolutionSource};
    use chrono::NaiveDate;

    fn record(batch: u64, day: u32) -> MovementRecord {
        MovementRecord {
            wagon_no: "00000001".to_string(),
            invoice_no: format!("0000001{day}"),
            departure_station: "A".to_string(),
            destination_station: "B".to_string(),
            wagon_type: "ПВ".to_string(),
            load_status: LoadStatus::Empty,
            report_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            departure_arrival_at: None,
            destination_arrival_at: None,
            month: None,
            batch_id: BatchId(batch),
            route_id: None,
            route_source: None,
            row_number: day as usize,
        }
    }

    fn candidate(route_id: &str) -> Option<RouteCandidate> {
        Some(RouteCandidate {
            route_id: route_id.to_string(),
            source: ResolutionSource::PlanningCode,
        })
    }

    #[test]
    fn test_first_non_null_value_is_propagated() {
        let mut records = vec![record(1, 1), record(1, 2), record(1, 3)];
        let stats = BatchPropagator::new().propagate(
            &mut records,
            vec![None, candidate("100"), candidate("200")],
        );
        assert!(records
            .iter()
            .all(|r| r.route_id.as_deref() == Some("100")));
        assert_eq!(stats.total_batches, 1);
        assert_eq!(stats.unresolved_batches(), 0);
    }

    #[test]
    fn test_unresolved_batch_is_reported() {
        let mut records = vec![record(1, 1), record(2, 2), record(2, 3)];
        let stats =
            BatchPropagator::new().propagate(&mut records, vec![candidate("100"), None, None]);
        assert_eq!(stats.unresolved_batch_ids, vec![BatchId(2)]);
        assert_eq!(stats.unresolved_records, 2);
    }

    #[test]
    fn test_unassigned_records_keep_own_value() {
        let mut records = vec![record(0, 1), record(0, 2)];
        let stats =
            BatchPropagator::new().propagate(&mut records, vec![candidate("555"), None]);
        assert_eq!(records[0].route_id.as_deref(), Some("555"));
        assert!(records[1].route_id.is_none());
        assert_eq!(stats.total_batches, 0);
        assert_eq!(stats.unresolved_records, 1);
    }
}
