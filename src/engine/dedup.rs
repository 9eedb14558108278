// ==========================================
// 车皮路由对账系统 - 重复记录处理
// ==========================================
// 职责:
//   1. 排除未解析记录
//   2. 按 (路由号, 车号, 运单号) 分组，保留报告日期最新的一条
//      （同一时刻以输入顺序靠后者为准）
//   3. 报告被多个 (车号, 运单号) 共用的路由号（只报告，不纠正）
// 红线: 输出在 (路由号, 车号, 运单号) 上唯一，保留原始相对顺序
// ==========================================

use crate::domain::movement::{MovementRecord, ReconciledRecord};
use crate::domain::report::{DuplicateGroup, SharedRouteGroup};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{instrument, warn};

/// 去重结果
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub records: Vec<ReconciledRecord>,
    pub excluded_unresolved: usize,
    pub duplicate_group_count: usize,
    pub duplicate_samples: Vec<DuplicateGroup>,
    pub shared_group_count: usize,
    pub shared_samples: Vec<SharedRouteGroup>,
}

pub struct DuplicateResolver {
    duplicate_sample_limit: usize,
    shared_sample_limit: usize,
}

impl DuplicateResolver {
    /// 创建去重器
    ///
    /// # 参数
    /// - duplicate_sample_limit: 重复组诊断样本数
    /// - shared_sample_limit: 共享路由号诊断样本数
    pub fn new(duplicate_sample_limit: usize, shared_sample_limit: usize) -> Self {
        Self {
            duplicate_sample_limit,
            shared_sample_limit,
        }
    }

    #[instrument(skip_all, fields(count = records.len()))]
    pub fn resolve(&self, records: Vec<MovementRecord>) -> DedupOutcome {
        let total = records.len();
        let resolved: Vec<ReconciledRecord> = records
            .into_iter()
            .filter_map(|movement| {
                movement.route_id.clone().map(|route_id| ReconciledRecord {
                    route_id,
                    movement,
                })
            })
            .collect();
        let excluded_unresolved = total - resolved.len();

        // 唯一键 → (保留下标, 出现次数)
        let mut winners: HashMap<(String, String, String), (usize, usize)> = HashMap::new();
        let mut first_seen: Vec<(String, String, String)> = Vec::new();
        for (index, record) in resolved.iter().enumerate() {
            let key = record.output_key();
            match winners.get_mut(&key) {
                Some((kept, occurrences)) => {
                    *occurrences += 1;
                    if record.report_at() >= resolved[*kept].report_at() {
                        *kept = index;
                    }
                }
                None => {
                    first_seen.push(key.clone());
                    winners.insert(key, (index, 1));
                }
            }
        }

        let mut duplicate_group_count = 0;
        let mut duplicate_samples = Vec::new();
        for key in &first_seen {
            let (kept, occurrences) = winners[key];
            if occurrences < 2 {
                continue;
            }
            duplicate_group_count += 1;
            if duplicate_samples.len() < self.duplicate_sample_limit {
                duplicate_samples.push(DuplicateGroup {
                    route_id: key.0.clone(),
                    wagon_no: key.1.clone(),
                    invoice_no: key.2.clone(),
                    occurrences,
                    kept_report_at: resolved[kept].report_at(),
                });
            }
        }
        if duplicate_group_count > 0 {
            warn!(
                duplicate_group_count,
                samples = ?duplicate_samples,
                "发现重复记录组，已按最新报告日期折叠"
            );
        }

        let mut keep = vec![false; resolved.len()];
        for (kept, _) in winners.values() {
            keep[*kept] = true;
        }
        let records: Vec<ReconciledRecord> = resolved
            .into_iter()
            .zip(keep)
            .filter_map(|(record, kept)| kept.then_some(record))
            .collect();

        let (shared_group_count, shared_samples) = self.find_shared_identifiers(&records);
        if shared_group_count > 0 {
            warn!(
                shared_group_count,
                samples = ?shared_samples,
                "发现被多个 (车号, 运单号) 共用的路由号"
            );
        }

        DedupOutcome {
            records,
            excluded_unresolved,
            duplicate_group_count,
            duplicate_samples,
            shared_group_count,
            shared_samples,
        }
    }

    fn find_shared_identifiers(
        &self,
        records: &[ReconciledRecord],
    ) -> (usize, Vec<SharedRouteGroup>) {
        let mut by_route: BTreeMap<&str, BTreeSet<(&str, &str)>> = BTreeMap::new();
        for record in records {
            by_route
                .entry(record.route_id.as_str())
                .or_default()
                .insert((record.wagon_no(), record.invoice_no()));
        }

        let shared: Vec<SharedRouteGroup> = by_route
            .into_iter()
            .filter(|(_, pairs)| pairs.len() > 1)
            .map(|(route_id, pairs)| SharedRouteGroup {
                route_id: route_id.to_string(),
                pairs: pairs
                    .into_iter()
                    .map(|(w, i)| (w.to_string(), i.to_string()))
                    .collect(),
            })
            .collect();

        let count = shared.len();
        let samples = shared.into_iter().take(self.shared_sample_limit).collect();
        (count, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BatchId, LoadStatus};
    use chrono::NaiveDate;

    fn resolved(route: Option<&str>, wagon: &str, invoice: &str, day: u32) -> MovementRecord {
        MovementRecord {
            wagon_no: wagon.to_string(),
            invoice_no: invoice.to_string(),
            departure_station: "A".to_string(),
            destination_station: "B".to_string(),
            wagon_type: "ПВ".to_string(),
            load_status: LoadStatus::Loaded,
            report_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            departure_arrival_at: None,
            destination_arrival_at: None,
            month: None,
            batch_id: BatchId(1),
            route_id: route.map(str::to_string),
            route_source: None,
            row_number: day as usize,
        }
    }

    #[test]
    fn test_latest_report_wins() {
        let outcome = DuplicateResolver::new(3, 5).resolve(vec![
            resolved(Some("100"), "W1", "I1", 5),
            resolved(Some("100"), "W1", "I1", 9),
            resolved(Some("100"), "W1", "I1", 7),
        ]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].movement.row_number, 9);
        assert_eq!(outcome.duplicate_group_count, 1);
        assert_eq!(outcome.duplicate_samples[0].occurrences, 3);
    }

    #[test]
    fn test_tie_keeps_later_input() {
        let outcome = DuplicateResolver::new(3, 5).resolve(vec![
            resolved(Some("100"), "W1", "I1", 5),
            {
                let mut later = resolved(Some("100"), "W1", "I1", 5);
                later.row_number = 42;
                later
            },
        ]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].movement.row_number, 42);
    }

    #[test]
    fn test_unresolved_records_are_excluded() {
        let outcome = DuplicateResolver::new(3, 5).resolve(vec![
            resolved(None, "W1", "I1", 1),
            resolved(Some("100"), "W2", "I2", 2),
        ]);
        assert_eq!(outcome.excluded_unresolved, 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_shared_identifier_is_reported_not_removed() {
        let outcome = DuplicateResolver::new(3, 5).resolve(vec![
            resolved(Some("100"), "W1", "I1", 1),
            resolved(Some("100"), "W2", "I2", 2),
            resolved(Some("200"), "W3", "I3", 3),
        ]);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.shared_group_count, 1);
        assert_eq!(outcome.shared_samples[0].route_id, "100");
        assert_eq!(outcome.shared_samples[0].pairs.len(), 2);
    }

    #[test]
    fn test_output_keeps_original_order() {
        let outcome = DuplicateResolver::new(3, 5).resolve(vec![
            resolved(Some("300"), "W3", "I3", 1),
            resolved(Some("100"), "W1", "I1", 2),
            resolved(Some("200"), "W2", "I2", 3),
        ]);
        let routes: Vec<&str> = outcome.records.iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(routes, vec!["300", "100", "200"]);
    }
}
