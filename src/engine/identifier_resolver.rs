// ==========================================
// 车皮路由对账系统 - 路由号候选解析
// ==========================================
// 职责: 为每个非零批次求出候选路由号
// 输入: 已切分批次的记录 + 参照快照（ЗНП 计划表 / 例外表）
// 输出: 批次号 → 候选（例外优先于计划代码）
// 规则:
//   1. 只看重车记录，批次 0 跳过
//   2. 月份: 显式月份（1..=12）否则取报告日期月份
//   3. 计划表按 (月份, 发站, 到站, 车种) 联接；例外表按运单号联接
//   4. 同一批次内各取第一个非空值，例外 > 计划代码
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::reference::{PlanningKey, ReferenceSnapshot};
use crate::domain::types::{BatchId, ResolutionSource};
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::key_normalizer::normalize_str;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// 解析出的路由号及其来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub route_id: String,
    pub source: ResolutionSource,
}

/// 候选解析结果
#[derive(Debug, Clone, Default)]
pub struct CandidateResolution {
    pub candidates: HashMap<BatchId, RouteCandidate>,
    pub loaded_records: usize,
    pub invalid_month_records: usize,
    pub conflicting_planning_keys: usize,
}

// ==========================================
// PlanningIndex - 计划表哈希索引
// ==========================================
// 重复键: 表内第一条生效，值不同的重复键计数
struct PlanningIndex {
    by_key: HashMap<PlanningKey, String>,
    conflicts: usize,
}

impl PlanningIndex {
    fn build(snapshot: &ReferenceSnapshot) -> Self {
        let mut by_key: HashMap<PlanningKey, String> = HashMap::new();
        let mut conflicts = 0;

        for code in &snapshot.planning_codes {
            let route_id = code.route_id.trim();
            if route_id.is_empty() {
                continue;
            }
            match by_key.get(&code.key()) {
                Some(existing) if existing != route_id => conflicts += 1,
                Some(_) => {}
                None => {
                    by_key.insert(code.key(), route_id.to_string());
                }
            }
        }

        Self { by_key, conflicts }
    }

    fn lookup(&self, month: u32, record: &MovementRecord) -> Option<&String> {
        let key = PlanningKey::new(
            month,
            &record.departure_station,
            &record.destination_station,
            &record.wagon_type,
        );
        self.by_key.get(&key)
    }
}

fn build_exception_index(snapshot: &ReferenceSnapshot) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for entry in &snapshot.exceptions {
        let route_id = entry.route_id.trim();
        if route_id.is_empty() {
            continue;
        }
        index
            .entry(normalize_str(&entry.invoice_no))
            .or_insert_with(|| route_id.to_string());
    }
    index
}

// ==========================================
// IdentifierResolver - 候选解析器
// ==========================================
pub struct IdentifierResolver;

impl IdentifierResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析每个批次的候选路由号
    ///
    /// # 参数
    /// - records: 已分配批次号的记录（扫描顺序）
    /// - snapshot: 参照数据快照
    ///
    /// # 返回
    /// - Ok(CandidateResolution): 没有重车记录时为空结果
    /// - Err(MissingReferenceTable): 存在重车记录但计划表为空
    /// - Err(MonthDerivationFailed): 没有任何重车记录得到有效月份
    #[instrument(skip(self, records, snapshot), fields(count = records.len()))]
    pub fn resolve(
        &self,
        records: &[MovementRecord],
        snapshot: &ReferenceSnapshot,
    ) -> ReconcileResult<CandidateResolution> {
        let loaded: Vec<&MovementRecord> = records
            .iter()
            .filter(|r| r.is_loaded() && r.batch_id.is_assigned())
            .collect();

        if loaded.is_empty() {
            debug!("没有重车记录，跳过候选解析");
            return Ok(CandidateResolution::default());
        }

        if snapshot.planning_codes.is_empty() {
            return Err(ReconcileError::MissingReferenceTable(
                "planning_code".to_string(),
            ));
        }

        let months: Vec<Option<u32>> = loaded.iter().map(|r| r.join_month()).collect();
        let invalid_month_records = months.iter().filter(|m| m.is_none()).count();
        if invalid_month_records == loaded.len() {
            return Err(ReconcileError::MonthDerivationFailed {
                loaded_records: loaded.len(),
            });
        }
        if invalid_month_records > 0 {
            warn!(
                invalid_month_records,
                "部分重车记录月份无效，已排除在计划表联接之外"
            );
        }

        let planning = PlanningIndex::build(snapshot);
        if planning.conflicts > 0 {
            warn!(
                conflicting_planning_keys = planning.conflicts,
                "ЗНП 计划表存在同键不同值的记录，按表内首条生效"
            );
        }
        let exceptions = build_exception_index(snapshot);

        // 批次内各来源的第一个非空值
        let mut exception_hits: HashMap<BatchId, String> = HashMap::new();
        let mut planning_hits: HashMap<BatchId, String> = HashMap::new();

        for (record, month) in loaded.iter().zip(months.iter()) {
            if let Some(route_id) = exceptions.get(&record.invoice_no) {
                exception_hits
                    .entry(record.batch_id)
                    .or_insert_with(|| route_id.clone());
            }
            if let Some(route_id) = month.and_then(|m| planning.lookup(m, record)) {
                planning_hits
                    .entry(record.batch_id)
                    .or_insert_with(|| route_id.clone());
            }
        }

        let mut candidates: HashMap<BatchId, RouteCandidate> = planning_hits
            .into_iter()
            .map(|(batch_id, route_id)| {
                (
                    batch_id,
                    RouteCandidate {
                        route_id,
                        source: ResolutionSource::PlanningCode,
                    },
                )
            })
            .collect();
        for (batch_id, route_id) in exception_hits {
            candidates.insert(
                batch_id,
                RouteCandidate {
                    route_id,
                    source: ResolutionSource::Exception,
                },
            );
        }

        debug!(
            loaded_records = loaded.len(),
            resolved_batches = candidates.len(),
            "候选解析完成"
        );

        Ok(CandidateResolution {
            candidates,
            loaded_records: loaded.len(),
            invalid_month_records,
            conflicting_planning_keys: planning.conflicts,
        })
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::{ExceptionEntry, PlanningCode};
    use crate::domain::types::LoadStatus;
    use chrono::NaiveDate;

    fn loaded(wagon: &str, invoice: &str, batch: u64) -> MovementRecord {
        MovementRecord {
            wagon_no: wagon.to_string(),
            invoice_no: invoice.to_string(),
            departure_station: "Курган".to_string(),
            destination_station: "Омск".to_string(),
            wagon_type: "ПВ".to_string(),
            load_status: LoadStatus::Loaded,
            report_at: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            departure_arrival_at: None,
            destination_arrival_at: None,
            month: None,
            batch_id: BatchId(batch),
            route_id: None,
            route_source: None,
            row_number: 1,
        }
    }

    fn planning(month: u32, route_id: &str) -> PlanningCode {
        PlanningCode {
            month,
            departure_station: "Курган".to_string(),
            destination_station: "Омск".to_string(),
            wagon_type: "ПВ".to_string(),
            route_id: route_id.to_string(),
        }
    }

    #[test]
    fn test_planning_code_candidate() {
        let snapshot = ReferenceSnapshot {
            planning_codes: vec![planning(3, "100")],
            ..Default::default()
        };
        let result = IdentifierResolver::new()
            .resolve(&[loaded("00000001", "00000010", 1)], &snapshot)
            .unwrap();
        let candidate = &result.candidates[&BatchId(1)];
        assert_eq!(candidate.route_id, "100");
        assert_eq!(candidate.source, ResolutionSource::PlanningCode);
    }

    #[test]
    fn test_exception_beats_planning_code() {
        let snapshot = ReferenceSnapshot {
            planning_codes: vec![planning(3, "100")],
            exceptions: vec![ExceptionEntry {
                invoice_no: "10".to_string(),
                route_id: "200".to_string(),
            }],
            ..Default::default()
        };
        let result = IdentifierResolver::new()
            .resolve(&[loaded("00000001", "00000010", 1)], &snapshot)
            .unwrap();
        let candidate = &result.candidates[&BatchId(1)];
        assert_eq!(candidate.route_id, "200");
        assert_eq!(candidate.source, ResolutionSource::Exception);
    }

    #[test]
    fn test_explicit_month_overrides_report_date() {
        let snapshot = ReferenceSnapshot {
            planning_codes: vec![planning(3, "100"), planning(4, "400")],
            ..Default::default()
        };
        let mut record = loaded("00000001", "00000010", 1);
        record.month = Some(4);
        let result = IdentifierResolver::new()
            .resolve(&[record], &snapshot)
            .unwrap();
        assert_eq!(result.candidates[&BatchId(1)].route_id, "400");
    }

    #[test]
    fn test_first_planning_row_wins_on_duplicate_key() {
        let snapshot = ReferenceSnapshot {
            planning_codes: vec![planning(3, "100"), planning(3, "999")],
            ..Default::default()
        };
        let result = IdentifierResolver::new()
            .resolve(&[loaded("00000001", "00000010", 1)], &snapshot)
            .unwrap();
        assert_eq!(result.candidates[&BatchId(1)].route_id, "100");
        assert_eq!(result.conflicting_planning_keys, 1);
    }

    #[test]
    fn test_missing_planning_table_is_fatal() {
        let err = IdentifierResolver::new()
            .resolve(
                &[loaded("00000001", "00000010", 1)],
                &ReferenceSnapshot::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MissingReferenceTable("planning_code".to_string())
        );
    }

    #[test]
    fn test_no_valid_month_is_fatal() {
        let snapshot = ReferenceSnapshot {
            planning_codes: vec![planning(3, "100")],
            ..Default::default()
        };
        let mut record = loaded("00000001", "00000010", 1);
        record.month = Some(13);
        let err = IdentifierResolver::new()
            .resolve(&[record], &snapshot)
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MonthDerivationFailed { loaded_records: 1 }
        );
    }

    #[test]
    fn test_no_loaded_records_is_empty_result() {
        let mut record = loaded("00000001", "00000010", 0);
        record.load_status = LoadStatus::Empty;
        let result = IdentifierResolver::new()
            .resolve(&[record], &ReferenceSnapshot::default())
            .unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.loaded_records, 0);
    }
}
