// ==========================================
// 车皮路由对账系统 - 人工覆写应用
// ==========================================
// 职责: 全量记录按 (车号, 运单号) 联接覆写表，求出逐条最终路由号
// 规则:
//   1. 记录自身命中覆写 → 覆写值
//   2. 所在批次任一成员命中覆写 → 批次内扫描顺序第一个覆写值
//   3. 否则 → 批次候选（批次 0 无候选）
// 红线: 覆写 > 例外 > 计划代码
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::reference::ReferenceSnapshot;
use crate::domain::types::{BatchId, ResolutionSource};
use crate::engine::identifier_resolver::{CandidateResolution, RouteCandidate};
use crate::engine::key_normalizer::normalize_str;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub struct OverrideApplier;

impl OverrideApplier {
    pub fn new() -> Self {
        Self
    }

    /// 求逐条最终路由号
    ///
    /// # 返回
    /// 与 records 下标对齐的最终路由号（None = 未解析）
    #[instrument(skip_all, fields(count = records.len()))]
    pub fn apply(
        &self,
        records: &[MovementRecord],
        resolution: &CandidateResolution,
        snapshot: &ReferenceSnapshot,
    ) -> Vec<Option<RouteCandidate>> {
        let overrides = build_override_index(snapshot);

        let own: Vec<Option<RouteCandidate>> = records
            .iter()
            .map(|r| {
                overrides
                    .get(&(r.wagon_no.clone(), r.invoice_no.clone()))
                    .map(|route_id| RouteCandidate {
                        route_id: route_id.clone(),
                        source: ResolutionSource::Override,
                    })
            })
            .collect();

        // 批次内扫描顺序第一个覆写
        let mut batch_override: HashMap<BatchId, RouteCandidate> = HashMap::new();
        for (record, hit) in records.iter().zip(own.iter()) {
            if let (true, Some(candidate)) = (record.batch_id.is_assigned(), hit) {
                batch_override
                    .entry(record.batch_id)
                    .or_insert_with(|| candidate.clone());
            }
        }

        let override_hits = own.iter().filter(|hit| hit.is_some()).count();
        debug!(
            override_hits,
            overridden_batches = batch_override.len(),
            "覆写应用完成"
        );

        records
            .iter()
            .zip(own)
            .map(|(record, own_hit)| {
                if own_hit.is_some() {
                    return own_hit;
                }
                if !record.batch_id.is_assigned() {
                    return None;
                }
                batch_override
                    .get(&record.batch_id)
                    .or_else(|| resolution.candidates.get(&record.batch_id))
                    .cloned()
            })
            .collect()
    }
}

impl Default for OverrideApplier {
    fn default() -> Self {
        Self::new()
    }
}

fn build_override_index(snapshot: &ReferenceSnapshot) -> HashMap<(String, String), String> {
    let mut index = HashMap::new();
    for entry in &snapshot.overrides {
        let route_id = entry.route_id.trim();
        if route_id.is_empty() {
            continue;
        }
        index
            .entry((
                normalize_str(&entry.wagon_no),
                normalize_str(&entry.invoice_no),
            ))
            .or_insert_with(|| route_id.to_string());
    }
    index
}
