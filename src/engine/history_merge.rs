// ==========================================
// 车皮路由对账系统 - 历史数据合并
// ==========================================
// 职责: 已有历史记录 + 新日报记录合并，按 (车号, 运单号) 去重
// 规则: 先历史后新增，按报告日期稳定排序，每个键保留最后一条
//       （报告日期相同时新增记录胜出）
// 时机: 批次切分之前
// ==========================================

use crate::domain::movement::MovementRecord;
use std::collections::HashMap;
use tracing::{info, instrument};

/// 合并历史与新增记录
///
/// # 返回
/// 按报告日期升序、(车号, 运单号) 唯一的记录
#[instrument(skip_all, fields(prior = prior.len(), incoming = incoming.len()))]
pub fn merge_history(
    prior: Vec<MovementRecord>,
    incoming: Vec<MovementRecord>,
) -> Vec<MovementRecord> {
    let mut combined: Vec<MovementRecord> = prior.into_iter().chain(incoming).collect();
    let total = combined.len();
    combined.sort_by_key(|r| r.report_at);

    let mut last_index: HashMap<(String, String), usize> = HashMap::new();
    for (index, record) in combined.iter().enumerate() {
        last_index.insert(record.wagon_invoice_key(), index);
    }

    let merged: Vec<MovementRecord> = combined
        .into_iter()
        .enumerate()
        .filter(|(index, record)| last_index.get(&record.wagon_invoice_key()) == Some(index))
        .map(|(_, record)| record)
        .collect();

    info!(
        total,
        merged = merged.len(),
        dropped = total - merged.len(),
        "历史数据合并完成"
    );
    merged
}
