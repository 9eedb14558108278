// ==========================================
// 车皮路由对账系统 - 路由建议
// ==========================================
// 职责: 重车记录按 (月份, 发站, 到站, 车种) 分组计数
//       并附带 ЗНП 计划表中已有的路由号，供计划员补录
// 排序: 发站, 到站, 月份, 车种
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::reference::{PlanningCode, PlanningKey};
use crate::domain::report::RouteSuggestion;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub fn suggest_routes(
    records: &[MovementRecord],
    planning_codes: &[PlanningCode],
) -> Vec<RouteSuggestion> {
    let mut existing: HashMap<PlanningKey, &str> = HashMap::new();
    for code in planning_codes {
        existing.entry(code.key()).or_insert(code.route_id.trim());
    }

    // 键顺序: (发站, 到站, 月份, 车种)
    let mut groups: BTreeMap<(String, String, u32, String), usize> = BTreeMap::new();
    let mut skipped = 0;
    for record in records.iter().filter(|r| r.is_loaded()) {
        let Some(month) = record.join_month() else {
            skipped += 1;
            continue;
        };
        let key = PlanningKey::new(
            month,
            &record.departure_station,
            &record.destination_station,
            &record.wagon_type,
        );
        *groups
            .entry((
                key.departure_station,
                key.destination_station,
                key.month,
                key.wagon_type,
            ))
            .or_default() += 1;
    }

    let suggestions: Vec<RouteSuggestion> = groups
        .into_iter()
        .map(|((departure, destination, month, wagon_type), count)| {
            let existing_route_id = existing
                .get(&PlanningKey::new(month, &departure, &destination, &wagon_type))
                .filter(|id| !id.is_empty())
                .map(|id| id.to_string());
            RouteSuggestion {
                month,
                departure_station: departure,
                destination_station: destination,
                wagon_type,
                count,
                existing_route_id,
            }
        })
        .collect();

    debug!(
        groups = suggestions.len(),
        skipped_invalid_month = skipped,
        "路由建议生成完成"
    );
    suggestions
}
