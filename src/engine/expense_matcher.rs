// ==========================================
// 车皮路由对账系统 - 费用匹配
// ==========================================
// 职责: 费用行按 (车号, 运单号) 联接对账结果，补充路由号与记账代码
// 规则:
//   1. 路由号取对账结果中首个匹配；同键多个路由号记为歧义
//   2. 路由号转为整数，缺失/非数字 → 0
//   3. 记账代码（"для 1С"）由有效代码解析器求出
// ==========================================

use crate::domain::expense::{ExpenseMatch, ExpenseRow, ExpenseSummary};
use crate::domain::movement::RouteKey;
use crate::engine::active_code::ActiveCodeResolver;
use crate::engine::key_normalizer::normalize_str;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 联接索引: (车号, 运单号) → (首个路由号, 是否存在其他路由号)
struct RouteIndex {
    by_pair: HashMap<(String, String), (String, bool)>,
}

impl RouteIndex {
    fn build(route_keys: &[RouteKey]) -> Self {
        let mut by_pair: HashMap<(String, String), (String, bool)> = HashMap::new();
        for key in route_keys {
            let pair = (normalize_str(&key.wagon_no), normalize_str(&key.invoice_no));
            let route_id = key.route_id.trim();
            match by_pair.get_mut(&pair) {
                Some((first, ambiguous)) => {
                    if first != route_id {
                        *ambiguous = true;
                    }
                }
                None => {
                    by_pair.insert(pair, (route_id.to_string(), false));
                }
            }
        }
        Self { by_pair }
    }
}

/// 路由号转整数（缺失/非数字 → 0）
pub fn coerce_route_code(route_id: Option<&str>) -> i64 {
    let Some(raw) = route_id.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    if let Ok(n) = raw.parse::<i64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => f as i64,
        _ => 0,
    }
}

pub struct ExpenseMatcher<'a> {
    index: RouteIndex,
    resolver: ActiveCodeResolver<'a>,
}

impl<'a> ExpenseMatcher<'a> {
    pub fn new(route_keys: &[RouteKey], resolver: ActiveCodeResolver<'a>) -> Self {
        Self {
            index: RouteIndex::build(route_keys),
            resolver,
        }
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    pub fn match_rows(&self, rows: Vec<ExpenseRow>) -> (Vec<ExpenseMatch>, ExpenseSummary) {
        let mut summary = ExpenseSummary {
            total_rows: rows.len(),
            ..Default::default()
        };

        let matches: Vec<ExpenseMatch> = rows
            .into_iter()
            .map(|row| {
                let hit = self
                    .index
                    .by_pair
                    .get(&(row.wagon_no.clone(), row.invoice_no.clone()));
                let route_code = coerce_route_code(hit.map(|(id, _)| id.as_str()));
                let accounting_code = self.resolver.resolve(&route_code.to_string());

                match hit {
                    Some((_, ambiguous)) => {
                        summary.matched_rows += 1;
                        if *ambiguous {
                            summary.ambiguous_rows += 1;
                        }
                    }
                    None => summary.unmatched_rows += 1,
                }

                let matched = ExpenseMatch {
                    row,
                    route_code,
                    accounting_code,
                    matched: hit.is_some(),
                };
                if !matched.is_active() {
                    summary.inactive_rows += 1;
                }
                matched
            })
            .collect();

        debug!(
            matched = summary.matched_rows,
            unmatched = summary.unmatched_rows,
            ambiguous = summary.ambiguous_rows,
            inactive = summary.inactive_rows,
            "费用匹配完成"
        );
        (matches, summary)
    }
}
