// ==========================================
// 车皮路由对账系统 - 参照表领域模型
// ==========================================
// 职责: ЗНП 计划表 / 例外表 / 覆写表 / 有效代码集 / 映射边
// 红线: 单次对账期间参照数据为只读快照
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// PlanningCode - ЗНП 计划代码
// ==========================================
// 键: (月份, 发站, 到站, 车种)；键不唯一属源数据配置错误，不在此校验
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningCode {
    pub month: u32,
    pub departure_station: String,
    pub destination_station: String,
    pub wagon_type: String,
    pub route_id: String,
}

impl PlanningCode {
    pub fn key(&self) -> PlanningKey {
        PlanningKey::new(
            self.month,
            &self.departure_station,
            &self.destination_station,
            &self.wagon_type,
        )
    }
}

/// ЗНП 计划表联接键（站名/车种已 TRIM）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanningKey {
    pub month: u32,
    pub departure_station: String,
    pub destination_station: String,
    pub wagon_type: String,
}

impl PlanningKey {
    pub fn new(month: u32, departure: &str, destination: &str, wagon_type: &str) -> Self {
        Self {
            month,
            departure_station: departure.trim().to_string(),
            destination_station: destination.trim().to_string(),
            wagon_type: wagon_type.trim().to_string(),
        }
    }
}

// ==========================================
// ExceptionEntry - 运单级例外
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub invoice_no: String,
    pub route_id: String,
}

// ==========================================
// OverrideEntry - 车号+运单级人工覆写
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub wagon_no: String,
    pub invoice_no: String,
    pub route_id: String,
}

// ==========================================
// MappingEdge - 映射矩阵有向边
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEdge {
    pub source: String,
    pub target: String,
    pub group: String, // 产生该边的矩阵行标识
}

// ==========================================
// ActiveCodeSet - 有效代码集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCodeSet {
    codes: HashSet<String>,
}

impl ActiveCodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入代码（TRIM，空白忽略）；返回是否为新代码
    pub fn insert(&mut self, code: &str) -> bool {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.codes.insert(trimmed.to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// 排序后的代码列表（用于落库/展示）
    pub fn sorted(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes.iter().cloned().collect();
        codes.sort();
        codes
    }
}

impl<S: AsRef<str>> FromIterator<S> for ActiveCodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ActiveCodeSet::new();
        for code in iter {
            set.insert(code.as_ref());
        }
        set
    }
}

// ==========================================
// ReferenceSnapshot - 参照数据快照
// ==========================================
// 用途: 单次对账 / 费用匹配期间共享的只读参照数据
// 表内顺序即"首个匹配"的判定顺序（仓储按插入顺序返回）
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    pub planning_codes: Vec<PlanningCode>,
    pub exceptions: Vec<ExceptionEntry>,
    pub overrides: Vec<OverrideEntry>,
    pub active_codes: ActiveCodeSet,
    pub mapping_edges: Vec<MappingEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_key_trims() {
        let code = PlanningCode {
            month: 3,
            departure_station: " Курган ".to_string(),
            destination_station: "Омск".to_string(),
            wagon_type: " ПВ".to_string(),
            route_id: "100".to_string(),
        };
        assert_eq!(code.key(), PlanningKey::new(3, "Курган", "Омск", "ПВ"));
    }

    #[test]
    fn test_active_code_set() {
        let set: ActiveCodeSet = vec![" 100 ", "", "200", "100"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("100"));
        assert!(set.contains(" 200"));
        assert!(!set.contains(""));
        assert_eq!(set.sorted(), vec!["100".to_string(), "200".to_string()]);
    }
}
