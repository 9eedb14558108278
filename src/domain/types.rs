// ==========================================
// 车皮路由对账系统 - 领域类型定义
// ==========================================
// 职责: 装卸状态、批次号、单元格值、解析来源等基础类型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 装卸状态 (Load Status)
// ==========================================
// 源数据列 "Груж\пор": ГРУЖ = 重车, ПОР = 空车
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Loaded, // 重车（ГРУЖ）
    Empty,  // 空车（ПОР）
}

impl LoadStatus {
    /// 源文件中的写法
    pub fn to_source_str(&self) -> &'static str {
        match self {
            LoadStatus::Loaded => "ГРУЖ",
            LoadStatus::Empty => "ПОР",
        }
    }

    /// 解析源文件写法（兼容英文写法，大小写不敏感）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "ГРУЖ" | "LOADED" => Some(LoadStatus::Loaded),
            "ПОР" | "EMPTY" => Some(LoadStatus::Empty),
            _ => None,
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded => write!(f, "LOADED"),
            LoadStatus::Empty => write!(f, "EMPTY"),
        }
    }
}

// ==========================================
// 批次号 (Batch Id)
// ==========================================
// 0 保留为"未分配"，永不参与传播与合并
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    pub const UNASSIGNED: BatchId = BatchId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// 路由号来源 (Resolution Source)
// ==========================================
// 优先级: Override > Exception > PlanningCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionSource {
    PlanningCode, // ЗНП 计划表
    Exception,    // 运单级例外
    Override,     // 车号+运单级人工覆写
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::PlanningCode => write!(f, "PLANNING_CODE"),
            ResolutionSource::Exception => write!(f, "EXCEPTION"),
            ResolutionSource::Override => write!(f, "OVERRIDE"),
        }
    }
}

// ==========================================
// 映射矩阵建边策略 (Mapping Strategy)
// ==========================================
// 矩阵文件每行是一组等价代码，历史上存在两种建边方式：
// - SymmetricClique: 行内任意两值之间建双向边
// - ForwardChain: 仅从每个值指向其后一个值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
    #[default]
    SymmetricClique,
    ForwardChain,
}

impl MappingStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "symmetric_clique" | "clique" => Some(MappingStrategy::SymmetricClique),
            "forward_chain" | "chain" => Some(MappingStrategy::ForwardChain),
            _ => None,
        }
    }
}

impl fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingStrategy::SymmetricClique => write!(f, "symmetric_clique"),
            MappingStrategy::ForwardChain => write!(f, "forward_chain"),
        }
    }
}

// ==========================================
// 单元格值 (Cell Value)
// ==========================================
// 文件解析层产出的类型化单元格，保留数值/文本差异供键标准化使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 空值判定（空白文本视为空）
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// 从文本构造（空白文本转为 Empty）
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_status_parse() {
        assert_eq!(LoadStatus::parse("ГРУЖ"), Some(LoadStatus::Loaded));
        assert_eq!(LoadStatus::parse(" пор "), Some(LoadStatus::Empty));
        assert_eq!(LoadStatus::parse("loaded"), Some(LoadStatus::Loaded));
        assert_eq!(LoadStatus::parse("РЕМ"), None);
    }

    #[test]
    fn test_batch_id_unassigned() {
        assert!(!BatchId::UNASSIGNED.is_assigned());
        assert!(BatchId(3).is_assigned());
        assert_eq!(BatchId::default(), BatchId::UNASSIGNED);
    }

    #[test]
    fn test_mapping_strategy_parse() {
        assert_eq!(
            MappingStrategy::parse("forward_chain"),
            Some(MappingStrategy::ForwardChain)
        );
        assert_eq!(
            MappingStrategy::parse("Clique"),
            Some(MappingStrategy::SymmetricClique)
        );
        assert_eq!(MappingStrategy::parse("tree"), None);
    }

    #[test]
    fn test_cell_value_empty() {
        assert!(CellValue::from_text("   ").is_empty());
        assert!(CellValue::Float(f64::NAN).is_empty());
        assert!(!CellValue::Int(0).is_empty());
    }
}
