// ==========================================
// 车皮路由对账系统 - 有效代码解析
// ==========================================
// 职责: 沿映射矩阵把路由号解析为有效代码（最多 2 跳）
// 规则:
//   0 跳: 自身有效 → 自身
//   1 跳: 依边插入顺序检查每个直接目标；目标无效时立即检查其直接目标
//   未命中 → NOT_ACTIVE
// 边构建: 矩阵每行是一组等价代码，按 MappingStrategy 建边
// ==========================================

use crate::domain::reference::{ActiveCodeSet, MappingEdge};
use crate::domain::types::MappingStrategy;
use std::collections::HashMap;
use tracing::debug;

/// 无法解析到有效代码时的固定返回值
pub const NOT_ACTIVE: &str = "value is not active";

// ==========================================
// MappingGraph - 映射邻接表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MappingGraph {
    adjacency: HashMap<String, Vec<String>>,
    edge_count: usize,
}

impl MappingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从边列表构建（保留边插入顺序）
    pub fn from_edges(edges: &[MappingEdge]) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.source, &edge.target);
        }
        graph
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.adjacency
            .entry(source.trim().to_string())
            .or_default()
            .push(target.trim().to_string());
        self.edge_count += 1;
    }

    pub fn targets(&self, source: &str) -> &[String] {
        self.adjacency
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

// ==========================================
// MatrixEdgeBuilder - 矩阵行建边
// ==========================================
pub struct MatrixEdgeBuilder {
    strategy: MappingStrategy,
}

impl MatrixEdgeBuilder {
    pub fn new(strategy: MappingStrategy) -> Self {
        Self { strategy }
    }

    /// 从原始矩阵行构建映射边
    ///
    /// # 参数
    /// - rows: 矩阵文件各行的单元格文本（空白单元格忽略）
    ///
    /// # 返回
    /// 边列表；非空值少于 2 个的行跳过，分组标识为 group_{行号}
    pub fn build(&self, rows: &[Vec<String>]) -> Vec<MappingEdge> {
        let mut edges = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            let values: Vec<&str> = row
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect();
            if values.len() < 2 {
                continue;
            }

            let group = format!("group_{}", row_index);
            let mut push = |source: &str, target: &str| {
                edges.push(MappingEdge {
                    source: source.to_string(),
                    target: target.to_string(),
                    group: group.clone(),
                });
            };

            match self.strategy {
                MappingStrategy::SymmetricClique => {
                    for i in 0..values.len() - 1 {
                        for j in (i + 1)..values.len() {
                            push(values[i], values[j]);
                            push(values[j], values[i]);
                        }
                    }
                }
                MappingStrategy::ForwardChain => {
                    for pair in values.windows(2) {
                        push(pair[0], pair[1]);
                    }
                }
            }
        }

        debug!(
            strategy = %self.strategy,
            rows = rows.len(),
            edges = edges.len(),
            "映射矩阵建边完成"
        );
        edges
    }
}

// ==========================================
// ActiveCodeResolver - 有效代码解析器
// ==========================================
pub struct ActiveCodeResolver<'a> {
    active: &'a ActiveCodeSet,
    graph: &'a MappingGraph,
}

impl<'a> ActiveCodeResolver<'a> {
    pub fn new(active: &'a ActiveCodeSet, graph: &'a MappingGraph) -> Self {
        Self { active, graph }
    }

    /// 解析有效代码
    ///
    /// # 返回
    /// 有效代码，或 NOT_ACTIVE
    pub fn resolve(&self, code: &str) -> String {
        let code = code.trim();
        if self.active.contains(code) {
            return code.to_string();
        }

        for target in self.graph.targets(code) {
            if self.active.contains(target) {
                return target.clone();
            }
            if let Some(second) = self
                .graph
                .targets(target)
                .iter()
                .find(|t| self.active.contains(t))
            {
                return second.clone();
            }
        }

        NOT_ACTIVE.to_string()
    }
}
