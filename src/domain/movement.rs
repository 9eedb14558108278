// ==========================================
// 车皮路由对账系统 - 车皮动态领域模型
// ==========================================
// 职责: 车皮动态记录 / 对账输出记录 / 路由键
// 生命周期: 导入层创建 → 管道各阶段原地修改 → 去重后只读
// ==========================================

use crate::domain::types::{BatchId, LoadStatus, ResolutionSource};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// MovementRecord - 车皮动态记录
// ==========================================
// 对齐: STGDaily 日报导出的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    // ===== 联接键（已标准化）=====
    pub wagon_no: String,   // 车号（Вагон №）
    pub invoice_no: String, // 运单号（Накладная №）

    // ===== 线路信息 =====
    pub departure_station: String,   // 发站（Ст. отправления）
    pub destination_station: String, // 到站（Ст. назначения）
    pub wagon_type: String,          // 车种（Тип вагона）
    pub load_status: LoadStatus,     // 重/空（Груж\пор）

    // ===== 时间信息 =====
    pub report_at: NaiveDateTime,                    // 报告日期（Отчетная дата）
    pub departure_arrival_at: Option<NaiveDateTime>, // 到达发站时间
    pub destination_arrival_at: Option<NaiveDateTime>, // 到达到站时间
    pub month: Option<u32>,                          // 源文件显式提供的月份（Месяц）

    // ===== 管道写入字段 =====
    pub batch_id: BatchId,                       // 批次号，0 = 未分配
    pub route_id: Option<String>,                // 最终路由号（ЗНП）
    pub route_source: Option<ResolutionSource>,  // 路由号来源

    // 元信息
    pub row_number: usize, // 原始文件行号（用于诊断）
}

impl MovementRecord {
    /// 参与 ЗНП 计划表联接的月份
    ///
    /// 显式月份优先；不在 1..=12 内视为无效（返回 None）。
    /// 未提供显式月份时取报告日期的月份。
    pub fn join_month(&self) -> Option<u32> {
        match self.month {
            Some(m) if (1..=12).contains(&m) => Some(m),
            Some(_) => None,
            None => Some(self.report_at.month()),
        }
    }

    /// (车号, 运单号) 联接键
    pub fn wagon_invoice_key(&self) -> (String, String) {
        (self.wagon_no.clone(), self.invoice_no.clone())
    }

    /// W&N 码（车号 + 运单号）
    pub fn wn_code(&self) -> String {
        format!("{}{}", self.wagon_no, self.invoice_no)
    }

    /// 线路描述（"发站 - 到站"）
    pub fn lane_label(&self) -> String {
        format!("{} - {}", self.departure_station, self.destination_station)
    }

    pub fn is_loaded(&self) -> bool {
        self.load_status == LoadStatus::Loaded
    }
}

// ==========================================
// ReconciledRecord - 对账输出记录
// ==========================================
// 红线: 只包含已解析出路由号的记录；(route_id, wagon_no, invoice_no) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub route_id: String,
    pub movement: MovementRecord,
}

impl ReconciledRecord {
    pub fn wagon_no(&self) -> &str {
        &self.movement.wagon_no
    }

    pub fn invoice_no(&self) -> &str {
        &self.movement.invoice_no
    }

    pub fn report_at(&self) -> NaiveDateTime {
        self.movement.report_at
    }

    /// 输出唯一键
    pub fn output_key(&self) -> (String, String, String) {
        (
            self.route_id.clone(),
            self.movement.wagon_no.clone(),
            self.movement.invoice_no.clone(),
        )
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            route_id: self.route_id.clone(),
            wagon_no: self.movement.wagon_no.clone(),
            invoice_no: self.movement.invoice_no.clone(),
        }
    }
}

// ==========================================
// RouteKey - 路由号导出行
// ==========================================
// 用途: Route_ID 导出文件 / 费用匹配的参照数据
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub route_id: String,
    pub wagon_no: String,
    pub invoice_no: String,
}
