// ==========================================
// 车皮路由对账系统 - 批次切分引擎
// ==========================================
// 职责: 在 (车号, 报告日期) 有序序列上一次扫描分配批次号
// 规则:
//   重车(LOADED) → 全局重车计数器 +1，赋新值
//   空车(EMPTY)  → 紧邻前一条记录为同一车号时沿用其批次号，否则 0
// 红线: 批次号在一次扫描内单调；0 永不参与合并和传播
// ==========================================

use crate::domain::movement::MovementRecord;
use crate::domain::types::{BatchId, LoadStatus};
use crate::engine::error::{ReconcileError, ReconcileResult};
use std::cmp::Ordering;
use tracing::{debug, instrument};

// ==========================================
// SortedMovements - 已排序的车皮动态序列
// ==========================================
// 只能通过 sort() 或校验过的 from_sorted() 构造
#[derive(Debug, Clone, Default)]
pub struct SortedMovements {
    records: Vec<MovementRecord>,
}

impl SortedMovements {
    /// 稳定排序；报告日期相同的记录保持输入顺序
    pub fn sort(mut records: Vec<MovementRecord>) -> Self {
        records.sort_by(compare_scan_order);
        Self { records }
    }

    /// 校验输入已有序
    ///
    /// # 返回
    /// - Err(UnsortedInput): 第一处逆序的位置
    pub fn from_sorted(records: Vec<MovementRecord>) -> ReconcileResult<Self> {
        if let Some(index) = records
            .windows(2)
            .position(|pair| compare_scan_order(&pair[0], &pair[1]) == Ordering::Greater)
        {
            return Err(ReconcileError::UnsortedInput { index: index + 1 });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[MovementRecord] {
        &self.records
    }

    pub fn into_inner(self) -> Vec<MovementRecord> {
        self.records
    }
}

fn compare_scan_order(a: &MovementRecord, b: &MovementRecord) -> Ordering {
    a.wagon_no
        .cmp(&b.wagon_no)
        .then_with(|| a.report_at.cmp(&b.report_at))
}

// ==========================================
// SegmentState - 扫描累加器
// ==========================================
#[derive(Debug, Default)]
struct SegmentState {
    loaded_counter: u64,
    last_batch_id: BatchId,
    last_wagon: Option<String>,
}

impl SegmentState {
    fn step(&mut self, record: &MovementRecord) -> BatchId {
        let same_wagon = self.last_wagon.as_deref() == Some(record.wagon_no.as_str());

        let batch_id = match record.load_status {
            LoadStatus::Loaded => {
                self.loaded_counter += 1;
                BatchId(self.loaded_counter)
            }
            LoadStatus::Empty if same_wagon => self.last_batch_id,
            LoadStatus::Empty => BatchId::UNASSIGNED,
        };

        self.last_batch_id = batch_id;
        self.last_wagon = Some(record.wagon_no.clone());
        batch_id
    }
}

// ==========================================
// BatchSegmenter - 批次切分器
// ==========================================
pub struct BatchSegmenter;

impl BatchSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// 分配批次号（原地写入 batch_id）
    ///
    /// # 返回
    /// 分配出的非零批次数量
    #[instrument(skip(self, movements), fields(count = movements.len()))]
    pub fn assign(&self, movements: &mut SortedMovements) -> usize {
        let state = movements
            .records
            .iter_mut()
            .fold(SegmentState::default(), |mut state, record| {
                let batch_id = state.step(record);
                record.batch_id = batch_id;
                state
            });

        let unassigned = movements
            .records
            .iter()
            .filter(|r| !r.batch_id.is_assigned())
            .count();
        debug!(
            batches = state.loaded_counter,
            unassigned_records = unassigned,
            "批次切分完成"
        );

        state.loaded_counter as usize
    }
}

impl Default for BatchSegmenter {
    fn default() -> Self {
        Self::new()
    }
}
