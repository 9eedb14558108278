// ==========================================
// 对账管道场景测试
// ==========================================
// 覆盖: 批次切分 / 例外优先 / 覆写 / 去重 / 有效代码两跳解析 / 取消
// ==========================================

mod test_helpers;

use std::sync::atomic::Ordering;
use test_helpers::{dt, MovementBuilder};
use wagon_route_recon::domain::types::{BatchId, ResolutionSource};
use wagon_route_recon::domain::{
    ActiveCodeSet, ExceptionEntry, MappingEdge, MovementRecord, OverrideEntry, PlanningCode,
    ReferenceSnapshot,
};
use wagon_route_recon::engine::{
    ActiveCodeResolver, BatchSegmenter, MappingGraph, PipelineOptions, ReconcileError,
    ReconcilePipeline, SortedMovements, NOT_ACTIVE,
};

fn planning(month: u32, route_id: &str) -> PlanningCode {
    PlanningCode {
        month,
        departure_station: "Курган".to_string(),
        destination_station: "Омск".to_string(),
        wagon_type: "ПВ".to_string(),
        route_id: route_id.to_string(),
    }
}

fn snapshot_with(planning_codes: Vec<PlanningCode>) -> ReferenceSnapshot {
    ReferenceSnapshot {
        planning_codes,
        ..Default::default()
    }
}

fn edge(source: &str, target: &str) -> MappingEdge {
    MappingEdge {
        source: source.to_string(),
        target: target.to_string(),
        group: "group_0".to_string(),
    }
}

// ==========================================
// 批次切分
// ==========================================

#[test]
fn test_empty_after_loaded_joins_batch() {
    let records = vec![
        MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1)).build(),
        MovementBuilder::new("00000001", "00000011", dt(2024, 3, 2))
            .empty()
            .build(),
    ];
    let mut sorted = SortedMovements::sort(records);
    BatchSegmenter::new().assign(&mut sorted);
    let records = sorted.into_inner();

    assert!(records[0].batch_id.is_assigned());
    assert_eq!(records[0].batch_id, records[1].batch_id);
}

#[test]
fn test_leading_empty_record_stays_unassigned() {
    let records = vec![
        MovementBuilder::new("00000002", "00000020", dt(2024, 3, 1))
            .empty()
            .build(),
        MovementBuilder::new("00000002", "00000021", dt(2024, 3, 2)).build(),
    ];
    let mut sorted = SortedMovements::sort(records);
    BatchSegmenter::new().assign(&mut sorted);
    let records = sorted.into_inner();

    assert_eq!(records[0].batch_id, BatchId::UNASSIGNED);
    assert!(records[1].batch_id.is_assigned());
}

#[test]
fn test_unassigned_records_excluded_from_output() {
    let records = vec![
        MovementBuilder::new("00000002", "00000020", dt(2024, 3, 1))
            .empty()
            .build(),
        MovementBuilder::new("00000003", "00000030", dt(2024, 3, 1)).build(),
    ];
    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot_with(vec![planning(3, "100")]))
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].wagon_no(), "00000003");
    assert_eq!(outcome.diagnostics.unresolved_records, 1);
}

// ==========================================
// 候选解析与覆写
// ==========================================

#[test]
fn test_exception_beats_planning_code() {
    let records = vec![
        MovementBuilder::new("00000001", "00000042", dt(2024, 3, 1)).build(),
        MovementBuilder::new("00000001", "00000043", dt(2024, 3, 2))
            .empty()
            .build(),
    ];
    let snapshot = ReferenceSnapshot {
        planning_codes: vec![planning(3, "100")],
        exceptions: vec![ExceptionEntry {
            invoice_no: "00000042".to_string(),
            route_id: "200".to_string(),
        }],
        ..Default::default()
    };

    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot)
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    for record in &outcome.records {
        assert_eq!(record.route_id, "200");
        assert_eq!(record.movement.route_source, Some(ResolutionSource::Exception));
    }
}

#[test]
fn test_override_propagates_to_whole_batch() {
    let records = vec![
        MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1)).build(),
        MovementBuilder::new("00000001", "00000011", dt(2024, 3, 2))
            .empty()
            .build(),
    ];
    let snapshot = ReferenceSnapshot {
        planning_codes: vec![planning(3, "100")],
        overrides: vec![OverrideEntry {
            wagon_no: "00000001".to_string(),
            invoice_no: "00000011".to_string(),
            route_id: "900".to_string(),
        }],
        ..Default::default()
    };

    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot)
        .unwrap();

    let routes: Vec<&str> = outcome.records.iter().map(|r| r.route_id.as_str()).collect();
    assert_eq!(routes, vec!["900", "900"]);
}

#[test]
fn test_override_beats_exception_in_same_batch() {
    let records = vec![
        MovementBuilder::new("00000001", "00000042", dt(2024, 3, 1)).build(),
        MovementBuilder::new("00000001", "00000043", dt(2024, 3, 2))
            .empty()
            .build(),
    ];
    let snapshot = ReferenceSnapshot {
        planning_codes: vec![planning(3, "100")],
        exceptions: vec![ExceptionEntry {
            invoice_no: "00000042".to_string(),
            route_id: "200".to_string(),
        }],
        overrides: vec![OverrideEntry {
            wagon_no: "00000001".to_string(),
            invoice_no: "00000043".to_string(),
            route_id: "900".to_string(),
        }],
        ..Default::default()
    };

    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot)
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    for record in &outcome.records {
        assert_eq!(record.route_id, "900");
        assert_eq!(record.movement.route_source, Some(ResolutionSource::Override));
    }
}

#[test]
fn test_explicit_month_selects_planning_row() {
    let records = vec![MovementBuilder::new("00000001", "00000010", dt(2024, 3, 31))
        .month(4)
        .build()];
    let snapshot = snapshot_with(vec![planning(3, "100"), planning(4, "400")]);

    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot)
        .unwrap();

    assert_eq!(outcome.records[0].route_id, "400");
}

#[test]
fn test_unmatched_lane_leaves_batch_unresolved() {
    let records = vec![MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1))
        .lane("Тюмень", "Омск")
        .build()];
    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot_with(vec![planning(3, "100")]))
        .unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.diagnostics.unresolved_batches, 1);
    assert_eq!(outcome.diagnostics.unresolved_records, 1);
}

// ==========================================
// 致命错误与取消
// ==========================================

#[test]
fn test_missing_planning_table_is_fatal() {
    let records = vec![MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1)).build()];
    let err = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &ReferenceSnapshot::default())
        .unwrap_err();
    assert!(matches!(err, ReconcileError::MissingReferenceTable(_)));
}

#[test]
fn test_cancelled_pipeline_stops_before_segmenting() {
    let pipeline = ReconcilePipeline::new(PipelineOptions::default());
    pipeline.cancel_handle().store(true, Ordering::SeqCst);

    let records = vec![MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1)).build()];
    let err = pipeline
        .run(SortedMovements::sort(records), &snapshot_with(vec![planning(3, "100")]))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled { .. }));
}

// ==========================================
// 去重
// ==========================================

#[test]
fn test_duplicate_keeps_latest_report_date() {
    let records = vec![
        MovementBuilder::new("00000001", "00000042", dt(2024, 1, 1)).build(),
        MovementBuilder::new("00000001", "00000042", dt(2024, 1, 5)).build(),
    ];
    let outcome = ReconcilePipeline::default()
        .run(SortedMovements::sort(records), &snapshot_with(vec![planning(1, "300")]))
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].route_id, "300");
    assert_eq!(outcome.records[0].report_at(), dt(2024, 1, 5));
    assert_eq!(outcome.diagnostics.duplicate_group_count, 1);
}

#[test]
fn test_history_merge_keeps_incoming_version() {
    let prior = vec![MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1))
        .row(7)
        .build()];
    let incoming = vec![
        MovementBuilder::new("00000001", "00000010", dt(2024, 3, 1))
            .row(2)
            .build(),
        MovementBuilder::new("00000005", "00000050", dt(2024, 3, 4)).build(),
    ];
    let outcome = ReconcilePipeline::default()
        .run_with_history(Some(prior), incoming, &snapshot_with(vec![planning(3, "100")]))
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    let first = outcome
        .records
        .iter()
        .find(|r| r.wagon_no() == "00000001")
        .unwrap();
    assert_eq!(first.movement.row_number, 2);
}

fn month_boundary_records() -> Vec<MovementRecord> {
    vec![
        MovementBuilder::new("00000001", "00000042", dt(2024, 3, 31)).build(),
        MovementBuilder::new("00000001", "00000042", dt(2024, 4, 1)).build(),
    ]
}

fn routes_with_prior(prior: Option<Vec<MovementRecord>>) -> Vec<String> {
    let snapshot = snapshot_with(vec![planning(3, "100"), planning(4, "200")]);
    ReconcilePipeline::default()
        .run_with_history(prior, month_boundary_records(), &snapshot)
        .unwrap()
        .records
        .into_iter()
        .filter(|r| r.wagon_no() == "00000001")
        .map(|r| r.route_id)
        .collect()
}

#[test]
fn test_empty_history_still_merges_incoming() {
    let unrelated = vec![MovementBuilder::new("00000009", "00000090", dt(2024, 3, 5)).build()];

    assert_eq!(routes_with_prior(Some(Vec::new())), vec!["200".to_string()]);
    assert_eq!(routes_with_prior(Some(unrelated)), vec!["200".to_string()]);
    // 未提供历史时不做 (车号, 运单) 合并
    assert_eq!(
        routes_with_prior(None),
        vec!["100".to_string(), "200".to_string()]
    );
}

// ==========================================
// 有效代码解析
// ==========================================

#[test]
fn test_active_code_two_hop_chain() {
    let active: ActiveCodeSet = vec!["C"].into_iter().collect();
    let graph = MappingGraph::from_edges(&[edge("A", "B"), edge("B", "C")]);
    assert_eq!(ActiveCodeResolver::new(&active, &graph).resolve("A"), "C");
}

#[test]
fn test_active_code_three_hops_not_reached() {
    let active: ActiveCodeSet = vec!["C"].into_iter().collect();
    let graph = MappingGraph::from_edges(&[edge("A", "B"), edge("B", "D"), edge("D", "C")]);
    assert_eq!(
        ActiveCodeResolver::new(&active, &graph).resolve("A"),
        NOT_ACTIVE
    );
}
