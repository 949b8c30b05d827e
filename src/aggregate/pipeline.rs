use crate::aggregate::{ratio_pct, to_millions};
use crate::classify::classify_stage;
use crate::models::{PipelineStage, PipelineStageSnapshot, PipelineUpdatePayload, ProjectRecord, RawRecord};
use crate::normalize::coerce_number;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConversion {
    pub from: PipelineStage,
    pub to: PipelineStage,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub stages: Vec<PipelineStageSnapshot>,
    pub total_count: u64,
    pub total_value: f64,
    pub conversion_rate_pct: f64,
    pub pipeline_coverage: f64,
    pub stage_conversions: Vec<StageConversion>,
}

fn empty_stages() -> Vec<PipelineStageSnapshot> {
    PipelineStage::ALL
        .into_iter()
        .map(|stage| PipelineStageSnapshot {
            stage,
            count: 0,
            value: 0.0,
        })
        .collect()
}

fn slot(stage: PipelineStage) -> usize {
    match stage {
        PipelineStage::Lead => 0,
        PipelineStage::Qualified => 1,
        PipelineStage::Proposal => 2,
        PipelineStage::Won => 3,
    }
}

/// Buckets projects into the four funnel stages by status keyword. Always four
/// rows in funnel order; stages without matches stay at zero. Values are in
/// millions.
pub fn aggregate_pipeline(projects: &[ProjectRecord]) -> Vec<PipelineStageSnapshot> {
    let mut stages = empty_stages();
    for project in projects {
        if let Some(stage) = classify_stage(&project.status) {
            let snapshot = &mut stages[slot(stage)];
            snapshot.count += 1;
            snapshot.value += to_millions(project.revenue);
        }
    }
    stages
}

/// Reads the manually maintained `sales_pipeline` worksheet. Unknown stage names
/// are ignored; repeated stages are summed.
pub fn stages_from_sheet(records: &[RawRecord]) -> Vec<PipelineStageSnapshot> {
    let mut stages = empty_stages();
    for record in records {
        let name = record.get("Stage").map(crate::db::cell_text).unwrap_or_default();
        let Some(stage) = PipelineStage::parse(&name) else {
            tracing::debug!(stage = %name, "unknown pipeline stage skipped");
            continue;
        };
        let snapshot = &mut stages[slot(stage)];
        snapshot.count += record.get("Count").map(coerce_number).unwrap_or(0.0).max(0.0) as u64;
        snapshot.value += record.get("Value").map(coerce_number).unwrap_or(0.0);
    }
    stages
}

fn stage_count(stages: &[PipelineStageSnapshot], stage: PipelineStage) -> u64 {
    stages
        .iter()
        .filter(|snapshot| snapshot.stage == stage)
        .map(|snapshot| snapshot.count)
        .sum()
}

/// Won as a share of Lead, in percent; zero without leads.
pub fn conversion_rate(stages: &[PipelineStageSnapshot]) -> f64 {
    ratio_pct(
        stage_count(stages, PipelineStage::Won) as f64,
        stage_count(stages, PipelineStage::Lead) as f64,
    )
}

/// Total deal count across all stages divided by the Won count; zero without wins.
///
/// This is a count ratio, although the name suggests value coverage against a
/// revenue target.
pub fn pipeline_coverage(stages: &[PipelineStageSnapshot]) -> f64 {
    let won = stage_count(stages, PipelineStage::Won);
    if won == 0 {
        return 0.0;
    }
    let total: u64 = stages.iter().map(|snapshot| snapshot.count).sum();
    total as f64 / won as f64
}

pub fn stage_conversions(stages: &[PipelineStageSnapshot]) -> Vec<StageConversion> {
    PipelineStage::ALL
        .windows(2)
        .map(|pair| StageConversion {
            from: pair[0],
            to: pair[1],
            rate_pct: ratio_pct(
                stage_count(stages, pair[1]) as f64,
                stage_count(stages, pair[0]) as f64,
            ),
        })
        .collect()
}

pub fn summarize(stages: Vec<PipelineStageSnapshot>) -> PipelineSummary {
    PipelineSummary {
        total_count: stages.iter().map(|snapshot| snapshot.count).sum(),
        total_value: stages.iter().map(|snapshot| snapshot.value).sum(),
        conversion_rate_pct: conversion_rate(&stages),
        pipeline_coverage: pipeline_coverage(&stages),
        stage_conversions: stage_conversions(&stages),
        stages,
    }
}

/// Four worksheet rows in funnel order for a full pipeline rewrite.
pub fn snapshot_rows(update: &PipelineUpdatePayload) -> Vec<Vec<Value>> {
    [
        (PipelineStage::Lead, update.lead),
        (PipelineStage::Qualified, update.qualified),
        (PipelineStage::Proposal, update.proposal),
        (PipelineStage::Won, update.won),
    ]
    .into_iter()
    .map(|(stage, tally)| {
        vec![
            Value::String(stage.as_str().to_string()),
            Value::from(tally.count),
            Value::from(tally.value),
        ]
    })
    .collect()
}
