use crate::aggregate::{mean, ratio_pct};
use crate::classify::classify_stage;
use crate::models::{AgentPerformanceRow, Channel, PipelineStage, ProjectRecord, RawRecord};
use crate::normalize::coerce_number;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTotals {
    pub total_revenue: f64,
    pub total_deals: u64,
    pub average_deal_value: f64,
    /// Mean over agents that have a conversion figure.
    pub average_conversion_pct: f64,
}

#[derive(Default)]
struct Tally {
    revenue: f64,
    deals: u64,
    won: u64,
    staged: u64,
    channels: HashMap<Channel, u64>,
}

fn modal_channel(channels: &HashMap<Channel, u64>) -> Channel {
    // ALL order breaks ties because max_by_key keeps the last maximum.
    Channel::ALL
        .into_iter()
        .rev()
        .max_by_key(|channel| channels.get(channel).copied().unwrap_or(0))
        .unwrap_or(Channel::Corporate)
}

fn ranked(mut rows: Vec<AgentPerformanceRow>) -> Vec<AgentPerformanceRow> {
    rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.owner.cmp(&b.owner)));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    rows
}

/// One row per owner, ranked by revenue. Blank owners are grouped under
/// [`UNASSIGNED`].
pub fn rollup_agents(projects: &[ProjectRecord]) -> Vec<AgentPerformanceRow> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for project in projects {
        let owner = match project.owner.trim() {
            "" => UNASSIGNED.to_string(),
            name => name.to_string(),
        };
        let tally = tallies.entry(owner).or_default();
        tally.revenue += project.revenue;
        tally.deals += 1;
        *tally.channels.entry(project.channel).or_insert(0) += 1;
        match classify_stage(&project.status) {
            Some(PipelineStage::Won) => {
                tally.won += 1;
                tally.staged += 1;
            }
            Some(_) => tally.staged += 1,
            None => {}
        }
    }

    let rows = tallies
        .into_iter()
        .map(|(owner, tally)| AgentPerformanceRow {
            rank: 0,
            channel: modal_channel(&tally.channels),
            conversion_pct: (tally.staged > 0)
                .then(|| ratio_pct(tally.won as f64, tally.staged as f64)),
            owner,
            revenue: tally.revenue,
            deal_count: tally.deals,
            won_count: tally.won,
            staged_count: tally.staged,
        })
        .collect();
    ranked(rows)
}

/// Rows of the manually maintained `sales_performance` worksheet, ranked the same
/// way as the project rollup.
pub fn agents_from_sheet(records: &[RawRecord]) -> Vec<AgentPerformanceRow> {
    let rows = records
        .iter()
        .map(|record| {
            let owner = record
                .get("Nhân viên")
                .map(crate::db::cell_text)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNASSIGNED.to_string());
            let channel = record
                .get("Kênh")
                .map(crate::db::cell_text)
                .and_then(|text| Channel::parse(&text))
                .unwrap_or(Channel::Corporate);
            AgentPerformanceRow {
                rank: 0,
                owner,
                revenue: record.get("Doanh thu").map(coerce_number).unwrap_or(0.0),
                deal_count: record.get("Số deal").map(coerce_number).unwrap_or(0.0).max(0.0) as u64,
                channel,
                won_count: 0,
                staged_count: 0,
                conversion_pct: record
                    .get("Conversion %")
                    .filter(|cell| !crate::db::cell_text(cell).trim().is_empty())
                    .map(coerce_number),
            }
        })
        .collect();
    ranked(rows)
}

pub fn agent_totals(rows: &[AgentPerformanceRow]) -> AgentTotals {
    let total_revenue: f64 = rows.iter().map(|row| row.revenue).sum();
    let total_deals: u64 = rows.iter().map(|row| row.deal_count).sum();
    let conversions: Vec<f64> = rows.iter().filter_map(|row| row.conversion_pct).collect();
    AgentTotals {
        total_revenue,
        total_deals,
        average_deal_value: if total_deals == 0 {
            0.0
        } else {
            total_revenue / total_deals as f64
        },
        average_conversion_pct: mean(&conversions),
    }
}
