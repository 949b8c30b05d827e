use crate::aggregate::{ratio_pct, to_millions};
use crate::models::{AppSettings, Channel, MonthlyRevenueRow, ProjectRecord, RawRecord};
use crate::normalize::{coerce_date, coerce_number};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Months a reporting window always covers.
pub const WINDOW_MONTHS: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueEntry {
    pub month: NaiveDate,
    pub channel: Channel,
    pub amount: f64,
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let diff = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    diff.max(0) as u32
}

/// One entry per dated project; projects without a start date cannot be placed.
pub fn entries_from_projects(projects: &[ProjectRecord]) -> Vec<RevenueEntry> {
    let mut skipped = 0usize;
    let entries = projects
        .iter()
        .filter_map(|project| match project.start_date {
            Some(date) => Some(RevenueEntry {
                month: month_start(date),
                channel: project.channel,
                amount: project.revenue,
            }),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        tracing::debug!(skipped, "projects without start date left out of monthly revenue");
    }
    entries
}

/// Rows of the manual `revenue_monthly` worksheet, one entry per channel cell.
pub fn entries_from_monthly_sheet(records: &[RawRecord]) -> Vec<RevenueEntry> {
    let mut entries = Vec::new();
    for record in records {
        let Some(month) = record.get("Tháng").and_then(coerce_date) else {
            tracing::debug!("monthly revenue row without a readable month skipped");
            continue;
        };
        for channel in Channel::ALL {
            let amount = record.get(channel.sheet_column()).map(coerce_number).unwrap_or(0.0);
            entries.push(RevenueEntry {
                month: month_start(month),
                channel,
                amount,
            });
        }
    }
    entries
}

/// Groups entries by (month, channel) into a contiguous month window.
///
/// The window starts at the first month present and runs for at least
/// [`WINDOW_MONTHS`] months, longer when the data reaches further. Without entries
/// it is the all-zero skeleton starting at `epoch`. Every row carries all three
/// channels and the cumulative target `annual_target / 12 * (index + 1)`.
pub fn build_monthly_table(
    entries: &[RevenueEntry],
    annual_target: f64,
    epoch: NaiveDate,
) -> Vec<MonthlyRevenueRow> {
    let mut sums: BTreeMap<NaiveDate, BTreeMap<Channel, f64>> = BTreeMap::new();
    for entry in entries {
        *sums
            .entry(entry.month)
            .or_default()
            .entry(entry.channel)
            .or_insert(0.0) += entry.amount;
    }

    let (start, span) = match (sums.keys().next(), sums.keys().next_back()) {
        (Some(first), Some(last)) => (*first, (months_between(*first, *last) + 1).max(WINDOW_MONTHS)),
        _ => (month_start(epoch), WINDOW_MONTHS),
    };

    let monthly_target = annual_target / WINDOW_MONTHS as f64;
    let mut cumulative_actual = 0.0;
    let mut rows = Vec::with_capacity(span as usize);
    for index in 0..span {
        let Some(month) = start.checked_add_months(Months::new(index)) else {
            break;
        };
        let grouped = sums.get(&month);
        let by_channel: BTreeMap<Channel, f64> = Channel::ALL
            .into_iter()
            .map(|channel| {
                let amount = grouped
                    .and_then(|channels| channels.get(&channel))
                    .copied()
                    .unwrap_or(0.0);
                (channel, amount)
            })
            .collect();
        let total: f64 = by_channel.values().sum();
        cumulative_actual += total;
        rows.push(MonthlyRevenueRow {
            month,
            by_channel,
            total,
            cumulative_actual,
            cumulative_target: monthly_target * (index + 1) as f64,
        });
    }
    rows
}

pub fn aggregate_monthly_revenue(
    projects: &[ProjectRecord],
    annual_target: f64,
    epoch: NaiveDate,
) -> Vec<MonthlyRevenueRow> {
    build_monthly_table(&entries_from_projects(projects), annual_target, epoch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepMeasure {
    Relative,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallStep {
    pub label: String,
    pub measure: StepMeasure,
    /// Millions; costs are negative.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueKpis {
    pub total_revenue_m: f64,
    pub achievement_pct: f64,
    pub channel_totals_m: BTreeMap<Channel, f64>,
    pub gross_profit_m: f64,
    pub gross_profit_achievement_pct: f64,
    pub external_share_pct: f64,
    pub internal_share_pct: f64,
    pub external_share_gap_pct: f64,
    pub external_share_on_target: bool,
    pub waterfall: Vec<WaterfallStep>,
}

/// Headline revenue figures for a monthly table. Gross profit and operating cost
/// come from the configured ratios, not from project costs.
pub fn revenue_kpis(rows: &[MonthlyRevenueRow], settings: &AppSettings) -> RevenueKpis {
    let mut channel_totals: BTreeMap<Channel, f64> =
        Channel::ALL.into_iter().map(|channel| (channel, 0.0)).collect();
    for row in rows {
        for (channel, amount) in &row.by_channel {
            *channel_totals.entry(*channel).or_insert(0.0) += amount;
        }
    }
    let total: f64 = channel_totals.values().sum();
    let internal = channel_totals.get(&Channel::Internal).copied().unwrap_or(0.0);

    let total_m = to_millions(total);
    let gross_m = total_m * settings.gross_margin_ratio;
    let cogs_m = total_m - gross_m;
    let operating_m = gross_m * settings.operating_cost_ratio;

    let external_share = if total == 0.0 { 0.0 } else { ratio_pct(total - internal, total) };
    let internal_share = if total == 0.0 { 0.0 } else { 100.0 - external_share };
    let gap = external_share - settings.external_share_target_pct;

    RevenueKpis {
        total_revenue_m: total_m,
        achievement_pct: ratio_pct(total, settings.revenue_target),
        channel_totals_m: channel_totals
            .into_iter()
            .map(|(channel, amount)| (channel, to_millions(amount)))
            .collect(),
        gross_profit_m: gross_m,
        gross_profit_achievement_pct: ratio_pct(gross_m, to_millions(settings.gross_profit_target)),
        external_share_pct: external_share,
        internal_share_pct: internal_share,
        external_share_gap_pct: gap,
        external_share_on_target: gap.abs() < 5.0,
        waterfall: vec![
            WaterfallStep {
                label: "Revenue".to_string(),
                measure: StepMeasure::Relative,
                amount: total_m,
            },
            WaterfallStep {
                label: "COGS".to_string(),
                measure: StepMeasure::Relative,
                amount: -cogs_m,
            },
            WaterfallStep {
                label: "Gross profit".to_string(),
                measure: StepMeasure::Total,
                amount: gross_m,
            },
            WaterfallStep {
                label: "Operating cost".to_string(),
                measure: StepMeasure::Relative,
                amount: -operating_m,
            },
            WaterfallStep {
                label: "Pretax profit".to_string(),
                measure: StepMeasure::Total,
                amount: gross_m - operating_m,
            },
        ],
    }
}
