use crate::aggregate::monthly::RevenueKpis;
use crate::aggregate::projects::ProjectSummary;
use crate::aggregate::{ratio_pct, to_millions};
use crate::models::{AppSettings, MonthlyRevenueRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRow {
    pub metric: String,
    pub unit: String,
    pub plan: f64,
    pub actual: f64,
    pub completion_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month: NaiveDate,
    pub cumulative_target_m: f64,
    pub cumulative_actual_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanComparison {
    pub rows: Vec<PlanRow>,
    pub trend: Vec<TrendPoint>,
}

fn row(metric: &str, unit: &str, plan: f64, actual: f64) -> PlanRow {
    PlanRow {
        metric: metric.to_string(),
        unit: unit.to_string(),
        plan,
        actual,
        completion_pct: ratio_pct(actual, plan),
    }
}

/// Annual targets against actuals, plus the cumulative revenue trend.
pub fn plan_vs_actual(
    settings: &AppSettings,
    kpis: &RevenueKpis,
    projects: &ProjectSummary,
    monthly: &[MonthlyRevenueRow],
) -> PlanComparison {
    PlanComparison {
        rows: vec![
            row(
                "Doanh thu",
                "M",
                to_millions(settings.revenue_target),
                kpis.total_revenue_m,
            ),
            row(
                "Lợi nhuận gộp",
                "M",
                to_millions(settings.gross_profit_target),
                kpis.gross_profit_m,
            ),
            row(
                "Số dự án",
                "dự án",
                settings.project_target as f64,
                projects.project_count as f64,
            ),
            row("CSAT", "điểm", settings.csat_target, projects.average_csat),
            row(
                "Tỷ trọng ngoài",
                "%",
                settings.external_share_target_pct,
                kpis.external_share_pct,
            ),
        ],
        trend: monthly
            .iter()
            .map(|point| TrendPoint {
                month: point.month,
                cumulative_target_m: to_millions(point.cumulative_target),
                cumulative_actual_m: to_millions(point.cumulative_actual),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::monthly::{aggregate_monthly_revenue, revenue_kpis};
    use crate::aggregate::projects::summarize_projects;

    #[test]
    fn empty_data_compares_against_targets() {
        let settings = AppSettings::default();
        let monthly = aggregate_monthly_revenue(&[], settings.revenue_target, settings.revenue_epoch);
        let kpis = revenue_kpis(&monthly, &settings);
        let comparison = plan_vs_actual(&settings, &kpis, &summarize_projects(&[]), &monthly);

        assert_eq!(comparison.rows.len(), 5);
        assert_eq!(comparison.rows[0].plan, 80_000.0);
        assert_eq!(comparison.rows[0].completion_pct, 0.0);
        assert_eq!(comparison.rows[2].plan, 120.0);
        assert_eq!(comparison.trend.len(), 12);
        assert!((comparison.trend[11].cumulative_target_m - 80_000.0).abs() < 1e-6);
    }
}
