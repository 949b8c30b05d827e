use crate::aggregate::{count_by, mean, median, sum_by, to_millions, AmountRow, CountRow};
use crate::models::{CustomerRecord, ProjectRecord};
use serde::{Deserialize, Serialize};

pub const ACTIVE_PROJECT_STATUS: &str = "Đang thực hiện";
pub const LOW_CSAT_THRESHOLD: f64 = 4.0;
pub const RECENT_LIMIT: usize = 5;

/// Upper-inclusive CSAT bands; a score of zero means unrated and falls in none.
const CSAT_BANDS: &[(&str, f64, f64)] = &[
    ("0-3", 0.0, 3.0),
    ("3-3.5", 3.0, 3.5),
    ("3.5-4", 3.5, 4.0),
    ("4-4.5", 4.0, 4.5),
    ("4.5-5", 4.5, 5.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_count: usize,
    pub active_count: usize,
    pub total_revenue: f64,
    pub average_revenue: f64,
    pub median_revenue: f64,
    pub average_profit_pct: f64,
    pub median_profit_pct: f64,
    pub average_guests: f64,
    pub rated_count: usize,
    pub average_csat: f64,
    pub csat_distribution: Vec<CountRow>,
    pub low_csat: Vec<ProjectRecord>,
    pub revenue_by_category: Vec<AmountRow>,
    pub status_distribution: Vec<CountRow>,
    pub recent: Vec<ProjectRecord>,
}

pub fn csat_band(score: f64) -> Option<&'static str> {
    CSAT_BANDS
        .iter()
        .find(|(_, low, high)| score > *low && score <= *high)
        .map(|(label, _, _)| *label)
}

pub fn summarize_projects(projects: &[ProjectRecord]) -> ProjectSummary {
    let revenues: Vec<f64> = projects.iter().map(|project| project.revenue).collect();
    let margins: Vec<f64> = projects.iter().map(|project| project.profit_pct).collect();
    let guests: Vec<f64> = projects.iter().map(|project| project.guests).collect();
    let rated: Vec<&ProjectRecord> = projects.iter().filter(|project| project.csat > 0.0).collect();
    let scores: Vec<f64> = rated.iter().map(|project| project.csat).collect();

    let csat_distribution = CSAT_BANDS
        .iter()
        .map(|(label, _, _)| CountRow {
            label: label.to_string(),
            count: scores
                .iter()
                .filter(|score| csat_band(**score) == Some(*label))
                .count() as u64,
        })
        .collect();

    let mut low_csat: Vec<ProjectRecord> = rated
        .iter()
        .filter(|project| project.csat < LOW_CSAT_THRESHOLD)
        .map(|project| (*project).clone())
        .collect();
    low_csat.sort_by(|a, b| a.csat.total_cmp(&b.csat));

    ProjectSummary {
        project_count: projects.len(),
        active_count: projects
            .iter()
            .filter(|project| project.status == ACTIVE_PROJECT_STATUS)
            .count(),
        total_revenue: revenues.iter().sum(),
        average_revenue: mean(&revenues),
        median_revenue: median(&revenues),
        average_profit_pct: mean(&margins),
        median_profit_pct: median(&margins),
        average_guests: mean(&guests),
        rated_count: rated.len(),
        average_csat: mean(&scores),
        csat_distribution,
        low_csat,
        revenue_by_category: sum_by(
            projects
                .iter()
                .map(|project| (category_label(&project.category), project.revenue)),
        ),
        status_distribution: count_by(projects.iter().map(|project| status_label(&project.status))),
        recent: recent_projects(projects, RECENT_LIMIT),
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() {
        "Khác"
    } else {
        category
    }
}

fn status_label(status: &str) -> &str {
    if status.is_empty() {
        "Không rõ"
    } else {
        status
    }
}

/// The last `limit` rows in sheet order, newest first.
pub fn recent_projects(projects: &[ProjectRecord], limit: usize) -> Vec<ProjectRecord> {
    projects.iter().rev().take(limit).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceLine {
    pub id: String,
    pub name: String,
    pub status: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub profit_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_revenue_m: f64,
    pub total_cost_m: f64,
    pub total_profit_m: f64,
    pub average_profit_pct: f64,
    pub lines: Vec<FinanceLine>,
}

pub fn summarize_finance(projects: &[ProjectRecord]) -> FinanceSummary {
    let total_revenue: f64 = projects.iter().map(|project| project.revenue).sum();
    let total_cost: f64 = projects.iter().map(|project| project.cost).sum();
    let margins: Vec<f64> = projects.iter().map(|project| project.profit_pct).collect();
    FinanceSummary {
        total_revenue_m: to_millions(total_revenue),
        total_cost_m: to_millions(total_cost),
        total_profit_m: to_millions(total_revenue - total_cost),
        average_profit_pct: mean(&margins),
        lines: projects
            .iter()
            .map(|project| FinanceLine {
                id: project.id.clone(),
                name: project.name.clone(),
                status: project.status.clone(),
                revenue: project.revenue,
                cost: project.cost,
                profit: project.profit(),
                profit_pct: project.profit_pct,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub customer_count: usize,
    pub by_type: Vec<CountRow>,
    pub by_source: Vec<CountRow>,
    pub customers: Vec<CustomerRecord>,
}

pub fn summarize_customers(customers: &[CustomerRecord]) -> CustomerSummary {
    CustomerSummary {
        customer_count: customers.len(),
        by_type: count_by(customers.iter().map(|customer| status_label(&customer.customer_type))),
        by_source: count_by(customers.iter().map(|customer| status_label(&customer.source))),
        customers: customers.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;

    fn project(name: &str, category: &str, status: &str, revenue: f64, cost: f64, csat: f64) -> ProjectRecord {
        ProjectRecord {
            id: format!("PRJ-{}", name),
            name: name.to_string(),
            customer: String::new(),
            category: category.to_string(),
            channel: Channel::Corporate,
            start_date: None,
            end_date: None,
            revenue,
            cost,
            profit_pct: crate::normalize::profit_pct(revenue, cost),
            status: status.to_string(),
            owner: String::new(),
            csat,
            guests: 100.0,
            team: String::new(),
            notes: String::new(),
            created_at: String::new(),
        }
    }

    fn fixture() -> Vec<ProjectRecord> {
        vec![
            project("a", "Gala", ACTIVE_PROJECT_STATUS, 100.0, 80.0, 4.8),
            project("b", "Gala", "Hoàn thành", 300.0, 150.0, 3.2),
            project("c", "Hội nghị", "Lead", 200.0, 0.0, 0.0),
            project("d", "", ACTIVE_PROJECT_STATUS, 400.0, 300.0, 3.9),
        ]
    }

    #[test]
    fn project_summary_counts_and_medians() {
        let summary = summarize_projects(&fixture());
        assert_eq!(summary.project_count, 4);
        assert_eq!(summary.active_count, 2);
        assert_eq!(summary.total_revenue, 1_000.0);
        assert_eq!(summary.median_revenue, 250.0);
        assert_eq!(summary.rated_count, 3);
        assert_eq!(summary.revenue_by_category[0].label, "Gala");
        assert_eq!(summary.revenue_by_category[0].amount, 400.0);
        assert_eq!(summary.status_distribution[0].label, ACTIVE_PROJECT_STATUS);
        assert_eq!(summary.recent[0].name, "d");
    }

    #[test]
    fn csat_bands_are_upper_inclusive_and_skip_unrated() {
        assert_eq!(csat_band(3.0), Some("0-3"));
        assert_eq!(csat_band(3.5), Some("3-3.5"));
        assert_eq!(csat_band(5.0), Some("4.5-5"));
        assert_eq!(csat_band(0.0), None);

        let summary = summarize_projects(&fixture());
        let total: u64 = summary.csat_distribution.iter().map(|row| row.count).sum();
        assert_eq!(total, 3);
        let names: Vec<&str> = summary.low_csat.iter().map(|project| project.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d"]);
    }

    #[test]
    fn empty_projects_summarize_to_zero() {
        let summary = summarize_projects(&[]);
        assert_eq!(summary.project_count, 0);
        assert_eq!(summary.average_csat, 0.0);
        assert!(summary.recent.is_empty());
        assert_eq!(summary.csat_distribution.len(), 5);
    }

    #[test]
    fn finance_totals_in_millions() {
        let projects = vec![
            project("a", "Gala", "Lead", 3_000_000.0, 1_000_000.0, 0.0),
            project("b", "Gala", "Lead", 1_000_000.0, 1_500_000.0, 0.0),
        ];
        let finance = summarize_finance(&projects);
        assert_eq!(finance.total_revenue_m, 4.0);
        assert_eq!(finance.total_cost_m, 2.5);
        assert_eq!(finance.total_profit_m, 1.5);
        assert_eq!(finance.lines[1].profit, -500_000.0);
    }
}
