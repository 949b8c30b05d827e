use crate::aggregate::mean;
use crate::models::{ProjectRecord, TimelineRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STATUS_DONE: &str = "Hoàn thành";
pub const STATUS_IN_PROGRESS: &str = "Đang thực hiện";
pub const STATUS_NOT_STARTED: &str = "Chưa bắt đầu";
pub const STATUS_OVERDUE: &str = "Trễ hạn";

pub const TIMELINE_STATUSES: [&str; 4] = [
    STATUS_NOT_STARTED,
    STATUS_IN_PROGRESS,
    STATUS_DONE,
    STATUS_OVERDUE,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    #[serde(flatten)]
    pub milestone: TimelineRecord,
    pub project_name: Option<String>,
    /// Inclusive day span; `None` when either date is missing.
    pub duration_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub project_filter: Option<String>,
    pub milestone_count: usize,
    pub done: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub overdue: usize,
    pub average_progress_pct: f64,
    pub rows: Vec<TimelineRow>,
}

/// Milestones with their project names, optionally narrowed to one project id.
/// Rows keep sheet order.
pub fn summarize_timeline(
    milestones: &[TimelineRecord],
    projects: &[ProjectRecord],
    project_filter: Option<&str>,
) -> TimelineSummary {
    let names: HashMap<&str, &str> = projects
        .iter()
        .map(|project| (project.id.as_str(), project.name.as_str()))
        .collect();

    let rows: Vec<TimelineRow> = milestones
        .iter()
        .filter(|milestone| project_filter.map_or(true, |id| milestone.project_id == id))
        .map(|milestone| TimelineRow {
            project_name: names.get(milestone.project_id.as_str()).map(|name| name.to_string()),
            duration_days: match (milestone.start_date, milestone.end_date) {
                (Some(start), Some(end)) => Some((end - start).num_days() + 1),
                _ => None,
            },
            milestone: milestone.clone(),
        })
        .collect();

    let with_status = |status: &str| rows.iter().filter(|row| row.milestone.status == status).count();
    let progress: Vec<f64> = rows.iter().map(|row| row.milestone.progress_pct).collect();

    TimelineSummary {
        project_filter: project_filter.map(str::to_string),
        milestone_count: rows.len(),
        done: with_status(STATUS_DONE),
        in_progress: with_status(STATUS_IN_PROGRESS),
        not_started: with_status(STATUS_NOT_STARTED),
        overdue: with_status(STATUS_OVERDUE),
        average_progress_pct: mean(&progress),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn milestone(project_id: &str, status: &str, progress: f64) -> TimelineRecord {
        TimelineRecord {
            id: String::new(),
            project_id: project_id.to_string(),
            phase: "Setup".to_string(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            assignee: String::new(),
            status: status.to_string(),
            progress_pct: progress,
            notes: String::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn counts_statuses_and_filters_by_project() {
        let milestones = vec![
            milestone("PRJ0001", STATUS_DONE, 100.0),
            milestone("PRJ0001", STATUS_OVERDUE, 40.0),
            milestone("PRJ0002", STATUS_NOT_STARTED, 0.0),
        ];
        let all = summarize_timeline(&milestones, &[], None);
        assert_eq!(all.milestone_count, 3);
        assert_eq!(all.done, 1);
        assert_eq!(all.overdue, 1);
        assert_eq!(all.not_started, 1);
        assert_eq!(all.rows[0].duration_days, Some(10));
        assert_eq!(all.rows[0].project_name, None);

        let one = summarize_timeline(&milestones, &[], Some("PRJ0001"));
        assert_eq!(one.milestone_count, 2);
        assert_eq!(one.average_progress_pct, 70.0);
        assert_eq!(one.in_progress, 0);
    }
}
