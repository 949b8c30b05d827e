use crate::aggregate::{count_by, mean, AmountRow, CountRow};
use crate::models::{ProjectRecord, StaffRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const ACTIVE_STAFF_STATUS: &str = "Đang làm";
const TOP_PERFORMERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffWorkload {
    pub name: String,
    pub project_count: u64,
    pub department: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub staff_count: usize,
    pub active_count: usize,
    pub by_department: Vec<CountRow>,
    pub by_position: Vec<CountRow>,
    pub average_salary_by_department: Vec<AmountRow>,
    /// Project owners by number of projects, busiest first.
    pub workload: Vec<StaffWorkload>,
    pub top_performers: Vec<StaffWorkload>,
}

fn label(value: &str) -> &str {
    if value.is_empty() {
        "Khác"
    } else {
        value
    }
}

/// Staff headcount figures plus project workload per owner. Owners that are not on
/// the staff sheet still appear, without department or position.
pub fn summarize_staff(staff: &[StaffRecord], projects: &[ProjectRecord]) -> StaffSummary {
    let mut salaries: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for member in staff {
        salaries
            .entry(label(&member.department))
            .or_default()
            .push(member.salary);
    }
    let mut average_salary_by_department: Vec<AmountRow> = salaries
        .into_iter()
        .map(|(department, values)| AmountRow {
            label: department.to_string(),
            amount: mean(&values),
        })
        .collect();
    average_salary_by_department.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    let directory: HashMap<&str, &StaffRecord> = staff
        .iter()
        .map(|member| (member.full_name.as_str(), member))
        .collect();
    let workload: Vec<StaffWorkload> = count_by(
        projects
            .iter()
            .map(|project| project.owner.trim())
            .filter(|owner| !owner.is_empty()),
    )
    .into_iter()
    .map(|row| {
        let member = directory.get(row.label.as_str());
        StaffWorkload {
            department: member.map(|member| member.department.clone()),
            position: member.map(|member| member.position.clone()),
            name: row.label,
            project_count: row.count,
        }
    })
    .collect();

    StaffSummary {
        staff_count: staff.len(),
        active_count: staff
            .iter()
            .filter(|member| member.status == ACTIVE_STAFF_STATUS)
            .count(),
        by_department: count_by(staff.iter().map(|member| label(&member.department))),
        by_position: count_by(staff.iter().map(|member| label(&member.position))),
        average_salary_by_department,
        top_performers: workload.iter().take(TOP_PERFORMERS).cloned().collect(),
        workload,
    }
}
