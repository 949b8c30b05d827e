//! Page models. A render is a pure function of an immutable [`ViewState`], the
//! loaded [`Dataset`] and the settings; nothing is remembered between renders.

use crate::aggregate::agents::{agent_totals, agents_from_sheet, rollup_agents, AgentTotals};
use crate::aggregate::monthly::{
    build_monthly_table, entries_from_monthly_sheet, entries_from_projects, revenue_kpis, RevenueKpis,
};
use crate::aggregate::pipeline::{aggregate_pipeline, stages_from_sheet, summarize, PipelineSummary};
use crate::aggregate::plan::{plan_vs_actual, PlanComparison};
use crate::aggregate::projects::{
    recent_projects, summarize_customers, summarize_finance, summarize_projects, CustomerSummary,
    FinanceSummary, ProjectSummary, RECENT_LIMIT,
};
use crate::aggregate::staff::{summarize_staff, StaffSummary, ACTIVE_STAFF_STATUS};
use crate::aggregate::timeline::{summarize_timeline, TimelineSummary};
use crate::aggregate::{to_millions, AmountRow};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AgentPerformanceRow, AppSettings, Channel, CustomerRecord, MonthlyRevenueRow, ProjectRecord,
    StaffRecord,
};
use crate::providers::Dataset;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    #[default]
    Overview,
    Channels,
    Sales,
    Projects,
    Plan,
    Finance,
    Staff,
    Timeline,
    Customers,
}

impl Page {
    pub const ALL: [Page; 9] = [
        Page::Overview,
        Page::Channels,
        Page::Sales,
        Page::Projects,
        Page::Plan,
        Page::Finance,
        Page::Staff,
        Page::Timeline,
        Page::Customers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Channels => "channels",
            Self::Sales => "sales",
            Self::Projects => "projects",
            Self::Plan => "plan",
            Self::Finance => "finance",
            Self::Staff => "staff",
            Self::Timeline => "timeline",
            Self::Customers => "customers",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        let wanted = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|page| page.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|page| page.as_str()).collect();
                AppError::Validation(format!("unknown page {}; expected one of {}", value, known.join(", ")))
            })
    }
}

/// What the reader is looking at. Values are never mutated; the `with_*` methods
/// return a new state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub page: Page,
    /// Channels shown in revenue series; empty shows all.
    pub channel_filter: Vec<Channel>,
    pub status_filter: Vec<String>,
    pub category_filter: Vec<String>,
    pub project_filter: Option<String>,
    pub search: Option<String>,
}

impl ViewState {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn with_channels(self, channels: Vec<Channel>) -> Self {
        Self {
            channel_filter: channels,
            ..self
        }
    }

    pub fn with_statuses(self, statuses: Vec<String>) -> Self {
        Self {
            status_filter: statuses,
            ..self
        }
    }

    pub fn with_categories(self, categories: Vec<String>) -> Self {
        Self {
            category_filter: categories,
            ..self
        }
    }

    pub fn with_project(self, project_id: Option<String>) -> Self {
        Self {
            project_filter: project_id,
            ..self
        }
    }

    pub fn with_search(self, search: Option<String>) -> Self {
        Self {
            search: search.filter(|needle| !needle.trim().is_empty()),
            ..self
        }
    }

    pub fn shows_channel(&self, channel: Channel) -> bool {
        self.channel_filter.is_empty() || self.channel_filter.contains(&channel)
    }

    fn matches_search<T: Serialize>(&self, item: &T) -> bool {
        let Some(needle) = self.search.as_deref() else {
            return true;
        };
        let needle = needle.trim().to_lowercase();
        serde_json::to_value(item)
            .map(|value| value_contains(&value, &needle))
            .unwrap_or(false)
    }

    pub fn matches_project(&self, project: &ProjectRecord) -> bool {
        (self.status_filter.is_empty() || self.status_filter.contains(&project.status))
            && (self.category_filter.is_empty() || self.category_filter.contains(&project.category))
            && self.matches_search(project)
    }

    pub fn filter_projects(&self, projects: &[ProjectRecord]) -> Vec<ProjectRecord> {
        projects
            .iter()
            .filter(|project| self.matches_project(project))
            .cloned()
            .collect()
    }

    pub fn filter_staff(&self, staff: &[StaffRecord]) -> Vec<StaffRecord> {
        staff
            .iter()
            .filter(|member| self.status_filter.is_empty() || self.status_filter.contains(&member.status))
            .filter(|member| self.matches_search(*member))
            .cloned()
            .collect()
    }

    pub fn filter_customers(&self, customers: &[CustomerRecord]) -> Vec<CustomerRecord> {
        customers
            .iter()
            .filter(|customer| self.matches_search(*customer))
            .cloned()
            .collect()
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(text) => text.to_lowercase().contains(needle),
        Value::Number(number) => number.to_string().contains(needle),
        Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        Value::Object(map) => map.values().any(|item| value_contains(item, needle)),
        Value::Bool(_) | Value::Null => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub project_count: usize,
    pub active_project_count: usize,
    pub customer_count: usize,
    pub staff_count: usize,
    pub active_staff_count: usize,
    pub total_revenue_m: f64,
    pub average_profit_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevenueSource {
    RevenueMonthly,
    Projects,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "kebab-case")]
pub enum PageModel {
    #[serde(rename_all = "camelCase")]
    Overview {
        headline: Headline,
        revenue: RevenueKpis,
        pipeline: PipelineSummary,
        leaderboard: Vec<AgentPerformanceRow>,
        recent: Vec<ProjectRecord>,
    },
    #[serde(rename_all = "camelCase")]
    Channels {
        source: RevenueSource,
        channels: Vec<Channel>,
        monthly: Vec<MonthlyRevenueRow>,
        kpis: RevenueKpis,
        customer_mix: Vec<AmountRow>,
    },
    #[serde(rename_all = "camelCase")]
    Sales {
        pipeline: PipelineSummary,
        agents: Vec<AgentPerformanceRow>,
        totals: AgentTotals,
        recorded: Vec<AgentPerformanceRow>,
    },
    #[serde(rename_all = "camelCase")]
    Projects {
        view: ViewState,
        summary: ProjectSummary,
        rows: Vec<ProjectRecord>,
    },
    Plan {
        comparison: PlanComparison,
    },
    Finance {
        summary: FinanceSummary,
    },
    #[serde(rename_all = "camelCase")]
    Staff {
        summary: StaffSummary,
        rows: Vec<StaffRecord>,
    },
    Timeline {
        summary: TimelineSummary,
    },
    Customers {
        summary: CustomerSummary,
    },
}

/// Monthly table from the manual monthly worksheet when it has rows, otherwise
/// derived from projects.
pub fn monthly_table(data: &Dataset, settings: &AppSettings) -> (RevenueSource, Vec<MonthlyRevenueRow>) {
    let manual = entries_from_monthly_sheet(&data.revenue_monthly);
    let (source, entries) = if manual.is_empty() {
        (RevenueSource::Projects, entries_from_projects(&data.projects))
    } else {
        (RevenueSource::RevenueMonthly, manual)
    };
    (
        source,
        build_monthly_table(&entries, settings.revenue_target, settings.revenue_epoch),
    )
}

/// Pipeline from the manual snapshot worksheet when it has rows, otherwise from
/// project statuses.
pub fn pipeline_summary(data: &Dataset) -> PipelineSummary {
    if data.sales_pipeline.is_empty() {
        summarize(aggregate_pipeline(&data.projects))
    } else {
        summarize(stages_from_sheet(&data.sales_pipeline))
    }
}

pub fn render(view: &ViewState, data: &Dataset, settings: &AppSettings) -> PageModel {
    match view.page {
        Page::Overview => {
            let (_, monthly) = monthly_table(data, settings);
            let projects = summarize_projects(&data.projects);
            let mut leaderboard = rollup_agents(&data.projects);
            leaderboard.truncate(LEADERBOARD_SIZE);
            PageModel::Overview {
                headline: Headline {
                    project_count: projects.project_count,
                    active_project_count: projects.active_count,
                    customer_count: data.customers.len(),
                    staff_count: data.staff.len(),
                    active_staff_count: data
                        .staff
                        .iter()
                        .filter(|member| member.status == ACTIVE_STAFF_STATUS)
                        .count(),
                    total_revenue_m: to_millions(projects.total_revenue),
                    average_profit_pct: projects.average_profit_pct,
                },
                revenue: revenue_kpis(&monthly, settings),
                pipeline: pipeline_summary(data),
                leaderboard,
                recent: recent_projects(&data.projects, RECENT_LIMIT),
            }
        }
        Page::Channels => {
            let (source, monthly) = monthly_table(data, settings);
            let kpis = revenue_kpis(&monthly, settings);
            let channels: Vec<Channel> = Channel::ALL
                .into_iter()
                .filter(|channel| view.shows_channel(*channel))
                .collect();
            let monthly = monthly
                .into_iter()
                .map(|mut row| {
                    row.by_channel.retain(|channel, _| view.shows_channel(*channel));
                    row
                })
                .collect();
            let customer_mix = kpis
                .channel_totals_m
                .iter()
                .filter(|(channel, _)| view.shows_channel(**channel))
                .map(|(channel, amount)| AmountRow {
                    label: channel.as_str().to_string(),
                    amount: *amount,
                })
                .collect();
            PageModel::Channels {
                source,
                channels,
                monthly,
                kpis,
                customer_mix,
            }
        }
        Page::Sales => {
            let agents = rollup_agents(&data.projects);
            PageModel::Sales {
                pipeline: pipeline_summary(data),
                totals: agent_totals(&agents),
                agents,
                recorded: agents_from_sheet(&data.sales_performance),
            }
        }
        Page::Projects => {
            let rows = view.filter_projects(&data.projects);
            PageModel::Projects {
                view: view.clone(),
                summary: summarize_projects(&rows),
                rows,
            }
        }
        Page::Plan => {
            let (_, monthly) = monthly_table(data, settings);
            let kpis = revenue_kpis(&monthly, settings);
            PageModel::Plan {
                comparison: plan_vs_actual(settings, &kpis, &summarize_projects(&data.projects), &monthly),
            }
        }
        Page::Finance => PageModel::Finance {
            summary: summarize_finance(&view.filter_projects(&data.projects)),
        },
        Page::Staff => PageModel::Staff {
            summary: summarize_staff(&data.staff, &data.projects),
            rows: view.filter_staff(&data.staff),
        },
        Page::Timeline => PageModel::Timeline {
            summary: summarize_timeline(&data.timeline, &data.projects, view.project_filter.as_deref()),
        },
        Page::Customers => {
            let mut summary = summarize_customers(&data.customers);
            summary.customers = view.filter_customers(&data.customers);
            PageModel::Customers { summary }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::load_dataset;
    use crate::providers::sample::SampleProvider;

    fn sample() -> Dataset {
        load_dataset(&SampleProvider::new(11)).expect("dataset")
    }

    #[test]
    fn pages_parse_by_name() {
        assert_eq!(Page::parse("Channels").expect("page"), Page::Channels);
        assert!(Page::parse("home").is_err());
    }

    #[test]
    fn view_state_builders_leave_the_base_untouched() {
        let base = ViewState::new(Page::Projects);
        let narrowed = base.clone().with_search(Some("gala".to_string()));
        assert_eq!(base.search, None);
        assert_eq!(narrowed.search.as_deref(), Some("gala"));
        assert_eq!(base.clone().with_search(Some("  ".to_string())).search, None);
    }

    #[test]
    fn channel_filter_hides_series_but_not_totals() {
        let data = sample();
        let settings = AppSettings::default();
        let all = render(&ViewState::new(Page::Channels), &data, &settings);
        let gov_only = render(
            &ViewState::new(Page::Channels).with_channels(vec![Channel::Gov]),
            &data,
            &settings,
        );
        let (PageModel::Channels { monthly: full, .. }, PageModel::Channels { monthly, channels, .. }) =
            (all, gov_only)
        else {
            panic!("channels page expected");
        };
        assert_eq!(channels, vec![Channel::Gov]);
        assert!(monthly.iter().all(|row| row.by_channel.len() == 1));
        assert_eq!(full[0].total, monthly[0].total);
    }

    #[test]
    fn project_filters_narrow_rows() {
        let data = sample();
        let status = data.projects[0].status.clone();
        let view = ViewState::new(Page::Projects).with_statuses(vec![status.clone()]);
        let PageModel::Projects { rows, summary, .. } = render(&view, &data, &AppSettings::default()) else {
            panic!("projects page expected");
        };
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|project| project.status == status));
        assert_eq!(summary.project_count, rows.len());
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let data = sample();
        let id = data.projects[3].id.to_lowercase();
        let view = ViewState::new(Page::Projects).with_search(Some(id.clone()));
        let rows = view.filter_projects(&data.projects);
        assert!(rows.iter().any(|project| project.id.to_lowercase() == id));
    }

    #[test]
    fn every_page_renders_on_empty_data() {
        let settings = AppSettings::default();
        for page in Page::ALL {
            let model = render(&ViewState::new(page), &Dataset::default(), &settings);
            let json = serde_json::to_value(&model).expect("serializable");
            assert_eq!(json["page"], serde_json::json!(page.as_str()));
        }
    }
}
