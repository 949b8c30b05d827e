pub mod sample;
pub mod sheet;
pub mod workbook;

use crate::errors::{AppError, AppResult};
use crate::models::{
    CustomerRecord, ProjectRecord, RawRecord, StaffRecord, TimelineRecord, Worksheet,
};
use crate::normalize::{
    customer_from_record, normalize_worksheet, project_from_record, staff_from_record,
    timeline_from_record,
};
use serde::Serialize;

pub use sheet::SheetProvider;

/// A source of raw worksheet records. Aggregations only ever ask for "all rows of
/// worksheet X", so any source that can answer that can back the dashboard.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn records(&self, sheet: Worksheet) -> AppResult<Vec<RawRecord>>;

    /// The writable store behind this provider. Read-only sources refuse.
    fn writer(&self) -> AppResult<&SheetProvider> {
        Err(AppError::Validation(format!(
            "data source {} is read-only",
            self.name()
        )))
    }
}

/// Every worksheet, normalized and typed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub projects: Vec<ProjectRecord>,
    pub staff: Vec<StaffRecord>,
    pub customers: Vec<CustomerRecord>,
    pub timeline: Vec<TimelineRecord>,
    pub revenue_monthly: Vec<RawRecord>,
    pub sales_pipeline: Vec<RawRecord>,
    pub sales_performance: Vec<RawRecord>,
}

pub fn normalized_records(provider: &dyn DataProvider, sheet: Worksheet) -> AppResult<Vec<RawRecord>> {
    Ok(normalize_worksheet(sheet, provider.records(sheet)?))
}

pub fn load_dataset(provider: &dyn DataProvider) -> AppResult<Dataset> {
    let projects = normalized_records(provider, Worksheet::Projects)?;
    let staff = normalized_records(provider, Worksheet::Staff)?;
    let customers = normalized_records(provider, Worksheet::Customers)?;
    let timeline = normalized_records(provider, Worksheet::Timeline)?;

    let dataset = Dataset {
        projects: projects.iter().map(project_from_record).collect(),
        staff: staff.iter().map(staff_from_record).collect(),
        customers: customers.iter().map(customer_from_record).collect(),
        timeline: timeline.iter().map(timeline_from_record).collect(),
        revenue_monthly: normalized_records(provider, Worksheet::RevenueMonthly)?,
        sales_pipeline: normalized_records(provider, Worksheet::SalesPipeline)?,
        sales_performance: normalized_records(provider, Worksheet::SalesPerformance)?,
    };
    tracing::debug!(
        provider = provider.name(),
        projects = dataset.projects.len(),
        staff = dataset.staff.len(),
        customers = dataset.customers.len(),
        milestones = dataset.timeline.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::{load_dataset, DataProvider};
    use crate::providers::sample::SampleProvider;

    #[test]
    fn read_only_provider_refuses_writes() {
        let provider = SampleProvider::new(7);
        let error = provider.writer().err().expect("read-only");
        assert!(error.to_string().starts_with("VALIDATION_FAILED"));
    }

    #[test]
    fn dataset_is_typed_from_any_provider() {
        let dataset = load_dataset(&SampleProvider::new(7)).expect("dataset");
        assert!(!dataset.projects.is_empty());
        assert!(dataset.projects.iter().all(|project| project.revenue >= 0.0));
        assert!(dataset
            .projects
            .iter()
            .all(|project| (0.0..=5.0).contains(&project.csat)));
    }
}
