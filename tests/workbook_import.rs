use beevent_dashboard_lib::config::ConfigFile;
use beevent_dashboard_lib::models::{Channel, Worksheet};
use beevent_dashboard_lib::providers::workbook::WorkbookProvider;
use beevent_dashboard_lib::providers::{load_dataset, DataProvider};
use beevent_dashboard_lib::service::DashboardCore;
use beevent_dashboard_lib::views::{Page, PageModel, RevenueSource, ViewState};
use serde_json::json;
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/beevent_workbook.xlsx")
}

#[test]
fn tabs_map_to_worksheets_by_name() {
    let provider = WorkbookProvider::open(&fixture()).expect("workbook");

    let projects = provider.records(Worksheet::Projects).expect("projects");
    assert_eq!(projects.len(), 2, "blank row between projects is dropped");
    assert_eq!(projects[0]["ID"], json!("PRJ0001"));
    assert_eq!(projects[0]["Doanh thu"], json!(2_000_000));
    assert_eq!(projects[1]["Tên dự án"], json!("Hội nghị khách hàng"));

    assert_eq!(provider.records(Worksheet::RevenueMonthly).expect("monthly").len(), 1);
    // No Staff tab in the file; the unrelated Notes tab is ignored.
    assert!(provider.records(Worksheet::Staff).expect("staff").is_empty());
}

#[test]
fn workbook_rows_normalize_like_sheet_rows() {
    let provider = WorkbookProvider::open(&fixture()).expect("workbook");
    let data = load_dataset(&provider).expect("dataset");

    assert_eq!(data.projects.len(), 2);
    assert_eq!(data.projects[0].channel, Channel::Gov);
    assert_eq!(data.projects[0].csat, 4.5);
    assert_eq!(data.projects[1].channel, Channel::Corporate);
    assert_eq!(data.projects[1].revenue, 1_500_000.0);
    assert_eq!(data.projects[1].csat, 0.0);
    assert_eq!(
        data.projects[1].start_date,
        chrono::NaiveDate::from_ymd_opt(2026, 3, 5)
    );
}

#[test]
fn workbook_source_renders_pages_and_refuses_writes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ConfigFile::new(dir.path().join("beevent.yaml"));
    config
        .update(json!({
            "dataSource": "workbook",
            "workbookPath": fixture().to_string_lossy(),
        }))
        .expect("settings");
    let core = DashboardCore::open(config).expect("core");

    let PageModel::Channels { source, monthly, .. } =
        core.page(&ViewState::new(Page::Channels)).expect("channels")
    else {
        panic!("channels page expected");
    };
    assert_eq!(source, RevenueSource::RevenueMonthly);
    assert_eq!(monthly[0].total, 600.0);

    let error = core.delete_row(Worksheet::Projects, 2).expect_err("read-only");
    assert!(error.to_string().starts_with("VALIDATION_FAILED"));
}
