//! Form submissions. Each operation validates its payload, then performs exactly
//! one worksheet write through the provider so the read cache is dropped.

use crate::aggregate::pipeline::snapshot_rows;
use crate::db::{cell_text, to_row};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Channel, MonthlyRevenuePayload, NewCustomerPayload, NewProjectPayload, NewStaffPayload,
    NewTimelinePayload, PipelineUpdatePayload, SalesPerformancePayload, UpdateProjectPayload,
    WriteReceipt, Worksheet,
};
use crate::normalize::{coerce_number, profit_pct};
use crate::providers::{DataProvider, SheetProvider};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::{json, Value};

pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn created_stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

fn date_cell(date: Option<NaiveDate>) -> Value {
    date.map(|date| json!(date.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| json!(""))
}

fn require(fields: &[(&str, &str)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "required fields missing: {}",
            missing.join(", ")
        )))
    }
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::Validation(format!(
            "end date {} is before start date {}",
            end, start
        ))),
        _ => Ok(()),
    }
}

fn check_csat(csat: Option<f64>) -> AppResult<()> {
    match csat {
        Some(score) if !(0.0..=5.0).contains(&score) => Err(AppError::Validation(format!(
            "csat {} is outside 0..5",
            score
        ))),
        _ => Ok(()),
    }
}

/// Margin in percent rounded to two decimals.
pub fn rounded_profit_pct(revenue: f64, cost: f64) -> f64 {
    (profit_pct(revenue, cost) * 100.0).round() / 100.0
}

/// Appends a row whose first cell is the next sequential id for the worksheet.
fn append_with_id(
    writer: &SheetProvider,
    sheet: Worksheet,
    build: impl FnOnce(String, String) -> Vec<Value>,
) -> AppResult<WriteReceipt> {
    let prefix = sheet.id_prefix().ok_or_else(|| {
        AppError::Internal(format!("worksheet {} has no id column", sheet.name()))
    })?;
    writer.write(sheet, |store, _| {
        let id = format!("{}{:04}", prefix, store.row_count(sheet.name())? + 1);
        let row_number = store.append_row(sheet.name(), &build(id.clone(), created_stamp()))?;
        tracing::info!(worksheet = sheet.name(), id = %id, row = row_number, "row appended");
        Ok(WriteReceipt {
            worksheet: sheet.name().to_string(),
            row_number,
            id: Some(id),
        })
    })
}

fn append_plain(writer: &SheetProvider, sheet: Worksheet, row: Vec<Value>) -> AppResult<WriteReceipt> {
    writer.write(sheet, |store, _| {
        let row_number = store.append_row(sheet.name(), &row)?;
        tracing::info!(worksheet = sheet.name(), row = row_number, "row appended");
        Ok(WriteReceipt {
            worksheet: sheet.name().to_string(),
            row_number,
            id: None,
        })
    })
}

pub fn add_project(writer: &SheetProvider, payload: &NewProjectPayload) -> AppResult<WriteReceipt> {
    require(&[
        ("name", payload.name.as_str()),
        ("customer", payload.customer.as_str()),
        ("owner", payload.owner.as_str()),
    ])?;
    check_range(payload.start_date, payload.end_date)?;
    check_csat(payload.csat)?;

    let margin = rounded_profit_pct(payload.revenue as f64, payload.cost as f64);
    append_with_id(writer, Worksheet::Projects, |id, stamp| {
        vec![
            json!(id),
            json!(payload.name.trim()),
            json!(payload.customer.trim()),
            json!(payload.category),
            date_cell(payload.start_date),
            date_cell(payload.end_date),
            json!(payload.revenue),
            json!(payload.cost),
            json!(margin),
            json!(payload.status),
            json!(payload.owner.trim()),
            json!(payload.team.join(", ")),
            json!(payload.guests),
            payload.csat.map(|score| json!(score)).unwrap_or_else(|| json!("")),
            json!(payload.notes),
            json!(stamp),
        ]
    })
}

pub fn add_staff(writer: &SheetProvider, payload: &NewStaffPayload) -> AppResult<WriteReceipt> {
    require(&[
        ("fullName", payload.full_name.as_str()),
        ("email", payload.email.as_str()),
        ("phone", payload.phone.as_str()),
    ])?;
    append_with_id(writer, Worksheet::Staff, |id, stamp| {
        vec![
            json!(id),
            json!(payload.full_name.trim()),
            json!(payload.position),
            json!(payload.department),
            json!(payload.email.trim()),
            json!(payload.phone.trim()),
            date_cell(payload.join_date),
            json!(payload.salary),
            json!(payload.status),
            json!(payload.skills),
            json!(payload.notes),
            json!(stamp),
        ]
    })
}

pub fn add_customer(writer: &SheetProvider, payload: &NewCustomerPayload) -> AppResult<WriteReceipt> {
    require(&[
        ("name", payload.name.as_str()),
        ("email", payload.email.as_str()),
        ("phone", payload.phone.as_str()),
    ])?;
    append_with_id(writer, Worksheet::Customers, |id, stamp| {
        vec![
            json!(id),
            json!(payload.name.trim()),
            json!(payload.company),
            json!(payload.email.trim()),
            json!(payload.phone.trim()),
            json!(payload.address),
            json!(payload.customer_type),
            json!(payload.source),
            json!(payload.status),
            json!(stamp),
        ]
    })
}

/// Timeline phases must point at an existing project id.
pub fn add_timeline(writer: &SheetProvider, payload: &NewTimelinePayload) -> AppResult<WriteReceipt> {
    require(&[
        ("projectId", payload.project_id.as_str()),
        ("phase", payload.phase.as_str()),
        ("assignee", payload.assignee.as_str()),
    ])?;
    check_range(payload.start_date, payload.end_date)?;
    if payload.progress_pct > 100 {
        return Err(AppError::Validation(format!(
            "progress {} is above 100",
            payload.progress_pct
        )));
    }

    let project_id = payload.project_id.trim();
    let known = writer
        .records(Worksheet::Projects)?
        .iter()
        .any(|record| record.get("ID").map(cell_text).as_deref() == Some(project_id));
    if !known {
        return Err(AppError::Validation(format!(
            "project {} does not exist",
            payload.project_id
        )));
    }

    append_with_id(writer, Worksheet::Timeline, |id, stamp| {
        vec![
            json!(id),
            json!(payload.project_id.trim()),
            json!(payload.phase.trim()),
            json!(payload.description),
            date_cell(payload.start_date),
            date_cell(payload.end_date),
            json!(payload.assignee.trim()),
            json!(payload.status),
            json!(payload.progress_pct),
            json!(payload.notes),
            json!(stamp),
        ]
    })
}

/// Appends a month of channel revenue; the month is stored as its first day.
pub fn add_monthly_revenue(writer: &SheetProvider, payload: &MonthlyRevenuePayload) -> AppResult<WriteReceipt> {
    let month = payload.month.with_day(1).unwrap_or(payload.month);
    append_plain(
        writer,
        Worksheet::RevenueMonthly,
        vec![
            json!(month.format("%Y-%m-%d").to_string()),
            json!(payload.internal),
            json!(payload.gov),
            json!(payload.corporate),
        ],
    )
}

/// Replaces the whole pipeline worksheet with a header and four stage rows.
pub fn set_pipeline(writer: &SheetProvider, payload: &PipelineUpdatePayload) -> AppResult<WriteReceipt> {
    let sheet = Worksheet::SalesPipeline;
    let rows = snapshot_rows(payload);
    writer.write(sheet, |store, _| {
        store.clear_and_rewrite(sheet.name(), sheet.headers(), &rows)?;
        tracing::info!(worksheet = sheet.name(), rows = rows.len(), "pipeline snapshot rewritten");
        Ok(WriteReceipt {
            worksheet: sheet.name().to_string(),
            row_number: rows.len() + 1,
            id: None,
        })
    })
}

fn channel_entry_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Internal => "Nội bộ",
        Channel::Gov => "Gov",
        Channel::Corporate => "Corporate",
    }
}

pub fn add_sales_performance(
    writer: &SheetProvider,
    payload: &SalesPerformancePayload,
) -> AppResult<WriteReceipt> {
    require(&[("salesperson", payload.salesperson.as_str())])?;
    if !(0.0..=100.0).contains(&payload.conversion_pct) {
        return Err(AppError::Validation(format!(
            "conversion {} is outside 0..100",
            payload.conversion_pct
        )));
    }
    append_plain(
        writer,
        Worksheet::SalesPerformance,
        vec![
            json!(payload.salesperson.trim()),
            json!(payload.revenue),
            json!(payload.deals),
            json!(payload.conversion_pct),
            json!(channel_entry_label(payload.channel)),
        ],
    )
}

/// Rewrites one project row in place. Only the given fields change; the margin is
/// recomputed from the resulting revenue and cost.
pub fn update_project(
    writer: &SheetProvider,
    project_id: &str,
    payload: &UpdateProjectPayload,
) -> AppResult<WriteReceipt> {
    check_range(payload.start_date, payload.end_date)?;
    check_csat(payload.csat)?;
    let sheet = Worksheet::Projects;
    writer.write(sheet, |store, headers| {
        let Some((row_number, mut record)) = store.find_row(sheet.name(), "ID", project_id.trim())? else {
            return Err(AppError::NotFound(format!("project {} not found", project_id)));
        };

        let mut set = |column: &str, value: Value| {
            record.insert(column.to_string(), value);
        };
        if let Some(name) = &payload.name {
            set("Tên dự án", json!(name));
        }
        if let Some(customer) = &payload.customer {
            set("Khách hàng", json!(customer));
        }
        if let Some(category) = &payload.category {
            set("Loại", json!(category));
        }
        if payload.start_date.is_some() {
            set("Ngày bắt đầu", date_cell(payload.start_date));
        }
        if payload.end_date.is_some() {
            set("Ngày kết thúc", date_cell(payload.end_date));
        }
        if let Some(revenue) = payload.revenue {
            set("Doanh thu", json!(revenue));
        }
        if let Some(cost) = payload.cost {
            set("Chi phí", json!(cost));
        }
        if let Some(status) = &payload.status {
            set("Trạng thái", json!(status));
        }
        if let Some(owner) = &payload.owner {
            set("PIC", json!(owner));
        }
        if let Some(csat) = payload.csat {
            set("CSAT", json!(csat));
        }
        if let Some(notes) = &payload.notes {
            set("Ghi chú", json!(notes));
        }

        let revenue = record.get("Doanh thu").map(coerce_number).unwrap_or(0.0);
        let cost = record.get("Chi phí").map(coerce_number).unwrap_or(0.0);
        record.insert("Lợi nhuận %".to_string(), json!(rounded_profit_pct(revenue, cost)));

        store.update_row(sheet.name(), row_number, &to_row(headers, &record))?;
        let id = record.get("ID").map(cell_text);
        tracing::info!(worksheet = sheet.name(), row = row_number, id = ?id, "project updated");
        Ok(WriteReceipt {
            worksheet: sheet.name().to_string(),
            row_number,
            id,
        })
    })
}

/// Deletes a data row by sheet row number (row 1 is the header).
pub fn delete_row(writer: &SheetProvider, sheet: Worksheet, row_number: usize) -> AppResult<WriteReceipt> {
    writer.write(sheet, |store, _| {
        store.delete_row(sheet.name(), row_number)?;
        tracing::info!(worksheet = sheet.name(), row = row_number, "row deleted");
        Ok(WriteReceipt {
            worksheet: sheet.name().to_string(),
            row_number,
            id: None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SheetStore;
    use crate::models::StageTally;
    use std::time::Duration;

    fn writer(dir: &tempfile::TempDir) -> SheetProvider {
        let store = SheetStore::create(&dir.path().join("sheet.db"), "Beevent_Database").expect("store");
        SheetProvider::new(store, Duration::from_secs(60))
    }

    fn project_payload(name: &str) -> NewProjectPayload {
        NewProjectPayload {
            name: name.to_string(),
            customer: "Công ty ABC".to_string(),
            category: "Gala".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 2),
            revenue: 300_000_000,
            cost: 200_000_000,
            status: "Lead".to_string(),
            owner: "Lan".to_string(),
            team: vec!["Minh".to_string(), "Hà".to_string()],
            guests: 250,
            csat: None,
            notes: String::new(),
        }
    }

    #[test]
    fn projects_get_sequential_ids_and_rounded_margin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        let first = add_project(&writer, &project_payload("Gala A")).expect("first");
        let second = add_project(&writer, &project_payload("Gala B")).expect("second");
        assert_eq!(first.id.as_deref(), Some("PRJ0001"));
        assert_eq!(second.id.as_deref(), Some("PRJ0002"));
        assert_eq!(second.row_number, 3);

        let records = writer.records(Worksheet::Projects).expect("records");
        assert_eq!(records[0]["Lợi nhuận %"], json!(33.33));
        assert_eq!(records[0]["Team"], json!("Minh, Hà"));
        let stamp = cell_text(&records[0]["Ngày tạo"]);
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, STAMP_FORMAT).is_ok());
    }

    #[test]
    fn missing_required_fields_write_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        let mut payload = project_payload("");
        payload.owner = " ".to_string();
        let error = add_project(&writer, &payload).expect_err("invalid");
        assert!(error.to_string().contains("name, owner"));
        assert!(writer.records(Worksheet::Projects).expect("records").is_empty());
    }

    #[test]
    fn timeline_requires_an_existing_project() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        let milestone = NewTimelinePayload {
            project_id: "PRJ0001".to_string(),
            phase: "Khảo sát".to_string(),
            assignee: "Lan".to_string(),
            progress_pct: 20,
            ..NewTimelinePayload::default()
        };
        let error = add_timeline(&writer, &milestone).expect_err("no project yet");
        assert!(error.to_string().starts_with("VALIDATION_FAILED"));
        // The lookup read the project sheet through the cache; the project write
        // below must still be seen.
        assert!(writer.records(Worksheet::Projects).expect("projects").is_empty());

        add_project(&writer, &project_payload("Gala A")).expect("project");
        let receipt = add_timeline(&writer, &milestone).expect("milestone");
        assert_eq!(receipt.id.as_deref(), Some("TML0001"));
    }

    #[test]
    fn monthly_revenue_is_stored_on_the_first_day() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        add_monthly_revenue(
            &writer,
            &MonthlyRevenuePayload {
                month: NaiveDate::from_ymd_opt(2026, 3, 17).expect("date"),
                internal: 1,
                gov: 2,
                corporate: 3,
            },
        )
        .expect("append");
        let records = writer.records(Worksheet::RevenueMonthly).expect("records");
        assert_eq!(records[0]["Tháng"], json!("2026-03-01"));
    }

    #[test]
    fn pipeline_submission_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        let mut update = PipelineUpdatePayload {
            lead: StageTally { count: 10, value: 500 },
            ..PipelineUpdatePayload::default()
        };
        set_pipeline(&writer, &update).expect("first");
        update.lead.count = 12;
        set_pipeline(&writer, &update).expect("second");

        let records = writer.records(Worksheet::SalesPipeline).expect("records");
        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["Count"], json!(12));
        assert_eq!(records[3]["Stage"], json!("Won"));
    }

    #[test]
    fn update_project_recomputes_margin_and_keeps_other_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        add_project(&writer, &project_payload("Gala A")).expect("project");
        let receipt = update_project(
            &writer,
            "PRJ0001",
            &UpdateProjectPayload {
                cost: Some(150_000_000),
                owner: Some("Khoa".to_string()),
                ..UpdateProjectPayload::default()
            },
        )
        .expect("update");
        assert_eq!(receipt.row_number, 2);

        let records = writer.records(Worksheet::Projects).expect("records");
        assert_eq!(records[0]["PIC"], json!("Khoa"));
        assert_eq!(records[0]["Lợi nhuận %"], json!(50.0));
        assert_eq!(records[0]["Tên dự án"], json!("Gala A"));

        let error = update_project(&writer, "PRJ0404", &UpdateProjectPayload::default()).expect_err("absent");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }

    #[test]
    fn delete_row_rejects_the_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        add_sales_performance(
            &writer,
            &SalesPerformancePayload {
                salesperson: "Lan".to_string(),
                revenue: 10,
                deals: 1,
                conversion_pct: 20.0,
                channel: Channel::Gov,
            },
        )
        .expect("append");
        assert!(delete_row(&writer, Worksheet::SalesPerformance, 1).is_err());
        delete_row(&writer, Worksheet::SalesPerformance, 2).expect("delete");
        assert!(writer.records(Worksheet::SalesPerformance).expect("records").is_empty());
    }
}
