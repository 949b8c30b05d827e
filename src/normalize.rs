//! Record normalization: raw worksheet cells to typed values.
//!
//! A malformed cell never fails the row. Numeric cells that cannot be read become
//! `0`, date cells become `null`, and the row stays in the table.

use crate::classify::classify_channel;
use crate::db::cell_text;
use crate::models::{
    CustomerRecord, ProjectRecord, RawRecord, StaffRecord, TimelineRecord, Worksheet,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CURRENCY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(₫|vnđ|vnd|đ)$").expect("valid currency regex"));
static COMMA_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid grouping regex"));
static DOT_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(\.\d{3})+(,\d+)?$").expect("valid grouping regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::String(text) => parse_number_text(text),
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn parse_number_text(text: &str) -> f64 {
    let stripped = CURRENCY_SUFFIX.replace(text.trim(), "");
    let stripped = stripped.trim().trim_end_matches('%');
    let compact: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if compact.is_empty() {
        return 0.0;
    }

    let canonical = if COMMA_GROUPED.is_match(&compact) {
        compact.replace(',', "")
    } else if DOT_GROUPED.is_match(&compact) {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    };
    canonical.parse::<f64>().unwrap_or(0.0)
}

pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let Value::String(text) = value else {
        return None;
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|datetime| datetime.date_naive())
}

fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

/// Rewrites the designated columns of every record in place. Absent numeric
/// columns are filled with `0`, absent date columns with `null`.
pub fn normalize_records(
    records: Vec<RawRecord>,
    numeric_columns: &[&str],
    date_columns: &[&str],
) -> Vec<RawRecord> {
    records
        .into_iter()
        .map(|mut record| {
            for column in numeric_columns {
                let number = record.get(*column).map(coerce_number).unwrap_or(0.0);
                record.insert(column.to_string(), number_value(number));
            }
            for column in date_columns {
                let date = record.get(*column).and_then(coerce_date);
                record.insert(column.to_string(), date_value(date));
            }
            record
        })
        .collect()
}

pub fn normalize_worksheet(sheet: Worksheet, records: Vec<RawRecord>) -> Vec<RawRecord> {
    normalize_records(records, sheet.numeric_columns(), sheet.date_columns())
}

fn text(record: &RawRecord, columns: &[&str]) -> String {
    columns
        .iter()
        .find_map(|column| record.get(*column))
        .map(cell_text)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn number(record: &RawRecord, columns: &[&str]) -> f64 {
    columns
        .iter()
        .find_map(|column| record.get(*column))
        .map(coerce_number)
        .unwrap_or(0.0)
}

fn date(record: &RawRecord, column: &str) -> Option<NaiveDate> {
    record.get(column).and_then(coerce_date)
}

fn is_blank(record: &RawRecord, column: &str) -> bool {
    record
        .get(column)
        .map(|value| cell_text(value).trim().is_empty())
        .unwrap_or(true)
}

/// Profit share of revenue in percent; zero when there is no revenue.
pub fn profit_pct(revenue: f64, cost: f64) -> f64 {
    if revenue > 0.0 {
        (revenue - cost) / revenue * 100.0
    } else {
        0.0
    }
}

pub fn project_from_record(record: &RawRecord) -> ProjectRecord {
    let category = text(record, &["Loại"]);
    let customer = text(record, &["Khách hàng"]);
    let revenue = number(record, &["Doanh thu"]).max(0.0);
    let cost = number(record, &["Chi phí"]);
    // Older project sheets carry only a stored margin and no cost column.
    let margin = if is_blank(record, "Chi phí") && !is_blank(record, "Lợi nhuận %") {
        number(record, &["Lợi nhuận %"])
    } else {
        profit_pct(revenue, cost)
    };

    ProjectRecord {
        id: text(record, &["ID"]),
        name: text(record, &["Tên dự án", "Dự án"]),
        channel: classify_channel(&category, &customer),
        customer,
        category,
        start_date: date(record, "Ngày bắt đầu"),
        end_date: date(record, "Ngày kết thúc"),
        revenue,
        cost,
        profit_pct: margin,
        status: text(record, &["Trạng thái"]),
        owner: text(record, &["PIC"]),
        csat: number(record, &["CSAT"]).clamp(0.0, 5.0),
        guests: number(record, &["Số khách", "Khách"]).max(0.0),
        team: text(record, &["Team"]),
        notes: text(record, &["Ghi chú"]),
        created_at: text(record, &["Ngày tạo"]),
    }
}

pub fn staff_from_record(record: &RawRecord) -> StaffRecord {
    StaffRecord {
        id: text(record, &["ID"]),
        full_name: text(record, &["Họ tên"]),
        position: text(record, &["Chức vụ"]),
        department: text(record, &["Phòng ban"]),
        email: text(record, &["Email"]),
        phone: text(record, &["Điện thoại"]),
        join_date: date(record, "Ngày vào"),
        salary: number(record, &["Lương"]),
        status: text(record, &["Trạng thái"]),
        skills: text(record, &["Kỹ năng"]),
        notes: text(record, &["Ghi chú"]),
        created_at: text(record, &["Ngày tạo"]),
    }
}

pub fn customer_from_record(record: &RawRecord) -> CustomerRecord {
    CustomerRecord {
        id: text(record, &["ID"]),
        name: text(record, &["Tên khách hàng"]),
        company: text(record, &["Công ty"]),
        email: text(record, &["Email"]),
        phone: text(record, &["Điện thoại"]),
        address: text(record, &["Địa chỉ"]),
        customer_type: text(record, &["Loại"]),
        source: text(record, &["Nguồn"]),
        status: text(record, &["Trạng thái"]),
        created_at: text(record, &["Ngày tạo"]),
    }
}

pub fn timeline_from_record(record: &RawRecord) -> TimelineRecord {
    TimelineRecord {
        id: text(record, &["ID"]),
        project_id: text(record, &["Project_ID"]),
        phase: text(record, &["Giai đoạn"]),
        description: text(record, &["Mô tả"]),
        start_date: date(record, "Ngày bắt đầu"),
        end_date: date(record, "Ngày kết thúc"),
        assignee: text(record, &["Phụ trách"]),
        status: text(record, &["Trạng thái"]),
        progress_pct: number(record, &["Tiến độ %"]).clamp(0.0, 100.0),
        notes: text(record, &["Ghi chú"]),
        created_at: text(record, &["Ngày tạo"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn malformed_numbers_default_to_zero() {
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert_eq!(coerce_number(&json!("NaN")), 0.0);
        assert_eq!(coerce_number(&json!("inf")), 0.0);
        assert_eq!(coerce_number(&json!([1, 2])), 0.0);
    }

    #[test]
    fn grouped_and_suffixed_numbers_parse() {
        assert_eq!(coerce_number(&json!("1,000,000")), 1_000_000.0);
        assert_eq!(coerce_number(&json!("2.500.000 ₫")), 2_500_000.0);
        assert_eq!(coerce_number(&json!("500000 VNĐ")), 500_000.0);
        assert_eq!(coerce_number(&json!("17.4%")), 17.4);
        assert_eq!(coerce_number(&json!(" 4.5 ")), 4.5);
        assert_eq!(coerce_number(&json!(3)), 3.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
    }

    #[test]
    fn dates_parse_common_layouts_and_reject_garbage() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 15);
        assert_eq!(coerce_date(&json!("2026-01-15")), jan);
        assert_eq!(coerce_date(&json!("15/01/2026")), jan);
        assert_eq!(coerce_date(&json!("2026-01-15 09:30:00")), jan);
        assert_eq!(coerce_date(&json!("2026-01-15T09:30:00+07:00")), jan);
        assert_eq!(coerce_date(&json!("tomorrow")), None);
        assert_eq!(coerce_date(&json!(45000)), None);
    }

    #[test]
    fn bad_cells_keep_the_row() {
        let records = vec![
            record(&[("Doanh thu", json!("n/a")), ("Ngày bắt đầu", json!("soon"))]),
            record(&[("Doanh thu", json!(1_000)), ("Ngày bắt đầu", json!("2026-02-01"))]),
        ];
        let normalized = normalize_records(records, &["Doanh thu", "Chi phí"], &["Ngày bắt đầu"]);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0]["Doanh thu"], json!(0));
        assert_eq!(normalized[0]["Chi phí"], json!(0));
        assert_eq!(normalized[0]["Ngày bắt đầu"], Value::Null);
        assert_eq!(normalized[1]["Ngày bắt đầu"], json!("2026-02-01"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let records = vec![
            record(&[
                ("Doanh thu", json!("1.500.000")),
                ("CSAT", json!("4.25")),
                ("Ngày bắt đầu", json!("03/02/2026")),
            ]),
            record(&[("Doanh thu", json!("x")), ("CSAT", json!(null))]),
        ];
        let once = normalize_records(records, &["Doanh thu", "CSAT"], &["Ngày bắt đầu"]);
        let twice = normalize_records(once.clone(), &["Doanh thu", "CSAT"], &["Ngày bắt đầu"]);
        assert_eq!(once, twice);
        assert_eq!(once[0]["Doanh thu"], json!(1_500_000));
        assert_eq!(once[0]["CSAT"], json!(4.25));
    }

    #[test]
    fn project_fields_are_typed_and_derived() {
        let project = project_from_record(&record(&[
            ("ID", json!("PRJ0001")),
            ("Tên dự án", json!("Year End Party")),
            ("Khách hàng", json!("Bộ Văn hóa")),
            ("Loại", json!("Gala Dinner Gov")),
            ("Doanh thu", json!(2_000_000)),
            ("Chi phí", json!(1_500_000)),
            ("CSAT", json!(7)),
            ("Ngày bắt đầu", json!("2026-01-10")),
        ]));
        assert_eq!(project.channel, Channel::Gov);
        assert_eq!(project.profit_pct, 25.0);
        assert_eq!(project.csat, 5.0);
        assert_eq!(project.end_date, None);
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2026, 1, 10));
    }

    #[test]
    fn stored_margin_is_kept_without_cost_column() {
        let project = project_from_record(&record(&[
            ("Dự án", json!("Festival")),
            ("Doanh thu", json!(1_000_000)),
            ("Lợi nhuận %", json!(18.5)),
            ("Khách", json!(300)),
        ]));
        assert_eq!(project.name, "Festival");
        assert_eq!(project.profit_pct, 18.5);
        assert_eq!(project.guests, 300.0);
        assert_eq!(profit_pct(0.0, 100.0), 0.0);
    }
}
