use crate::db::to_record;
use crate::errors::{AppError, AppResult};
use crate::models::{RawRecord, Worksheet};
use crate::providers::DataProvider;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, TimeDelta};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Read-only import of an exported spreadsheet file (`.xlsx`, `.xls`, `.xlsb`,
/// `.ods`). Tabs are matched to worksheets by name; unknown tabs are ignored and
/// absent ones read as empty.
#[derive(Debug)]
pub struct WorkbookProvider {
    path: PathBuf,
    sheets: HashMap<Worksheet, Vec<RawRecord>>,
}

impl WorkbookProvider {
    pub fn open(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Connectivity(format!(
                "workbook {} does not exist",
                path.to_string_lossy()
            )));
        }
        let mut workbook = open_workbook_auto(path)?;
        let mut sheets = HashMap::new();
        for tab in workbook.sheet_names().to_vec() {
            let Some(sheet) = Worksheet::parse(&tab) else {
                tracing::debug!(tab = %tab, "workbook tab does not match a worksheet");
                continue;
            };
            let range = workbook.worksheet_range(&tab)?;
            let mut rows = range.rows();
            let Some(header) = rows.next() else {
                sheets.insert(sheet, Vec::new());
                continue;
            };
            let headers: Vec<String> = header.iter().map(header_text).collect();
            let records: Vec<RawRecord> = rows
                .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
                .map(|row| {
                    let values: Vec<Value> = row.iter().map(cell_value).collect();
                    to_record(&headers, &values)
                })
                .collect();
            tracing::info!(tab = %tab, rows = records.len(), "workbook tab imported");
            sheets.insert(sheet, records);
        }
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for WorkbookProvider {
    fn name(&self) -> &'static str {
        "workbook"
    }

    fn records(&self, sheet: Worksheet) -> AppResult<Vec<RawRecord>> {
        Ok(self.sheets.get(&sheet).cloned().unwrap_or_default())
    }
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    }
}

/// Spreadsheet serial day number to a calendar date, using the 1900 date system.
/// Serials outside the calendar range give `None`.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    base.checked_add_signed(TimeDelta::try_days(serial.floor() as i64)?)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::String(String::new()),
        Data::String(text) => Value::String(text.clone()),
        Data::Int(number) => Value::from(*number),
        Data::Float(number) => {
            if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
                Value::from(*number as i64)
            } else {
                Value::from(*number)
            }
        }
        Data::Bool(flag) => Value::Bool(*flag),
        Data::DateTime(stamp) => serial_to_date(stamp.as_f64())
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .unwrap_or_else(|| Value::String(String::new())),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Value::String(text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::{cell_value, serial_to_date, WorkbookProvider};
    use calamine::{Data, ExcelDateTime, ExcelDateTimeType};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn serial_numbers_map_to_calendar_dates() {
        assert_eq!(serial_to_date(46023.0), NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(serial_to_date(46023.75), NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(serial_to_date(-1.0), None);
    }

    #[test]
    fn out_of_range_serial_is_an_empty_cell() {
        assert_eq!(serial_to_date(1e15), None);
        assert_eq!(serial_to_date(f64::MAX), None);
        let stamp = ExcelDateTime::new(1e15, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_value(&Data::DateTime(stamp)), json!(""));
    }

    #[test]
    fn cells_become_json_values() {
        assert_eq!(cell_value(&Data::Float(1500000.0)), json!(1500000));
        assert_eq!(cell_value(&Data::Float(4.5)), json!(4.5));
        assert_eq!(cell_value(&Data::Empty), json!(""));
        assert_eq!(cell_value(&Data::String("Lead".to_string())), json!("Lead"));
    }

    #[test]
    fn missing_workbook_is_connectivity_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = WorkbookProvider::open(&dir.path().join("absent.xlsx")).expect_err("must fail");
        assert!(error.to_string().starts_with("STORE_UNAVAILABLE"));
    }
}
