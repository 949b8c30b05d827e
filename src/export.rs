use crate::db::cell_text;
use crate::errors::{AppError, AppResult};
use crate::models::{ExportResponse, RawRecord};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

const UTF8_BOM: &str = "\u{feff}";

fn sanitize_filename_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Quotes a field when it holds a delimiter, quote or line break; quotes are doubled.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV text with a byte-order mark, header first, CRLF line endings.
pub fn render_csv(headers: &[String], records: &[RawRecord]) -> String {
    let mut out = String::from(UTF8_BOM);
    let header_line: Vec<String> = headers.iter().map(|header| csv_field(header)).collect();
    out.push_str(&header_line.join(","));
    out.push_str("\r\n");
    for record in records {
        let line: Vec<String> = headers
            .iter()
            .map(|header| csv_field(&record.get(header).map(cell_text).unwrap_or_default()))
            .collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

pub fn export_file_name(sheet: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}.csv",
        sanitize_filename_component(&sheet.to_lowercase()),
        date.format("%Y%m%d")
    )
}

pub fn write_csv(
    export_dir: &Path,
    sheet: &str,
    date: NaiveDate,
    headers: &[String],
    records: &[RawRecord],
) -> AppResult<ExportResponse> {
    fs::create_dir_all(export_dir).map_err(|error| AppError::Io(error.to_string()))?;
    let output_path = export_dir.join(export_file_name(sheet, date));
    if !output_path.starts_with(export_dir) {
        return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
    }
    fs::write(&output_path, render_csv(headers, records)).map_err(|error| AppError::Io(error.to_string()))?;
    tracing::info!(path = %output_path.to_string_lossy(), rows = records.len(), "csv exported");
    Ok(ExportResponse {
        path: output_path.to_string_lossy().to_string(),
        rows: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::{csv_field, export_file_name, render_csv, write_csv};
    use crate::models::RawRecord;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn fields_are_quoted_only_when_needed() {
        assert_eq!(csv_field("Gala"), "Gala");
        assert_eq!(csv_field("Minh, Hà"), "\"Minh, Hà\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_starts_with_bom_and_follows_header_order() {
        let headers = vec!["ID".to_string(), "Team".to_string(), "Doanh thu".to_string()];
        let record: RawRecord = [
            ("Doanh thu".to_string(), json!(1500000)),
            ("ID".to_string(), json!("PRJ0001")),
            ("Team".to_string(), json!("Minh, Hà")),
        ]
        .into_iter()
        .collect();
        let csv = render_csv(&headers, &[record]);
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(
            csv.trim_start_matches('\u{feff}'),
            "ID,Team,Doanh thu\r\nPRJ0001,\"Minh, Hà\",1500000\r\n"
        );
    }

    #[test]
    fn file_name_carries_sheet_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        assert_eq!(export_file_name("Projects", date), "projects_20261019.csv");

        let dir = tempfile::tempdir().expect("tempdir");
        let response = write_csv(&dir.path().join("exports"), "Projects", date, &[], &[]).expect("export");
        assert!(response.path.ends_with("projects_20261019.csv"));
        assert_eq!(response.rows, 0);
        let written = std::fs::read_to_string(&response.path).expect("read");
        assert_eq!(written, "\u{feff}\r\n");
    }
}
