use crate::errors::{AppError, AppResult};
use crate::models::RawRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Row 1 of every worksheet is its header; data rows start at 2.
pub const FIRST_DATA_ROW: usize = 2;

/// Local spreadsheet file: named worksheets, each with a header row and ordered
/// data rows. One SQLite file per spreadsheet identifier.
#[derive(Debug)]
pub struct SheetStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SheetStore {
    /// Opens an existing spreadsheet. A missing file is a connectivity failure, not
    /// an invitation to create one.
    pub fn open(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Connectivity(format!(
                "spreadsheet {} does not exist",
                path.to_string_lossy()
            )));
        }
        Self::connect(path)
    }

    pub fn create(path: &Path, title: &str) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let store = Self::connect(path)?;
        {
            let conn = store.lock()?;
            conn.execute(
                "INSERT INTO spreadsheet_meta (key, value) VALUES ('title', ?1)
                 ON CONFLICT(key) DO NOTHING",
                [title],
            )?;
        }
        tracing::info!(path = %path.to_string_lossy(), title, "spreadsheet ready");
        Ok(store)
    }

    fn connect(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)
            .map_err(|err| AppError::Connectivity(format!("{}: {}", path.to_string_lossy(), err)))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|err| AppError::Connectivity(format!("{}: {}", path.to_string_lossy(), err)))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("spreadsheet mutex poisoned".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> AppResult<String> {
        let conn = self.lock()?;
        let title = conn
            .query_row("SELECT value FROM spreadsheet_meta WHERE key = 'title'", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(title.unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default()
        }))
    }

    pub fn list_worksheets(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM worksheets ORDER BY created_at, name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Returns the worksheet's header row, creating the worksheet with `headers`
    /// when it does not exist yet.
    pub fn worksheet(&self, name: &str, headers: &[&str]) -> AppResult<Vec<String>> {
        if let Some(existing) = self.headers(name)? {
            return Ok(existing);
        }

        let headers: Vec<String> = headers.iter().map(ToString::to_string).collect();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO worksheets (name, headers_json, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO NOTHING",
            params![name, serde_json::to_string(&headers)?, Utc::now().to_rfc3339()],
        )?;
        tracing::info!(worksheet = name, columns = headers.len(), "created worksheet with header row");
        Ok(headers)
    }

    pub fn headers(&self, name: &str) -> AppResult<Option<Vec<String>>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT headers_json FROM worksheets WHERE name = ?1",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Data rows in sheet order, header excluded.
    pub fn get_all_rows(&self, name: &str) -> AppResult<Vec<Vec<Value>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT values_json FROM worksheet_rows WHERE worksheet = ?1 ORDER BY row_index",
        )?;
        let rows = stmt.query_map([name], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            let raw = row?;
            result.push(serde_json::from_str::<Vec<Value>>(&raw)?);
        }
        Ok(result)
    }

    /// Data rows keyed by header. Short rows are padded with empty strings.
    pub fn get_all_records(&self, name: &str) -> AppResult<Vec<RawRecord>> {
        let Some(headers) = self.headers(name)? else {
            return Err(AppError::NotFound(format!("worksheet {} not found", name)));
        };
        let rows = self.get_all_rows(name)?;
        Ok(rows.iter().map(|row| to_record(&headers, row)).collect())
    }

    /// Appends one row and returns its sheet row number.
    pub fn append_row(&self, name: &str, values: &[Value]) -> AppResult<usize> {
        self.require_worksheet(name)?;
        let conn = self.lock()?;
        let next_index: i64 = conn.query_row(
            "SELECT COALESCE(MAX(row_index), -1) + 1 FROM worksheet_rows WHERE worksheet = ?1",
            [name],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO worksheet_rows (worksheet, row_index, values_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                next_index,
                serde_json::to_string(values)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(next_index as usize + FIRST_DATA_ROW)
    }

    pub fn append_rows(&self, name: &str, rows: &[Vec<Value>]) -> AppResult<usize> {
        let mut last = 0;
        for row in rows {
            last = self.append_row(name, row)?;
        }
        Ok(last)
    }

    /// Clears every row of the worksheet and writes the header and `rows` back.
    /// The statements are issued one after another; a failure part way leaves the
    /// worksheet partially written.
    pub fn clear_and_rewrite(&self, name: &str, headers: &[&str], rows: &[Vec<Value>]) -> AppResult<()> {
        self.worksheet(name, headers)?;
        {
            let conn = self.lock()?;
            let headers: Vec<String> = headers.iter().map(ToString::to_string).collect();
            conn.execute(
                "UPDATE worksheets SET headers_json = ?1 WHERE name = ?2",
                params![serde_json::to_string(&headers)?, name],
            )?;
            conn.execute("DELETE FROM worksheet_rows WHERE worksheet = ?1", [name])?;
        }
        self.append_rows(name, rows)?;
        tracing::info!(worksheet = name, rows = rows.len(), "worksheet rewritten");
        Ok(())
    }

    /// Deletes a data row by sheet row number and shifts later rows up.
    pub fn delete_row(&self, name: &str, row_number: usize) -> AppResult<()> {
        let index = data_index(row_number)?;
        self.require_worksheet(name)?;
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM worksheet_rows WHERE worksheet = ?1 AND row_index = ?2",
            params![name, index],
        )?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("row {} not found in {}", row_number, name)));
        }
        conn.execute(
            "UPDATE worksheet_rows SET row_index = row_index - 1 WHERE worksheet = ?1 AND row_index > ?2",
            params![name, index],
        )?;
        tracing::info!(worksheet = name, row_number, "worksheet row deleted");
        Ok(())
    }

    pub fn update_row(&self, name: &str, row_number: usize, values: &[Value]) -> AppResult<()> {
        let index = data_index(row_number)?;
        self.require_worksheet(name)?;
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE worksheet_rows SET values_json = ?1, updated_at = ?2 WHERE worksheet = ?3 AND row_index = ?4",
            params![serde_json::to_string(values)?, Utc::now().to_rfc3339(), name, index],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("row {} not found in {}", row_number, name)));
        }
        Ok(())
    }

    /// First row whose `column` cell renders equal to `key`, with its sheet row number.
    pub fn find_row(&self, name: &str, column: &str, key: &str) -> AppResult<Option<(usize, RawRecord)>> {
        let records = self.get_all_records(name)?;
        Ok(records
            .into_iter()
            .enumerate()
            .find(|(_, record)| record.get(column).map(cell_text).as_deref() == Some(key))
            .map(|(index, record)| (index + FIRST_DATA_ROW, record)))
    }

    pub fn row_count(&self, name: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM worksheet_rows WHERE worksheet = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn require_worksheet(&self, name: &str) -> AppResult<()> {
        if self.headers(name)?.is_none() {
            return Err(AppError::NotFound(format!("worksheet {} not found", name)));
        }
        Ok(())
    }
}

fn data_index(row_number: usize) -> AppResult<i64> {
    if row_number < FIRST_DATA_ROW {
        return Err(AppError::Validation(format!(
            "row {} is the header or out of range; data rows start at {}",
            row_number, FIRST_DATA_ROW
        )));
    }
    Ok((row_number - FIRST_DATA_ROW) as i64)
}

pub fn to_record(headers: &[String], row: &[Value]) -> RawRecord {
    headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let value = row.get(index).cloned().unwrap_or_else(|| Value::String(String::new()));
            (header.clone(), value)
        })
        .collect()
}

/// Orders a record's values by `headers`, filling absent columns with empty strings.
pub fn to_row(headers: &[String], record: &RawRecord) -> Vec<Value> {
    headers
        .iter()
        .map(|header| record.get(header).cloned().unwrap_or_else(|| Value::String(String::new())))
        .collect()
}

/// Cell rendered the way a spreadsheet would display it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
