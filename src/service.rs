use crate::config::ConfigFile;
use crate::db::SheetStore;
use crate::entry;
use crate::errors::{AppError, AppResult};
use crate::export::write_csv;
use crate::models::{
    AppSettings, DataSource, ExportResponse, MonthlyRevenuePayload, NewCustomerPayload,
    NewProjectPayload, NewStaffPayload, NewTimelinePayload, PipelineUpdatePayload, RawRecord,
    SalesPerformancePayload, UpdateProjectPayload, WriteReceipt, Worksheet,
};
use crate::providers::sample::SampleProvider;
use crate::providers::workbook::WorkbookProvider;
use crate::normalize::{normalize_worksheet, project_from_record};
use crate::providers::{load_dataset, DataProvider, Dataset, SheetProvider};
use crate::views::{render, PageModel, ViewState};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetReport {
    pub path: String,
    pub title: String,
    pub worksheets: Vec<String>,
}

/// Owns the settings and the active data provider; every dashboard operation goes
/// through here.
pub struct DashboardCore {
    config: ConfigFile,
    settings: AppSettings,
    base_dir: PathBuf,
    provider: Box<dyn DataProvider>,
}

fn base_dir_of(config: &ConfigFile) -> PathBuf {
    config
        .path()
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve(base_dir: &Path, configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Spreadsheet file for the configured identifier.
pub fn spreadsheet_path(base_dir: &Path, settings: &AppSettings) -> PathBuf {
    resolve(base_dir, &settings.data_dir).join(format!("{}.sqlite", settings.spreadsheet_id))
}

fn build_provider(base_dir: &Path, settings: &AppSettings) -> AppResult<Box<dyn DataProvider>> {
    let provider: Box<dyn DataProvider> = match settings.data_source {
        DataSource::Sheet => {
            let store = SheetStore::open(&spreadsheet_path(base_dir, settings))?;
            Box::new(SheetProvider::new(
                store,
                Duration::from_secs(settings.cache_ttl_seconds),
            ))
        }
        DataSource::Sample => Box::new(SampleProvider::with_epoch(
            settings.sample_seed,
            settings.revenue_epoch,
        )),
        DataSource::Workbook => {
            let Some(path) = settings.workbook_path.as_deref() else {
                return Err(AppError::Validation(
                    "workbookPath must be set for the workbook data source".to_string(),
                ));
            };
            Box::new(WorkbookProvider::open(&resolve(base_dir, path))?)
        }
    };
    tracing::info!(provider = provider.name(), spreadsheet = %settings.spreadsheet_id, "data provider ready");
    Ok(provider)
}

impl DashboardCore {
    pub fn open(config: ConfigFile) -> AppResult<Self> {
        let settings = config.load()?;
        let base_dir = base_dir_of(&config);
        let provider = build_provider(&base_dir, &settings)?;
        Ok(Self {
            config,
            settings,
            base_dir,
            provider,
        })
    }

    /// Creates the configured spreadsheet with every worksheet and its header row.
    /// Existing worksheets are left as they are.
    pub fn init_spreadsheet(config: &ConfigFile) -> AppResult<SpreadsheetReport> {
        let settings = config.load()?;
        let path = spreadsheet_path(&base_dir_of(config), &settings);
        let store = SheetStore::create(&path, "Beevent_Database")?;
        for sheet in Worksheet::ALL {
            store.worksheet(sheet.name(), sheet.headers())?;
        }
        Ok(SpreadsheetReport {
            path: path.to_string_lossy().to_string(),
            title: store.title()?,
            worksheets: store.list_worksheets()?,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    /// Persists a settings update. The provider is rebuilt so source changes apply
    /// immediately.
    pub fn update_settings(&mut self, update: serde_json::Value) -> AppResult<AppSettings> {
        let settings = self.config.update(update)?;
        self.provider = build_provider(&self.base_dir, &settings)?;
        self.settings = settings.clone();
        Ok(settings)
    }

    pub fn dataset(&self) -> AppResult<Dataset> {
        load_dataset(self.provider.as_ref())
    }

    pub fn page(&self, view: &ViewState) -> AppResult<PageModel> {
        let data = self.dataset()?;
        Ok(render(view, &data, &self.settings))
    }

    pub fn refresh(&self) -> AppResult<()> {
        match self.provider.writer() {
            Ok(writer) => writer.refresh(),
            Err(_) => Ok(()),
        }
    }

    pub fn add_project(&self, payload: &NewProjectPayload) -> AppResult<WriteReceipt> {
        entry::add_project(self.provider.writer()?, payload)
    }

    pub fn add_staff(&self, payload: &NewStaffPayload) -> AppResult<WriteReceipt> {
        entry::add_staff(self.provider.writer()?, payload)
    }

    pub fn add_customer(&self, payload: &NewCustomerPayload) -> AppResult<WriteReceipt> {
        entry::add_customer(self.provider.writer()?, payload)
    }

    pub fn add_timeline(&self, payload: &NewTimelinePayload) -> AppResult<WriteReceipt> {
        entry::add_timeline(self.provider.writer()?, payload)
    }

    pub fn add_monthly_revenue(&self, payload: &MonthlyRevenuePayload) -> AppResult<WriteReceipt> {
        entry::add_monthly_revenue(self.provider.writer()?, payload)
    }

    pub fn set_pipeline(&self, payload: &PipelineUpdatePayload) -> AppResult<WriteReceipt> {
        entry::set_pipeline(self.provider.writer()?, payload)
    }

    pub fn add_sales_performance(&self, payload: &SalesPerformancePayload) -> AppResult<WriteReceipt> {
        entry::add_sales_performance(self.provider.writer()?, payload)
    }

    pub fn update_project(&self, project_id: &str, payload: &UpdateProjectPayload) -> AppResult<WriteReceipt> {
        entry::update_project(self.provider.writer()?, project_id, payload)
    }

    pub fn delete_row(&self, sheet: Worksheet, row_number: usize) -> AppResult<WriteReceipt> {
        entry::delete_row(self.provider.writer()?, sheet, row_number)
    }

    /// Writes a worksheet to CSV under the export directory. For projects, the view
    /// state's status, category and search filters narrow the rows.
    pub fn export(&self, sheet: Worksheet, view: Option<&ViewState>) -> AppResult<ExportResponse> {
        let mut records = self.provider.records(sheet)?;
        if let (Worksheet::Projects, Some(view)) = (sheet, view) {
            records = Self::filter_project_records(records, view);
        }
        let headers: Vec<String> = sheet.headers().iter().map(ToString::to_string).collect();
        write_csv(
            &resolve(&self.base_dir, &self.settings.export_dir),
            sheet.name(),
            Local::now().date_naive(),
            &headers,
            &records,
        )
    }

    /// Keeps the raw rows whose typed project passes the view's filters. Rows are
    /// matched by position since ids can repeat after a delete.
    fn filter_project_records(records: Vec<RawRecord>, view: &ViewState) -> Vec<RawRecord> {
        let typed = normalize_worksheet(Worksheet::Projects, records.clone());
        records
            .into_iter()
            .zip(typed.iter())
            .filter(|(_, normalized)| view.matches_project(&project_from_record(normalized)))
            .map(|(record, _)| record)
            .collect()
    }
}
