use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One worksheet row keyed by header name, as returned by the store.
pub type RawRecord = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Internal,
    #[serde(rename = "Government/Association")]
    Gov,
    Corporate,
}

impl Channel {
    /// Fixed precedence order, also used for tie-breaks.
    pub const ALL: [Channel; 3] = [Channel::Internal, Channel::Gov, Channel::Corporate];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "Internal",
            Self::Gov => "Government/Association",
            Self::Corporate => "Corporate",
        }
    }

    /// Column header used by the monthly revenue worksheet.
    pub fn sheet_column(self) -> &'static str {
        match self {
            Self::Internal => "Nội bộ",
            Self::Gov => "Gov-Hiệp hội",
            Self::Corporate => "Corporate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase();
        match lowered.as_str() {
            "internal" | "nội bộ" | "noi bo" => Some(Self::Internal),
            "gov" | "government/association" | "gov-hiệp hội" | "government" => Some(Self::Gov),
            "corporate" => Some(Self::Corporate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStage {
    Lead,
    Qualified,
    Proposal,
    Won,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 4] = [
        PipelineStage::Lead,
        PipelineStage::Qualified,
        PipelineStage::Proposal,
        PipelineStage::Won,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Won => "Won",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Worksheet {
    Projects,
    Staff,
    Customers,
    Timeline,
    RevenueMonthly,
    SalesPipeline,
    SalesPerformance,
}

pub const PROJECT_HEADERS: &[&str] = &[
    "ID",
    "Tên dự án",
    "Khách hàng",
    "Loại",
    "Ngày bắt đầu",
    "Ngày kết thúc",
    "Doanh thu",
    "Chi phí",
    "Lợi nhuận %",
    "Trạng thái",
    "PIC",
    "Team",
    "Số khách",
    "CSAT",
    "Ghi chú",
    "Ngày tạo",
];

pub const STAFF_HEADERS: &[&str] = &[
    "ID",
    "Họ tên",
    "Chức vụ",
    "Phòng ban",
    "Email",
    "Điện thoại",
    "Ngày vào",
    "Lương",
    "Trạng thái",
    "Kỹ năng",
    "Ghi chú",
    "Ngày tạo",
];

pub const CUSTOMER_HEADERS: &[&str] = &[
    "ID",
    "Tên khách hàng",
    "Công ty",
    "Email",
    "Điện thoại",
    "Địa chỉ",
    "Loại",
    "Nguồn",
    "Trạng thái",
    "Ngày tạo",
];

pub const TIMELINE_HEADERS: &[&str] = &[
    "ID",
    "Project_ID",
    "Giai đoạn",
    "Mô tả",
    "Ngày bắt đầu",
    "Ngày kết thúc",
    "Phụ trách",
    "Trạng thái",
    "Tiến độ %",
    "Ghi chú",
    "Ngày tạo",
];

pub const REVENUE_MONTHLY_HEADERS: &[&str] = &["Tháng", "Nội bộ", "Gov-Hiệp hội", "Corporate"];

pub const SALES_PIPELINE_HEADERS: &[&str] = &["Stage", "Count", "Value"];

pub const SALES_PERFORMANCE_HEADERS: &[&str] =
    &["Nhân viên", "Doanh thu", "Số deal", "Conversion %", "Kênh"];

impl Worksheet {
    pub const ALL: [Worksheet; 7] = [
        Worksheet::Projects,
        Worksheet::Staff,
        Worksheet::Customers,
        Worksheet::Timeline,
        Worksheet::RevenueMonthly,
        Worksheet::SalesPipeline,
        Worksheet::SalesPerformance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::Staff => "Staff",
            Self::Customers => "Customers",
            Self::Timeline => "Timeline",
            Self::RevenueMonthly => "revenue_monthly",
            Self::SalesPipeline => "sales_pipeline",
            Self::SalesPerformance => "sales_performance",
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Self::Projects => PROJECT_HEADERS,
            Self::Staff => STAFF_HEADERS,
            Self::Customers => CUSTOMER_HEADERS,
            Self::Timeline => TIMELINE_HEADERS,
            Self::RevenueMonthly => REVENUE_MONTHLY_HEADERS,
            Self::SalesPipeline => SALES_PIPELINE_HEADERS,
            Self::SalesPerformance => SALES_PERFORMANCE_HEADERS,
        }
    }

    /// Prefix of generated row ids, for worksheets that carry an `ID` column.
    pub fn id_prefix(self) -> Option<&'static str> {
        match self {
            Self::Projects => Some("PRJ"),
            Self::Staff => Some("STF"),
            Self::Customers => Some("CUS"),
            Self::Timeline => Some("TML"),
            _ => None,
        }
    }

    pub fn numeric_columns(self) -> &'static [&'static str] {
        match self {
            Self::Projects => &["Doanh thu", "Chi phí", "Lợi nhuận %", "Số khách", "CSAT"],
            Self::Staff => &["Lương"],
            Self::Timeline => &["Tiến độ %"],
            Self::RevenueMonthly => &["Nội bộ", "Gov-Hiệp hội", "Corporate"],
            Self::SalesPipeline => &["Count", "Value"],
            // Conversion % stays raw so a blank cell reads as "no figure", not 0.
            Self::SalesPerformance => &["Doanh thu", "Số deal"],
            Self::Customers => &[],
        }
    }

    pub fn date_columns(self) -> &'static [&'static str] {
        match self {
            Self::Projects | Self::Timeline => &["Ngày bắt đầu", "Ngày kết thúc"],
            Self::Staff => &["Ngày vào"],
            Self::RevenueMonthly => &["Tháng"],
            _ => &[],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|sheet| sheet.name().to_lowercase() == lowered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub customer: String,
    pub category: String,
    pub channel: Channel,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revenue: f64,
    pub cost: f64,
    pub profit_pct: f64,
    pub status: String,
    pub owner: String,
    pub csat: f64,
    pub guests: f64,
    pub team: String,
    pub notes: String,
    pub created_at: String,
}

impl ProjectRecord {
    pub fn profit(&self) -> f64 {
        self.revenue - self.cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRecord {
    pub id: String,
    pub full_name: String,
    pub position: String,
    pub department: String,
    pub email: String,
    pub phone: String,
    pub join_date: Option<NaiveDate>,
    pub salary: f64,
    pub status: String,
    pub skills: String,
    pub notes: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub customer_type: String,
    pub source: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    pub id: String,
    pub project_id: String,
    pub phase: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub assignee: String,
    pub status: String,
    pub progress_pct: f64,
    pub notes: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStageSnapshot {
    pub stage: PipelineStage,
    pub count: u64,
    /// Stage value in millions of currency units.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenueRow {
    pub month: NaiveDate,
    pub by_channel: BTreeMap<Channel, f64>,
    pub total: f64,
    pub cumulative_actual: f64,
    pub cumulative_target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformanceRow {
    pub rank: usize,
    pub owner: String,
    pub revenue: f64,
    pub deal_count: u64,
    pub channel: Channel,
    pub won_count: u64,
    pub staged_count: u64,
    /// Won share of staged deals; `None` when the owner has no staged deals.
    pub conversion_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    Sheet,
    Sample,
    Workbook,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub spreadsheet_id: String,
    pub data_source: DataSource,
    pub data_dir: String,
    pub workbook_path: Option<String>,
    pub sample_seed: u64,
    pub cache_ttl_seconds: u64,
    pub revenue_target: f64,
    pub gross_profit_target: f64,
    pub revenue_epoch: NaiveDate,
    pub gross_margin_ratio: f64,
    pub operating_cost_ratio: f64,
    pub external_share_target_pct: f64,
    pub project_target: u64,
    pub csat_target: f64,
    pub log_dir: Option<String>,
    pub export_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: "beevent-2026".to_string(),
            data_source: DataSource::Sheet,
            data_dir: "data".to_string(),
            workbook_path: None,
            sample_seed: 2026,
            cache_ttl_seconds: 60,
            revenue_target: 80_000_000_000.0,
            gross_profit_target: 13_920_000_000.0,
            revenue_epoch: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
            gross_margin_ratio: 0.174,
            operating_cost_ratio: 0.95,
            external_share_target_pct: 45.0,
            project_target: 120,
            csat_target: 4.2,
            log_dir: None,
            export_dir: "exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProjectPayload {
    pub name: String,
    pub customer: String,
    pub category: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revenue: u64,
    pub cost: u64,
    pub status: String,
    pub owner: String,
    pub team: Vec<String>,
    pub guests: u64,
    pub csat: Option<f64>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectPayload {
    pub name: Option<String>,
    pub customer: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revenue: Option<u64>,
    pub cost: Option<u64>,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub csat: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaffPayload {
    pub full_name: String,
    pub position: String,
    pub department: String,
    pub email: String,
    pub phone: String,
    pub join_date: Option<NaiveDate>,
    pub salary: u64,
    pub status: String,
    pub skills: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerPayload {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub customer_type: String,
    pub source: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimelinePayload {
    pub project_id: String,
    pub phase: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub assignee: String,
    pub status: String,
    pub progress_pct: u8,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenuePayload {
    pub month: NaiveDate,
    pub internal: u64,
    pub gov: u64,
    pub corporate: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTally {
    pub count: u64,
    /// Value in millions.
    pub value: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineUpdatePayload {
    pub lead: StageTally,
    pub qualified: StageTally,
    pub proposal: StageTally,
    pub won: StageTally,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPerformancePayload {
    pub salesperson: String,
    pub revenue: u64,
    pub deals: u64,
    pub conversion_pct: f64,
    pub channel: Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub worksheet: String,
    pub row_number: usize,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
    pub rows: usize,
}
