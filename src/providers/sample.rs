use crate::errors::AppResult;
use crate::models::{RawRecord, Worksheet};
use crate::providers::DataProvider;
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

const PROJECT_COUNT: usize = 36;
const MILESTONE_PROJECTS: usize = 6;

const CATEGORIES: &[&str] = &["Gala", "Hội nghị", "Teambuilding", "Hội thảo", "Nội bộ", "Gov Summit"];
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Nguyễn Văn An", "Công ty ABC", "Doanh nghiệp"),
    ("Trần Thị Bình", "Hiệp hội Du lịch", "Hiệp hội"),
    ("Lê Minh Châu", "Beevent", "Nội bộ"),
    ("Phạm Quốc Dũng", "Sở Văn hóa", "Gov"),
    ("Hoàng Thu Hà", "Tập đoàn XYZ", "Doanh nghiệp"),
    ("Vũ Đức Khang", "Ngân hàng MNO", "Doanh nghiệp"),
];
const STATUSES: &[&str] = &["Lead", "Đàm phán", "Báo giá", "Đã ký", "Đang thực hiện", "Hoàn thành", "Hủy"];
const DEPARTMENTS: &[(&str, &[&str])] = &[
    ("Sales", &["Sales Executive", "Sales Manager"]),
    ("Operations", &["Event Coordinator", "Event Manager"]),
    ("Creative", &["Designer", "Content Lead"]),
    ("Finance", &["Accountant"]),
];
const STAFF_NAMES: &[&str] = &[
    "Đỗ Lan", "Bùi Minh", "Ngô Hà", "Đặng Khoa", "Phan Vy", "Trịnh Sơn", "Mai Anh", "Lý Tuấn",
];
const PHASES: &[&str] = &["Khảo sát", "Lên concept", "Chuẩn bị", "Triển khai", "Nghiệm thu"];
const MILESTONE_STATUSES: &[&str] = &["Hoàn thành", "Đang thực hiện", "Chưa bắt đầu", "Trễ hạn"];

/// Generated, reproducible demo data for all worksheets. The same seed always
/// yields the same rows, and nothing is ever written.
#[derive(Debug, Clone)]
pub struct SampleProvider {
    seed: u64,
    epoch: NaiveDate,
}

impl SampleProvider {
    pub fn new(seed: u64) -> Self {
        Self::with_epoch(seed, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default())
    }

    pub fn with_epoch(seed: u64, epoch: NaiveDate) -> Self {
        Self { seed, epoch }
    }

    fn rng(&self, sheet: Worksheet) -> StdRng {
        let offset = Worksheet::ALL
            .iter()
            .position(|candidate| *candidate == sheet)
            .unwrap_or(0) as u64;
        StdRng::seed_from_u64(self.seed.wrapping_mul(31).wrapping_add(offset))
    }

    fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
        &items[rng.random_range(0..items.len())]
    }

    fn project_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::Projects);
        (1..=PROJECT_COUNT)
            .map(|index| {
                let (contact, company, _) = Self::pick(&mut rng, CUSTOMERS);
                let category = *Self::pick(&mut rng, CATEGORIES);
                let start = self.epoch + Duration::days(rng.random_range(0..365));
                let end = start + Duration::days(rng.random_range(1..4));
                let revenue = rng.random_range(50..3_000) as i64 * 1_000_000;
                let cost = (revenue as f64 * rng.random_range(0.6..0.95)).round() as i64;
                let margin = ((revenue - cost) as f64 / revenue as f64 * 10_000.0).round() / 100.0;
                let csat = (rng.random_range(30..=50) as f64) / 10.0;
                record(
                    Worksheet::Projects,
                    vec![
                        json!(format!("PRJ{:04}", index)),
                        json!(format!("{} {} {}", category, company, start.year())),
                        json!(format!("{} ({})", company, contact)),
                        json!(category),
                        json!(start.format("%Y-%m-%d").to_string()),
                        json!(end.format("%Y-%m-%d").to_string()),
                        json!(revenue),
                        json!(cost),
                        json!(margin),
                        json!(*Self::pick(&mut rng, STATUSES)),
                        json!(*Self::pick(&mut rng, STAFF_NAMES)),
                        json!(format!("{}, {}", Self::pick(&mut rng, STAFF_NAMES), Self::pick(&mut rng, STAFF_NAMES))),
                        json!(rng.random_range(50..1_000)),
                        json!(csat),
                        json!(""),
                        json!(format!("{} 09:00:00", start.format("%Y-%m-%d"))),
                    ],
                )
            })
            .collect()
    }

    fn staff_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::Staff);
        STAFF_NAMES
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let (department, positions) = *Self::pick(&mut rng, DEPARTMENTS);
                let joined = self.epoch - Duration::days(rng.random_range(30..1_500));
                let status = if rng.random_bool(0.85) { "Đang làm" } else { "Nghỉ việc" };
                record(
                    Worksheet::Staff,
                    vec![
                        json!(format!("STF{:04}", index + 1)),
                        json!(*name),
                        json!(*Self::pick(&mut rng, positions)),
                        json!(department),
                        json!(format!("staff{}@beevent.vn", index + 1)),
                        json!(format!("09{:08}", rng.random_range(0..100_000_000u32))),
                        json!(joined.format("%Y-%m-%d").to_string()),
                        json!(rng.random_range(12..45) as i64 * 1_000_000),
                        json!(status),
                        json!(""),
                        json!(""),
                        json!(format!("{} 09:00:00", joined.format("%Y-%m-%d"))),
                    ],
                )
            })
            .collect()
    }

    fn customer_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::Customers);
        CUSTOMERS
            .iter()
            .enumerate()
            .map(|(index, (contact, company, kind))| {
                record(
                    Worksheet::Customers,
                    vec![
                        json!(format!("CUS{:04}", index + 1)),
                        json!(*contact),
                        json!(*company),
                        json!(format!("contact{}@example.vn", index + 1)),
                        json!(format!("09{:08}", rng.random_range(0..100_000_000u32))),
                        json!("Hà Nội"),
                        json!(*kind),
                        json!(*Self::pick(&mut rng, &["Giới thiệu", "Website", "Sự kiện"])),
                        json!("Hoạt động"),
                        json!(format!("{} 09:00:00", self.epoch.format("%Y-%m-%d"))),
                    ],
                )
            })
            .collect()
    }

    fn timeline_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::Timeline);
        let mut rows = Vec::new();
        for project in 1..=MILESTONE_PROJECTS {
            let mut start = self.epoch + Duration::days(rng.random_range(0..300));
            for phase in PHASES {
                let end = start + Duration::days(rng.random_range(2..10));
                let status = *Self::pick(&mut rng, MILESTONE_STATUSES);
                let progress = match status {
                    "Hoàn thành" => 100,
                    "Chưa bắt đầu" => 0,
                    _ => rng.random_range(10..90),
                };
                rows.push(record(
                    Worksheet::Timeline,
                    vec![
                        json!(format!("TML{:04}", rows.len() + 1)),
                        json!(format!("PRJ{:04}", project)),
                        json!(*phase),
                        json!(""),
                        json!(start.format("%Y-%m-%d").to_string()),
                        json!(end.format("%Y-%m-%d").to_string()),
                        json!(*Self::pick(&mut rng, STAFF_NAMES)),
                        json!(status),
                        json!(progress),
                        json!(""),
                        json!(format!("{} 09:00:00", start.format("%Y-%m-%d"))),
                    ],
                ));
                start = end;
            }
        }
        rows
    }

    fn pipeline_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::SalesPipeline);
        let lead = rng.random_range(40..60u64);
        let qualified = lead * rng.random_range(40..60u64) / 100;
        let proposal = qualified * rng.random_range(50..70u64) / 100;
        let won = proposal * rng.random_range(50..80u64) / 100;
        [("Lead", lead), ("Qualified", qualified), ("Proposal", proposal), ("Won", won)]
            .into_iter()
            .map(|(stage, count)| {
                record(
                    Worksheet::SalesPipeline,
                    vec![json!(stage), json!(count), json!(count * 1_500)],
                )
            })
            .collect()
    }

    fn performance_rows(&self) -> Vec<RawRecord> {
        let mut rng = self.rng(Worksheet::SalesPerformance);
        STAFF_NAMES
            .iter()
            .take(5)
            .map(|name| {
                let deals = rng.random_range(3..20u64);
                record(
                    Worksheet::SalesPerformance,
                    vec![
                        json!(*name),
                        json!(deals as i64 * rng.random_range(200..900) as i64 * 1_000_000),
                        json!(deals),
                        json!(rng.random_range(10..60)),
                        json!(*Self::pick(&mut rng, &["Nội bộ", "Gov", "Corporate"])),
                    ],
                )
            })
            .collect()
    }
}

fn record(sheet: Worksheet, values: Vec<Value>) -> RawRecord {
    sheet
        .headers()
        .iter()
        .map(ToString::to_string)
        .zip(values)
        .collect()
}

impl DataProvider for SampleProvider {
    fn name(&self) -> &'static str {
        "sample"
    }

    fn records(&self, sheet: Worksheet) -> AppResult<Vec<RawRecord>> {
        Ok(match sheet {
            Worksheet::Projects => self.project_rows(),
            Worksheet::Staff => self.staff_rows(),
            Worksheet::Customers => self.customer_rows(),
            Worksheet::Timeline => self.timeline_rows(),
            // Monthly revenue is derived from projects.
            Worksheet::RevenueMonthly => Vec::new(),
            Worksheet::SalesPipeline => self.pipeline_rows(),
            Worksheet::SalesPerformance => self.performance_rows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SampleProvider, PROJECT_COUNT};
    use crate::models::Worksheet;
    use crate::providers::DataProvider;

    #[test]
    fn same_seed_same_rows() {
        let first = SampleProvider::new(42);
        let second = SampleProvider::new(42);
        for sheet in Worksheet::ALL {
            assert_eq!(
                first.records(sheet).expect("records"),
                second.records(sheet).expect("records")
            );
        }
        assert_ne!(
            first.records(Worksheet::Projects).expect("records"),
            SampleProvider::new(43).records(Worksheet::Projects).expect("records")
        );
    }

    #[test]
    fn rows_carry_every_header() {
        let provider = SampleProvider::new(1);
        let projects = provider.records(Worksheet::Projects).expect("records");
        assert_eq!(projects.len(), PROJECT_COUNT);
        for sheet in Worksheet::ALL {
            for row in provider.records(sheet).expect("records") {
                assert_eq!(row.len(), sheet.headers().len());
            }
        }
    }

    #[test]
    fn timeline_references_generated_projects() {
        let provider = SampleProvider::new(9);
        let ids: Vec<String> = provider
            .records(Worksheet::Projects)
            .expect("records")
            .iter()
            .map(|row| row["ID"].as_str().unwrap_or_default().to_string())
            .collect();
        for milestone in provider.records(Worksheet::Timeline).expect("records") {
            let project = milestone["Project_ID"].as_str().unwrap_or_default();
            assert!(ids.iter().any(|id| id == project));
        }
    }
}
