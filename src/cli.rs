use crate::config::{ConfigFile, DEFAULT_CONFIG_FILE};
use crate::errors::AppError;
use crate::models::{
    Channel, MonthlyRevenuePayload, NewCustomerPayload, NewProjectPayload, NewStaffPayload,
    NewTimelinePayload, PipelineUpdatePayload, SalesPerformancePayload, StageTally,
    UpdateProjectPayload, Worksheet,
};
use crate::service::DashboardCore;
use crate::views::{Page, ViewState};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "beevent",
    version,
    about = "Beevent business dashboard and spreadsheet data entry"
)]
pub struct Cli {
    /// Settings file (YAML); defaults apply when it does not exist
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the configured spreadsheet with all worksheets and header rows
    Init,
    /// Render one dashboard page as JSON
    Page(PageArgs),
    AddProject(AddProjectArgs),
    AddStaff(AddStaffArgs),
    AddCustomer(AddCustomerArgs),
    AddTimeline(AddTimelineArgs),
    /// Append one month of channel revenue
    AddRevenue(AddRevenueArgs),
    /// Replace the sales pipeline snapshot
    SetPipeline(SetPipelineArgs),
    AddSales(AddSalesArgs),
    UpdateProject(UpdateProjectArgs),
    /// Delete a data row by sheet row number (row 1 is the header)
    DeleteRow(DeleteRowArgs),
    /// Write a worksheet to CSV
    Export(ExportArgs),
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Channels to show (repeatable): internal, gov, corporate
    #[arg(long = "channel", value_parser = parse_channel)]
    pub channels: Vec<Channel>,
    /// Project or staff status to keep (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Project category to keep (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Timeline project id
    #[arg(long)]
    pub project: Option<String>,
    /// Case-insensitive text search over every field
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    fn view(self, page: Page) -> ViewState {
        ViewState::new(page)
            .with_channels(self.channels)
            .with_statuses(self.statuses)
            .with_categories(self.categories)
            .with_project(self.project)
            .with_search(self.search)
    }
}

#[derive(Args)]
pub struct PageArgs {
    /// overview, channels, sales, projects, plan, finance, staff, timeline, customers
    #[arg(default_value = "overview")]
    pub page: String,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args)]
pub struct AddProjectArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub customer: String,
    #[arg(long, default_value = "")]
    pub category: String,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,
    #[arg(long, default_value_t = 0)]
    pub revenue: u64,
    #[arg(long, default_value_t = 0)]
    pub cost: u64,
    #[arg(long, default_value = "Lead")]
    pub status: String,
    /// Person in charge
    #[arg(long)]
    pub owner: String,
    #[arg(long, value_delimiter = ',')]
    pub team: Vec<String>,
    #[arg(long, default_value_t = 0)]
    pub guests: u64,
    #[arg(long)]
    pub csat: Option<f64>,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct AddStaffArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub position: String,
    #[arg(long, default_value = "")]
    pub department: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub joined: Option<NaiveDate>,
    #[arg(long, default_value_t = 0)]
    pub salary: u64,
    #[arg(long, default_value = "Đang làm")]
    pub status: String,
    #[arg(long, default_value = "")]
    pub skills: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct AddCustomerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long = "type", default_value = "")]
    pub customer_type: String,
    #[arg(long, default_value = "")]
    pub source: String,
    #[arg(long, default_value = "Hoạt động")]
    pub status: String,
}

#[derive(Args)]
pub struct AddTimelineArgs {
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub phase: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,
    #[arg(long)]
    pub assignee: String,
    #[arg(long, default_value = "Chưa bắt đầu")]
    pub status: String,
    #[arg(long, default_value_t = 0)]
    pub progress: u8,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args)]
pub struct AddRevenueArgs {
    /// Any day of the month
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub month: NaiveDate,
    #[arg(long, default_value_t = 0)]
    pub internal: u64,
    #[arg(long, default_value_t = 0)]
    pub gov: u64,
    #[arg(long, default_value_t = 0)]
    pub corporate: u64,
}

/// Stage tallies as COUNT:VALUE, value in millions.
#[derive(Args)]
pub struct SetPipelineArgs {
    #[arg(long, value_parser = parse_tally, default_value = "0:0")]
    pub lead: StageTally,
    #[arg(long, value_parser = parse_tally, default_value = "0:0")]
    pub qualified: StageTally,
    #[arg(long, value_parser = parse_tally, default_value = "0:0")]
    pub proposal: StageTally,
    #[arg(long, value_parser = parse_tally, default_value = "0:0")]
    pub won: StageTally,
}

#[derive(Args)]
pub struct AddSalesArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value_t = 0)]
    pub revenue: u64,
    #[arg(long, default_value_t = 0)]
    pub deals: u64,
    #[arg(long, default_value_t = 0.0)]
    pub conversion: f64,
    #[arg(long, value_parser = parse_channel, default_value = "corporate")]
    pub channel: Channel,
}

#[derive(Args)]
pub struct UpdateProjectArgs {
    /// Project id, e.g. PRJ0001
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,
    #[arg(long)]
    pub revenue: Option<u64>,
    #[arg(long)]
    pub cost: Option<u64>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub csat: Option<f64>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct DeleteRowArgs {
    #[arg(value_parser = parse_worksheet)]
    pub worksheet: Worksheet,
    pub row: usize,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(value_parser = parse_worksheet)]
    pub worksheet: Worksheet,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective settings
    Show,
    /// Merge a JSON object into the settings file
    Set {
        #[arg(value_name = "JSON")]
        update: String,
    },
}

fn parse_channel(value: &str) -> Result<Channel, String> {
    Channel::parse(value).ok_or_else(|| format!("unknown channel {}", value))
}

fn parse_worksheet(value: &str) -> Result<Worksheet, String> {
    Worksheet::parse(value).ok_or_else(|| {
        let known: Vec<&str> = Worksheet::ALL.iter().map(|sheet| sheet.name()).collect();
        format!("unknown worksheet {}; expected one of {}", value, known.join(", "))
    })
}

fn parse_tally(value: &str) -> Result<StageTally, String> {
    let (count, amount) = value
        .split_once(':')
        .ok_or_else(|| format!("expected COUNT:VALUE, got {}", value))?;
    Ok(StageTally {
        count: count.trim().parse().map_err(|_| format!("invalid count in {}", value))?,
        value: amount.trim().parse().map_err(|_| format!("invalid value in {}", value))?,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigFile::new(&cli.config);
    match cli.command {
        Commands::Init => {
            let report = DashboardCore::init_spreadsheet(&config).context("initializing spreadsheet")?;
            print_json(&report)
        }
        Commands::Settings(SettingsCommands::Show) => print_json(&config.load()?),
        Commands::Settings(SettingsCommands::Set { update }) => {
            let update: serde_json::Value = serde_json::from_str(&update)
                .map_err(|error| AppError::Validation(error.to_string()))
                .context("settings update must be a JSON object")?;
            print_json(&config.update(update)?)
        }
        command => {
            let core = DashboardCore::open(config).context("opening data source")?;
            run_with_core(&core, command)
        }
    }
}

fn run_with_core(core: &DashboardCore, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Page(args) => {
            let page = Page::parse(&args.page)?;
            print_json(&core.page(&args.filters.view(page))?)
        }
        Commands::AddProject(args) => print_json(&core.add_project(&NewProjectPayload {
            name: args.name,
            customer: args.customer,
            category: args.category,
            start_date: args.start,
            end_date: args.end,
            revenue: args.revenue,
            cost: args.cost,
            status: args.status,
            owner: args.owner,
            team: args.team,
            guests: args.guests,
            csat: args.csat,
            notes: args.notes,
        })?),
        Commands::AddStaff(args) => print_json(&core.add_staff(&NewStaffPayload {
            full_name: args.name,
            position: args.position,
            department: args.department,
            email: args.email,
            phone: args.phone,
            join_date: args.joined,
            salary: args.salary,
            status: args.status,
            skills: args.skills,
            notes: args.notes,
        })?),
        Commands::AddCustomer(args) => print_json(&core.add_customer(&NewCustomerPayload {
            name: args.name,
            company: args.company,
            email: args.email,
            phone: args.phone,
            address: args.address,
            customer_type: args.customer_type,
            source: args.source,
            status: args.status,
        })?),
        Commands::AddTimeline(args) => print_json(&core.add_timeline(&NewTimelinePayload {
            project_id: args.project,
            phase: args.phase,
            description: args.description,
            start_date: args.start,
            end_date: args.end,
            assignee: args.assignee,
            status: args.status,
            progress_pct: args.progress,
            notes: args.notes,
        })?),
        Commands::AddRevenue(args) => print_json(&core.add_monthly_revenue(&MonthlyRevenuePayload {
            month: args.month,
            internal: args.internal,
            gov: args.gov,
            corporate: args.corporate,
        })?),
        Commands::SetPipeline(args) => print_json(&core.set_pipeline(&PipelineUpdatePayload {
            lead: args.lead,
            qualified: args.qualified,
            proposal: args.proposal,
            won: args.won,
        })?),
        Commands::AddSales(args) => print_json(&core.add_sales_performance(&SalesPerformancePayload {
            salesperson: args.name,
            revenue: args.revenue,
            deals: args.deals,
            conversion_pct: args.conversion,
            channel: args.channel,
        })?),
        Commands::UpdateProject(args) => print_json(&core.update_project(
            &args.id,
            &UpdateProjectPayload {
                name: args.name,
                customer: args.customer,
                category: args.category,
                start_date: args.start,
                end_date: args.end,
                revenue: args.revenue,
                cost: args.cost,
                status: args.status,
                owner: args.owner,
                csat: args.csat,
                notes: args.notes,
            },
        )?),
        Commands::DeleteRow(args) => print_json(&core.delete_row(args.worksheet, args.row)?),
        Commands::Export(args) => {
            let view = args.filters.view(Page::Projects);
            print_json(&core.export(args.worksheet, Some(&view))?)
        }
        Commands::Init | Commands::Settings(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_tally, Cli, Commands};
    use crate::models::{Channel, Worksheet};
    use clap::Parser;

    #[test]
    fn page_filters_parse() {
        let cli = Cli::parse_from([
            "beevent", "page", "channels", "--channel", "gov", "--channel", "internal", "--search", "gala",
        ]);
        let Commands::Page(args) = cli.command else {
            panic!("page command expected");
        };
        assert_eq!(args.page, "channels");
        assert_eq!(args.filters.channels, vec![Channel::Gov, Channel::Internal]);
        assert_eq!(args.filters.search.as_deref(), Some("gala"));
    }

    #[test]
    fn delete_row_accepts_sheet_names() {
        let cli = Cli::parse_from(["beevent", "--config", "x.yaml", "delete-row", "revenue-monthly", "3"]);
        let Commands::DeleteRow(args) = cli.command else {
            panic!("delete-row expected");
        };
        assert_eq!(args.worksheet, Worksheet::RevenueMonthly);
        assert_eq!(args.row, 3);
        assert!(Cli::try_parse_from(["beevent", "delete-row", "Invoices", "2"]).is_err());
    }

    #[test]
    fn tallies_are_count_and_value() {
        let tally = parse_tally("12:3400").expect("tally");
        assert_eq!((tally.count, tally.value), (12, 3400));
        assert!(parse_tally("12").is_err());
    }
}
