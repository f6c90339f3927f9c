#![deny(missing_docs)]
//! Toolyard command-line interface.
//!
//! Offline ad quotes and slug previews, plus session login, catalog
//! browsing, bulk tool import and queue scheduling against a Toolyard server.

mod api;
mod auth;

use api::{ApiClient, ScheduledTool, ToolCard, ToolImportRow, ToolQuery};
use auth::{DEFAULT_SERVER_URL, LoginArgs};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use toolyard_core::pricing::parse_selection;
use toolyard_core::{AdPricing, AdQuote, AdSelection, AdSpot, Page, slugify};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "toolyard", version, about = "Toolyard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
struct QuoteArgs {
    /// Spot to price (`banner`, `homepage`, `tool_page`, `blog_post` or `all`).
    #[arg(long)]
    spot: Option<String>,
    /// First day, `YYYY-MM-DD`.
    #[arg(long, requires = "spot")]
    start: Option<String>,
    /// Last day (inclusive), `YYYY-MM-DD`.
    #[arg(long, requires = "spot")]
    end: Option<String>,
    /// Extra selection as `spot:start:end` (repeatable).
    #[arg(long = "select")]
    select: Vec<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
struct SessionArgs {
    /// Override the auth session file path.
    #[arg(long)]
    auth_path: Option<PathBuf>,
    /// Server URL; defaults to the one stored with the session.
    #[arg(long, env = "TOOLYARD_API_URL")]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price ad selections offline with the default rate card.
    Quote(QuoteArgs),
    /// Preview the slug generated for a name.
    Slug {
        /// Text to slugify.
        text: String,
    },
    /// Exchange a GitHub token for a Toolyard session.
    Login(LoginArgs),
    /// Browse the public catalog.
    Tools {
        /// Base URL of the Toolyard server.
        #[arg(long, env = "TOOLYARD_API_URL", default_value = DEFAULT_SERVER_URL)]
        server_url: String,
        /// Search text.
        #[arg(long)]
        q: Option<String>,
        /// Category slug.
        #[arg(long)]
        category: Option<String>,
        /// 1-based page.
        #[arg(long)]
        page: Option<i64>,
    },
    /// Create tools from a JSON array through the admin API.
    Import {
        /// JSON file holding an array of tools.
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Put pending free tools on the publication calendar.
    ScheduleQueue {
        /// Maximum tools to schedule.
        #[arg(long)]
        limit: Option<i64>,
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Quote(args) => {
            let selections = collect_selections(&args)?;
            let quote = AdPricing::default().quote(&selections)?;
            match args.format {
                OutputFormat::Text => print!("{}", render_quote(&quote)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&quote)?),
            }
        }
        Commands::Slug { text } => println!("{}", slugify(&text)),
        Commands::Login(args) => auth::run_login(args).await?,
        Commands::Tools {
            server_url,
            q,
            category,
            page,
        } => {
            let client = ApiClient::new(&server_url, None)?;
            let tools = client.list_tools(&ToolQuery { q, category, page }).await?;
            print!("{}", render_tools(&tools));
        }
        Commands::Import { file, session } => {
            let client = session_client(&session).await?;
            let report = run_import(&client, &file).await?;
            print!("{}", render_import_report(&report));
            let failed = report.failed();
            if failed > 0 {
                return Err(format!("{failed} of {} rows failed", report.outcomes.len()).into());
            }
        }
        Commands::ScheduleQueue { limit, session } => {
            let client = session_client(&session).await?;
            let scheduled = client.schedule_queue(limit).await?;
            print!("{}", render_schedule(&scheduled));
        }
    }

    Ok(())
}

/// Build an authenticated client from the stored session.
#[cfg_attr(test, allow(dead_code))]
async fn session_client(args: &SessionArgs) -> CliResult<ApiClient> {
    let path = auth::auth_store_path(args.auth_path.clone())?;
    let session = auth::read_auth_session(&path).await?;
    let server_url = args
        .server_url
        .clone()
        .unwrap_or_else(|| session.server_url.clone());
    ApiClient::new(&server_url, Some(session.token))
}

/// Gather `--spot/--start/--end` and every `--select` into selections.
fn collect_selections(args: &QuoteArgs) -> CliResult<Vec<AdSelection>> {
    let mut selections = Vec::new();
    if let Some(spot) = args.spot.as_deref() {
        let (Some(start), Some(end)) = (args.start.as_deref(), args.end.as_deref()) else {
            return Err("--spot needs both --start and --end".into());
        };
        selections.push(parse_selection(&format!("{spot}:{start}:{end}"))?);
    }
    for raw in &args.select {
        selections.push(parse_selection(raw)?);
    }
    if selections.is_empty() {
        return Err("pass --spot with --start/--end or at least one --select".into());
    }
    Ok(selections)
}

/// Format cents as a decimal amount.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

/// Render a quote as a plain-text receipt.
fn render_quote(quote: &AdQuote) -> String {
    let mut output = String::new();
    let currency = quote.currency.to_uppercase();
    for line in &quote.lines {
        let _ = writeln!(
            output,
            "{}: {} days x {} = {}",
            line.name,
            line.days,
            format_cents(line.price_per_day_cents),
            format_cents(line.subtotal_cents)
        );
        if line.discount_cents > 0 {
            let _ = writeln!(
                output,
                "  discount {}%: -{}",
                line.discount_percent,
                format_cents(line.discount_cents)
            );
        }
    }
    let _ = writeln!(output, "Subtotal: {} {currency}", format_cents(quote.subtotal_cents));
    if quote.discount_cents > 0 {
        let _ = writeln!(output, "Discount: -{} {currency}", format_cents(quote.discount_cents));
    }
    let _ = writeln!(output, "Total: {} {currency}", format_cents(quote.total_cents));
    if quote
        .lines
        .iter()
        .any(|line| line.selection.spot == AdSpot::All)
    {
        let _ = writeln!(output, "The all-spots package blocks every other spot for its dates.");
    }
    output
}

/// Render a catalog page as a list.
#[cfg_attr(test, allow(dead_code))]
fn render_tools(page: &Page<ToolCard>) -> String {
    let mut output = String::new();
    if page.rows.is_empty() {
        let _ = writeln!(output, "No tools found.");
        return output;
    }
    for tool in &page.rows {
        let marker = if tool.is_featured { "*" } else { "-" };
        let _ = write!(output, "{marker} {} ({})", tool.name, tool.slug);
        if let Some(tagline) = tool.tagline.as_deref() {
            let _ = write!(output, ": {tagline}");
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "    {}", tool.website_url);
        if !tool.categories.is_empty() {
            let names: Vec<&str> = tool
                .categories
                .iter()
                .map(|category| category.name.as_str())
                .collect();
            let _ = writeln!(output, "    {}", names.join(", "));
        }
    }
    let _ = writeln!(
        output,
        "Page {} of {} ({} tools)",
        page.page,
        page.page_count.max(1),
        page.total
    );
    output
}

/// Result of importing one row.
#[derive(Debug)]
struct ImportOutcome {
    row: usize,
    name: String,
    result: Result<String, String>,
}

/// Per-row results of a bulk import.
#[derive(Debug, Default)]
struct ImportReport {
    outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// Read tools from `file` and create them one by one; a failed row does not
/// stop the rest.
async fn run_import(client: &ApiClient, file: &Path) -> CliResult<ImportReport> {
    let payload = tokio::fs::read(file).await?;
    let rows: Vec<ToolImportRow> = serde_json::from_slice(&payload)
        .map_err(|err| format!("{} is not a JSON array of tools: {err}", file.display()))?;
    let mut report = ImportReport::default();
    for (index, row) in rows.iter().enumerate() {
        let result = client
            .create_tool(row)
            .await
            .map_err(|err| err.to_string());
        report.outcomes.push(ImportOutcome {
            row: index + 1,
            name: row.name.clone(),
            result,
        });
    }
    Ok(report)
}

/// Render import outcomes, one line per row.
fn render_import_report(report: &ImportReport) -> String {
    let mut output = String::new();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(slug) => {
                let _ = writeln!(output, "ok    #{} {} -> {slug}", outcome.row, outcome.name);
            }
            Err(message) => {
                let _ = writeln!(output, "error #{} {}: {message}", outcome.row, outcome.name);
            }
        }
    }
    let failed = report.failed();
    let _ = writeln!(
        output,
        "Imported {} of {} tools.",
        report.outcomes.len() - failed,
        report.outcomes.len()
    );
    output
}

/// Render newly scheduled tools.
fn render_schedule(scheduled: &[ScheduledTool]) -> String {
    let mut output = String::new();
    if scheduled.is_empty() {
        let _ = writeln!(output, "No pending free tools to schedule.");
        return output;
    }
    for tool in scheduled {
        let _ = writeln!(output, "{}  {}", tool.published_at, tool.slug);
    }
    let _ = writeln!(output, "Scheduled {} tools.", scheduled.len());
    output
}
