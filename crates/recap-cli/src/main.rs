use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use recap_core::app::{
    App, AppBuilder, Gated, HookOutcome, MaintenanceReport, RecordKey, ShowTarget, WeeklyMerge,
};
use recap_core::config::Config;
use recap_core::domain::SessionId;
use recap_core::observability::init_logging;

#[derive(Debug, Parser)]
#[command(
    name = "recap",
    version,
    about = "Summarize finished sessions into daily, weekly and monthly records"
)]
struct Cli {
    /// Config file (default: ~/.recap/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Session-start hook entry point. Reads `{session_id, cwd}` JSON on stdin.
    Hook,
    /// Print records: today, week, all or a YYYY-MM-DD date.
    Show {
        #[arg(default_value = "today")]
        target: ShowTarget,
    },
    /// Overview of stored records.
    List,
    /// Case-insensitive search across every record.
    Search { keyword: String },
    Status,
    /// Run the weekly maintenance now.
    Maintenance {
        /// Run even if today is not the trigger day.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    session_id: Option<String>,
    cwd: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Hook => {
            // hook は何があっても 0 で終わり、stdout には書かない
            run_hook(config_path).await;
            Ok(())
        }
        Commands::Show { target } => show(&open(&config_path)?, target),
        Commands::List => list(&open(&config_path)?),
        Commands::Search { keyword } => search(&open(&config_path)?, &keyword),
        Commands::Status => status(&open(&config_path)?),
        Commands::Maintenance { force } => {
            let config = Config::load_from(&config_path)?;
            let _log = init_logging(&config.layout())?;
            maintenance(&AppBuilder::new(config).build()?, force)
        }
    }
}

/// Read-only view of the store; creates nothing under the root.
fn open(config_path: &Path) -> Result<App> {
    Ok(AppBuilder::new(Config::load_from(config_path)?)
        .read_only()
        .build()?)
}

async fn run_hook(config_path: PathBuf) {
    let Ok(config) = Config::load_from(&config_path) else {
        return;
    };
    let Ok(_log) = init_logging(&config.layout()) else {
        return;
    };

    let input = read_hook_input();
    let session = SessionId::new(input.session_id.unwrap_or_else(|| {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!("manual-{secs}")
    }));
    let cwd = input
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match hook(config, session, &cwd).await {
        Ok(HookOutcome::NoTranscript) => {}
        Ok(HookOutcome::Triggered(report)) => {
            tracing::debug!(?report, "hook finished");
        }
        Err(e) => tracing::error!(error = %e, "hook failed"),
    }
}

async fn hook(config: Config, session: SessionId, cwd: &Path) -> recap_core::Result<HookOutcome> {
    let app = AppBuilder::new(config).build()?;
    app.on_session_start(session, cwd).await
}

fn read_hook_input() -> HookInput {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return HookInput::default();
    }
    let mut raw = String::new();
    if stdin.lock().read_to_string(&mut raw).is_err() {
        return HookInput::default();
    }
    serde_json::from_str(&raw).unwrap_or_default()
}

fn banner(key: &RecordKey) -> String {
    let bar = "━".repeat(40);
    format!("\n{bar} {key} {bar}")
}

fn show(app: &App, target: ShowTarget) -> Result<()> {
    let sections = app.inspector.show(target)?;
    if sections.is_empty() {
        match target {
            ShowTarget::Today => println!("No records for today."),
            ShowTarget::Week => println!("No records this week."),
            ShowTarget::All => println!("No records yet."),
            ShowTarget::Date(date) => println!("No records for {date}."),
        }
        return Ok(());
    }

    let single = matches!(target, ShowTarget::Today | ShowTarget::Date(_));
    for section in sections {
        if !single {
            println!("{}", banner(&section.key));
        }
        println!("{}", section.content);
    }
    Ok(())
}

fn list(app: &App) -> Result<()> {
    let listing = app.inspector.list()?;
    if listing.is_empty() {
        println!("No records yet.");
        return Ok(());
    }

    if !listing.dailies.is_empty() {
        println!("Daily:");
        for (date, entries) in &listing.dailies {
            println!("  {date}  ({entries} entries)");
        }
    }
    if !listing.weeklies.is_empty() {
        println!("\nWeekly:");
        for monday in &listing.weeklies {
            println!("  week-{monday}");
        }
    }
    if !listing.months.is_empty() {
        println!("\nMonthly archives:");
        for (month, weeklies) in &listing.months {
            println!("  {month}  ({weeklies} weekly records)");
        }
    }
    Ok(())
}

fn search(app: &App, keyword: &str) -> Result<()> {
    let hits = app.inspector.search(keyword)?;
    if hits.is_empty() {
        println!("No matches.");
    }
    for hit in hits {
        println!("  {}:{}: {}", hit.key, hit.line, hit.text);
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn status(app: &App) -> Result<()> {
    let status = app.inspector.status()?;
    println!("recap status");
    println!("  root:         {}", status.root.display());
    println!("  queued:       {}", status.queued);
    println!("  summarized:   {}", status.resolved);
    println!("  model:        {}", status.model);
    println!("  processing:   {}", yes_no(status.gate_held));
    println!("  trigger day:  {}", yes_no(status.trigger_day));

    if !status.recent_log.is_empty() {
        println!("\nRecent log:");
        for line in &status.recent_log {
            println!("  {line}");
        }
    }
    Ok(())
}

fn maintenance(app: &App, force: bool) -> Result<()> {
    let report = match app.coordinator.run_maintenance(force)? {
        Gated::Contended => {
            println!("Another recap process is running; try again later.");
            return Ok(());
        }
        Gated::Ran(report) => report,
    };

    let summary = match report {
        MaintenanceReport::NotTriggerDay => {
            println!("Today is not the trigger day; use --force to run anyway.");
            return Ok(());
        }
        MaintenanceReport::AlreadyDone => {
            println!("Maintenance already ran today.");
            return Ok(());
        }
        MaintenanceReport::Aborted { reason } => anyhow::bail!("maintenance aborted: {reason}"),
        MaintenanceReport::Ran(summary) => summary,
    };

    match &summary.weekly {
        WeeklyMerge::Written { monday, dailies } => {
            println!("Weekly record week-{monday} written from {dailies} daily records.")
        }
        WeeklyMerge::AlreadyExists(_) => println!("Last week's record already exists."),
        WeeklyMerge::NoDailies => println!("No daily records from last week."),
        WeeklyMerge::Failed => println!("Weekly merge failed; see the log."),
    }
    println!(
        "Purged {} summary markers and {} stale tasks.",
        summary.purged_markers, summary.purged_tasks
    );
    if let Some(month) = &summary.archive.month {
        println!("Archived {} weekly records into {month}.", summary.archive.moved);
    }
    for monday in &summary.archive.conflicts {
        println!("Conflict: week-{monday} differs from its archived copy; left in place.");
    }
    if !summary.failed_steps.is_empty() {
        anyhow::bail!("maintenance steps failed: {}", summary.failed_steps.join(", "));
    }
    Ok(())
}
