use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tally_core::{GoalBoard, GoalTier, PeriodKind, TimeWindow};
use tally_report::{Applied, Report, ReportContext, ReportState, View};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod render;
mod source;
mod state;
mod watch;

use render::Format;
use source::Source;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Sales dashboards from the transactions API")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Read a saved API response instead of calling the server
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sales of one day by hour (default: today)
    Today {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Sales per day over a date range (default: the last week)
    Daily {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Sales per day of one month, with monthly goals (default: this month)
    Monthly {
        /// Month as YYYY-MM
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },

    /// Sales per month of one year, with yearly goals (default: this year)
    Yearly {
        #[arg(long)]
        year: Option<i32>,
    },

    /// Show or edit sales goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },

    /// Refresh a view on its configured interval until Ctrl-C
    Watch {
        #[arg(value_enum)]
        view: ViewArg,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    /// Print the three tiers and progress for the current period
    Show {
        #[arg(value_enum)]
        period: PeriodArg,
    },

    /// Store a goal from typed digits, read as cents (e.g. 1500000 = R$ 15.000,00)
    Set {
        #[arg(value_enum)]
        period: PeriodArg,
        #[arg(value_enum)]
        tier: TierArg,
        digits: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Today,
    Daily,
    Monthly,
    Yearly,
}

impl From<ViewArg> for View {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Today => View::Today,
            ViewArg::Daily => View::Daily,
            ViewArg::Monthly => View::Monthly,
            ViewArg::Yearly => View::Yearly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodArg {
    Daily,
    Monthly,
    Yearly,
}

impl From<PeriodArg> for PeriodKind {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Daily => PeriodKind::Daily,
            PeriodArg::Monthly => PeriodKind::Monthly,
            PeriodArg::Yearly => PeriodKind::Yearly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Meta,
    SuperMeta,
    UltraMeta,
}

impl From<TierArg> for GoalTier {
    fn from(t: TierArg) -> Self {
        match t {
            TierArg::Meta => GoalTier::Meta,
            TierArg::SuperMeta => GoalTier::SuperMeta,
            TierArg::UltraMeta => GoalTier::UltraMeta,
        }
    }
}

fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM, got {s:?}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        // No calendar here, so a bad zone in the config can still be inspected.
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                config::show_config(&mut std::io::stdout().lock(), &config::config_path()?, &cfg)?
            }
        },

        Command::Goal { command } => match command {
            GoalCommand::Set { period, tier, digits } => {
                let mut store = state::FileGoalStore::open(state::goals_path()?)?;
                let mut board = GoalBoard::load(&store, period.into())?;
                let tier: GoalTier = tier.into();
                let shown = board.edit(tier, &digits).to_string();
                board.save(&mut store, tier)?;
                println!("{} = {}", tally_core::goal_key(board.period(), tier), shown);
            }
            GoalCommand::Show { period } => {
                let calendar = cfg.calendar()?;
                let period: PeriodKind = period.into();
                let store = state::FileGoalStore::open(state::goals_path()?)?;
                let board = GoalBoard::load(&store, period)?;
                let source = Source::from_config(&cfg, cli.input.as_deref())?;

                let view = match period {
                    PeriodKind::Daily => View::Today,
                    PeriodKind::Monthly => View::Monthly,
                    PeriodKind::Yearly => View::Yearly,
                };
                let window = period.window_containing(calendar.today());
                let report = ReportContext::new(calendar)
                    .fetch(&source, view, window)
                    .await
                    .context("fetch sales for the period")?;
                let goals = board.progress(report.totals.net_amount, &window, calendar.now());

                if cli.format == Format::Table {
                    println!(
                        "{:?} goals, {} .. {}: {} so far\n",
                        period,
                        window.start(),
                        window.end(),
                        report.totals.net_amount
                    );
                }
                render::render_goals(&mut std::io::stdout().lock(), &goals, cli.format)?;
            }
        },

        Command::Watch { view } => {
            let view: View = view.into();
            let source = Arc::new(Source::from_config(&cfg, cli.input.as_deref())?);
            let ctx = Arc::new(report_context(cfg.calendar()?, view)?);
            let format = cli.format;

            let on_update = move |state: &ReportState<Report>, applied: Applied| {
                let mut out = std::io::stdout().lock();
                if let Err(e) = render::render_update(&mut out, state, applied, format) {
                    tracing::warn!(error = %e, "cannot write report");
                }
            };
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };

            watch::watch(
                source,
                ctx,
                view,
                cfg.refresh.interval(view),
                on_update,
                shutdown,
            )
            .await;
        }

        Command::Today { date } => {
            let calendar = cfg.calendar()?;
            let today = calendar.today();
            let window = TimeWindow::single_day(date.unwrap_or(today));
            show(&cfg, &cli.input, calendar, View::Today, window, cli.format).await?;
        }

        Command::Daily { start, end } => {
            let calendar = cfg.calendar()?;
            let today = calendar.today();
            let default = View::Daily.default_window(today);
            let window = TimeWindow::new(
                start.unwrap_or(default.start()),
                end.unwrap_or(default.end()),
            )?;
            show(&cfg, &cli.input, calendar, View::Daily, window, cli.format).await?;
        }

        Command::Monthly { month } => {
            let calendar = cfg.calendar()?;
            let today = calendar.today();
            let window = TimeWindow::month_of(month.unwrap_or(today));
            show(&cfg, &cli.input, calendar, View::Monthly, window, cli.format).await?;
        }

        Command::Yearly { year } => {
            let calendar = cfg.calendar()?;
            let year = year.unwrap_or(calendar.today().year());
            let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                bail!("year out of range: {year}");
            };
            let window = TimeWindow::year_of(first);
            show(&cfg, &cli.input, calendar, View::Yearly, window, cli.format).await?;
        }
    }

    Ok(())
}

/// Context for `view`, with the goal board it tracks loaded from disk.
fn report_context(calendar: tally_core::Calendar, view: View) -> Result<ReportContext> {
    let ctx = ReportContext::new(calendar);
    let Some(period) = view.goal_period() else {
        return Ok(ctx);
    };
    let store = state::FileGoalStore::open(state::goals_path()?)?;
    Ok(ctx.with_goals(GoalBoard::load(&store, period)?))
}

async fn show(
    cfg: &config::Config,
    input: &Option<PathBuf>,
    calendar: tally_core::Calendar,
    view: View,
    window: TimeWindow,
    format: Format,
) -> Result<()> {
    let source = Source::from_config(cfg, input.as_deref())?;
    let ctx = report_context(calendar, view)?;
    let report = ctx
        .fetch(&source, view, window)
        .await
        .with_context(|| format!("fetch {}", view.request_name()))?;
    if report.buckets.iter().all(|b| b.is_empty()) {
        tracing::info!(view = view.request_name(), "no sales in window");
    }
    render::render_report(&mut std::io::stdout().lock(), &report, format)
}
