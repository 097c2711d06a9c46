use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tally_core::analytics::DEFAULT_TREND_MONTHS;
use tally_core::{Month, Role};
use tally_finance::{Store, TransactionFilter, admin, advisor, ingest_upload, reports, transactions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod error;
mod server;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Tally personal-finance backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Import a bank CSV for a user (same pipeline as HTTP uploads)
    Import {
        #[arg(long)]
        user: String,

        #[arg(long)]
        csv: PathBuf,
    },

    /// Print dashboard figures for a user
    Dashboard {
        #[arg(long)]
        user: String,
    },

    /// Print the monthly spending trend for a user
    Trend {
        #[arg(long)]
        user: String,

        #[arg(long, default_value_t = DEFAULT_TREND_MONTHS)]
        months: usize,
    },

    /// Show stored insights, or generate a fresh set with --generate
    Insights {
        #[arg(long)]
        user: String,

        #[arg(long)]
        generate: bool,

        #[arg(long, default_value_t = advisor::DEFAULT_INSIGHT_LIMIT)]
        limit: usize,
    },

    /// List a user's transactions
    Transactions {
        #[arg(long)]
        user: String,

        #[arg(long)]
        category: Option<String>,

        /// Inclusive, YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Inclusive, YYYY-MM-DD
        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        offset: Option<usize>,
    },

    /// Store a month summary snapshot (defaults to the current month)
    Summarize {
        #[arg(long)]
        user: String,

        #[arg(long)]
        month: Option<Month>,
    },

    /// Account administration
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List users, newest first
    Users,

    /// Provision an account for an identity-service user id
    AddUser {
        #[arg(long)]
        id: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "user")]
        role: String,
    },

    /// Change a user's role (user|admin)
    SetRole {
        #[arg(long)]
        id: String,

        #[arg(long)]
        role: String,
    },

    /// Delete a user and all of their data
    DeleteUser {
        #[arg(long)]
        id: String,
    },

    /// Platform totals
    Stats,

    /// Recent upload logs
    Logs {
        #[arg(long, default_value_t = admin::DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.tally/config.toml with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Config { command: ConfigCommand::Init } => config::init_config(),
        command => run(command).await,
    }
}

async fn run(command: Command) -> Result<()> {
    let mut cfg = config::load_config()?;
    let store = state::open_store(&cfg)?;
    let today = Utc::now().date_naive();

    match command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            let identity = auth::provider_from_config(&cfg.identity)?;
            let app_state = server::AppState {
                store: Arc::new(store),
                identity,
            };
            server::serve(app_state, &cfg.server).await?;
        }

        Command::Import { user, csv } => {
            require_user(&store, &user)?;
            if !csv.exists() {
                bail!("CSV not found: {} (pass --csv <path>)", csv.display());
            }
            let bytes = std::fs::read(&csv).with_context(|| format!("read {}", csv.display()))?;
            let filename = csv
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let outcome = ingest_upload(&store, &user, &filename, &bytes)
                .with_context(|| format!("importing {}", csv.display()))?;

            println!(
                "Imported {} of {} rows from {} ({:?} layout)",
                outcome.processed,
                outcome.total,
                csv.display(),
                outcome.layout
            );
            for t in outcome.transactions.iter().filter(|t| t.is_anomaly) {
                println!("  unusual: {} {} ${:.2} [{}]", t.date, t.description, t.amount, t.category);
            }
        }

        Command::Dashboard { user } => {
            require_user(&store, &user)?;
            let stats = reports::dashboard(&store, &user, today)?;
            println!("# Dashboard for {} ({})\n", user, Month::of(today));
            println!("Spent this month:   ${:.2}", stats.total_monthly_spending);
            println!("Top category:       {}", stats.highest_spending_category);
            println!("Predicted next:     ${:.2}", stats.predicted_next_month);
            println!("Unusual recently:   {}", stats.anomaly_count);
            if !stats.category_breakdown.is_empty() {
                println!("\n## Breakdown\n");
                for (category, amount) in &stats.category_breakdown {
                    println!("- {category:<14} ${amount:.2}");
                }
            }
        }

        Command::Trend { user, months } => {
            require_user(&store, &user)?;
            for p in reports::monthly_trend(&store, &user, today, months)? {
                println!("{}  ${:.2}", p.month, p.spending);
            }
        }

        Command::Insights { user, generate, limit } => {
            require_user(&store, &user)?;
            if generate {
                for i in advisor::generate(&store, &user, today)? {
                    println!("[{:?}] {}\n", i.kind, i.content);
                }
            } else {
                let stored = advisor::list(&store, &user, limit)?;
                if stored.is_empty() {
                    println!("No insights yet. Run: tally insights --user {user} --generate");
                }
                for i in stored {
                    println!("{} [{:?}] {}\n", i.created_at.format("%Y-%m-%d %H:%M"), i.insight_type, i.content);
                }
            }
        }

        Command::Transactions { user, category, start, end, limit, offset } => {
            require_user(&store, &user)?;
            let filter = TransactionFilter {
                category,
                start_date: start,
                end_date: end,
                limit,
                offset,
            };
            let page = transactions::list(&store, &user, &filter)?;
            println!("{} matching transactions\n", page.total);
            for t in &page.transactions {
                let flag = if t.is_anomaly { " !" } else { "" };
                println!("{}  {:<14} ${:>10.2}  {}{}", t.date, t.category.name(), t.amount, t.description, flag);
            }
        }

        Command::Summarize { user, month } => {
            require_user(&store, &user)?;
            let month = month.unwrap_or_else(|| Month::of(today));
            let summary = reports::save_summary(&store, &user, month)?;
            println!("{} total ${:.2}", summary.month, summary.total_spent);
        }

        Command::Admin { command } => run_admin(&store, command)?,

        Command::Config { command: ConfigCommand::Init } => config::init_config()?,
    }

    Ok(())
}

fn require_user(store: &Store, user_id: &str) -> Result<()> {
    if admin::get_user(store, user_id)?.is_none() {
        bail!("unknown user {user_id}. Run: tally admin add-user --id {user_id} --email <email>");
    }
    Ok(())
}

fn parse_role(s: &str) -> Result<Role> {
    admin::parse_role(s).with_context(|| format!("role '{s}' (expected user or admin)"))
}

fn run_admin(store: &Store, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Users => {
            for u in admin::list_users(store)? {
                println!("{}  {:<6} {}  {}", u.id, format!("{:?}", u.role).to_lowercase(), u.email, u.created_at.format("%Y-%m-%d"));
            }
        }
        AdminCommand::AddUser { id, email, role } => {
            let u = admin::add_user(store, &id, &email, parse_role(&role)?)?;
            println!("Added {} ({})", u.email, u.id);
        }
        AdminCommand::SetRole { id, role } => {
            let u = admin::update_role(store, &id, parse_role(&role)?)?;
            println!("{} is now {:?}", u.email, u.role);
        }
        AdminCommand::DeleteUser { id } => {
            admin::delete_user(store, &id)?;
            println!("Deleted {id}");
        }
        AdminCommand::Stats => {
            let s = admin::stats(store)?;
            println!("Users:               {}", s.total_users);
            println!("Transactions:        {}", s.total_transactions);
            println!("Average transaction: ${:.2}", s.average_spending);
        }
        AdminCommand::Logs { limit } => {
            for entry in admin::upload_logs(store, limit)? {
                let log = &entry.log;
                println!(
                    "{}  {:<8} {:<24} rows={} user={}{}",
                    log.created_at.format("%Y-%m-%d %H:%M"),
                    format!("{:?}", log.status).to_lowercase(),
                    log.filename,
                    log.rows_processed,
                    entry.user_email.as_deref().unwrap_or(&log.user_id),
                    log.error_message.as_deref().map(|m| format!(" error={m}")).unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_transactions_filters() {
        let cli = Cli::try_parse_from([
            "tally", "transactions", "--user", "u-1", "--category", "Food", "--start", "2026-01-01",
        ])
        .unwrap();
        match cli.command {
            Command::Transactions { user, category, start, .. } => {
                assert_eq!(user, "u-1");
                assert_eq!(category.as_deref(), Some("Food"));
                assert_eq!(start, NaiveDate::from_ymd_opt(2026, 1, 1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert!(parse_role("owner").is_err());
    }
}
