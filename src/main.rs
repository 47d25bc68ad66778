use budget_ledger::application::background::BackgroundTasks;
use budget_ledger::application::context::Context;
use budget_ledger::application::import::BulkImportEngine;
use budget_ledger::application::ledger::Ledger;
use budget_ledger::application::report::{CachedReports, ReportAggregator};
use budget_ledger::domain::budget::Budget;
use budget_ledger::domain::ports::{SharedBudgetStore, SharedCache, SharedTransactionStore};
use budget_ledger::domain::report::DateRange;
use budget_ledger::domain::validation::ValidationMode;
use budget_ledger::infrastructure::in_memory::{
    InMemoryBudgetStore, InMemoryCache, InMemoryTransactionStore,
};
use budget_ledger::interfaces::csv::transaction_reader::TransactionReader;
use budget_ledger::interfaces::csv::writer::LedgerWriter;
use budget_ledger::interfaces::json;
use budget_ledger::settings::Settings;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Settings file (TOML). Defaults to ./ledger.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a transactions CSV through the worker pool
    Import {
        /// Transactions CSV (category,amount,description,timestamp)
        input: PathBuf,

        /// JSON array of budgets to apply before importing
        #[arg(long)]
        budgets: Option<PathBuf>,

        /// Number of concurrent workers
        #[arg(long)]
        workers: Option<usize>,

        /// Abort dispatching after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Require positive amounts and short category names
        #[arg(long)]
        strict: bool,
    },
    /// Print category totals for an inclusive date range
    Report {
        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        /// Transactions CSV to import before summarizing
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON array of budgets to apply before importing
        #[arg(long)]
        budgets: Option<PathBuf>,
    },
    /// Manage budgets
    Budget {
        #[command(subcommand)]
        action: BudgetCommand,
    },
    /// Print every committed transaction
    List,
}

#[derive(Subcommand)]
enum BudgetCommand {
    /// Create or replace the budget of a category
    Set {
        category: String,
        #[arg(allow_negative_numbers = true)]
        limit: Decimal,
        #[arg(long)]
        period: Option<String>,
    },
    /// Print all budgets
    List,
}

struct Stores {
    budgets: SharedBudgetStore,
    transactions: SharedTransactionStore,
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        let store = budget_ledger::infrastructure::rocksdb::RocksDBStore::open(db_path)
            .into_diagnostic()?;
        return Ok(Stores {
            budgets: Arc::new(store.clone()),
            transactions: Arc::new(store),
        });
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        tracing::warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    Ok(Stores {
        budgets: Arc::new(InMemoryBudgetStore::new()),
        transactions: Arc::new(InMemoryTransactionStore::new()),
    })
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("budget_ledger={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

/// Context for one command: cancelled on Ctrl-C, bounded by `timeout`.
fn command_context(timeout: Option<Duration>) -> Context {
    let ctx = match timeout {
        Some(timeout) => Context::with_timeout(timeout),
        None => Context::new(),
    };
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });
    ctx
}

async fn apply_budgets(ledger: &Ledger, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let budgets = json::read_budgets(file).into_diagnostic()?;
    for budget in budgets {
        ledger.set_budget(budget).await.into_diagnostic()?;
    }
    Ok(())
}

async fn import_file(
    engine: &BulkImportEngine,
    ctx: &Context,
    input: &Path,
    workers: usize,
) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let transactions = TransactionReader::new(file).read_valid();

    match engine.import(ctx, transactions, workers).await {
        Ok(result) => json::write_import_result(io::stdout().lock(), &result).into_diagnostic(),
        Err(partial) => {
            if partial.cause.is_interrupt() {
                tracing::warn!(total = partial.total, "import interrupted, partial result follows");
            } else {
                tracing::error!(total = partial.total, "import lost outcomes");
            }
            json::write_import_result(io::stdout().lock(), &partial.result).into_diagnostic()?;
            Err(partial).into_diagnostic()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;
    init_tracing(&settings.log_level);

    if let Command::Import { strict: true, .. } = cli.command {
        settings.validation = ValidationMode::Strict;
    }

    let stores = open_stores(cli.db_path)?;
    let background = BackgroundTasks::new();
    let cache: SharedCache = Arc::new(InMemoryCache::new());
    let ledger = Arc::new(
        Ledger::new(stores.budgets, Arc::clone(&stores.transactions))
            .with_cache(Arc::clone(&cache), settings.cache_ttl())
            .with_background(background.clone())
            .with_validation(settings.validation),
    );
    let engine = BulkImportEngine::new(Arc::clone(&ledger)).with_default_workers(settings.workers);

    let outcome = match cli.command {
        Command::Import {
            input,
            budgets,
            workers,
            timeout_ms,
            ..
        } => {
            if let Some(path) = budgets {
                apply_budgets(&ledger, &path).await?;
            }
            let timeout = timeout_ms.map(Duration::from_millis).or(settings.import_timeout());
            let ctx = command_context(timeout);
            import_file(&engine, &ctx, &input, workers.unwrap_or(settings.workers)).await
        }
        Command::Report {
            from,
            to,
            input,
            budgets,
        } => {
            let range = DateRange::new(from, to).into_diagnostic()?;
            if let Some(path) = budgets {
                apply_budgets(&ledger, &path).await?;
            }
            let ctx = command_context(None);
            if let Some(input) = input {
                let file = File::open(&input).into_diagnostic()?;
                let transactions = TransactionReader::new(file).read_valid();
                if let Err(partial) = engine.import(&ctx, transactions, settings.workers).await {
                    return Err(partial).into_diagnostic();
                }
            }

            let reports = CachedReports::new(
                ReportAggregator::new(stores.transactions).with_heartbeat(settings.heartbeat()),
                cache,
                settings.cache_ttl(),
                background.clone(),
            );
            let summary = reports.summarize(&ctx, range).await.into_diagnostic()?;
            LedgerWriter::new(io::stdout().lock())
                .write_summary(&summary)
                .into_diagnostic()
        }
        Command::Budget { action } => match action {
            BudgetCommand::Set {
                category,
                limit,
                period,
            } => {
                let budget = Budget {
                    category,
                    limit,
                    period,
                };
                ledger.set_budget(budget).await.into_diagnostic()
            }
            BudgetCommand::List => {
                let budgets = ledger.budgets().await.into_diagnostic()?;
                LedgerWriter::new(io::stdout().lock())
                    .write_budgets(&budgets)
                    .into_diagnostic()
            }
        },
        Command::List => {
            let transactions = ledger.transactions().await.into_diagnostic()?;
            LedgerWriter::new(io::stdout().lock())
                .write_transactions(&transactions)
                .into_diagnostic()
        }
    };

    background.drain().await;
    outcome
}
