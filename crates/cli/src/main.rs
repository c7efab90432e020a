use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shelf_db::{
    BookFilter, BookUpdate, BorrowRequest, FieldProblem, LibraryStore, NewBook, SortKey,
};
use shelf_kernel::settings::Settings;

/// Manage the shelf book catalog from the command line
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Catalog file to use instead of `storage.data_file`
    #[arg(long, global = true, value_name = "PATH")]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List books, optionally filtered and sorted
    List {
        #[arg(long, default_value = "all")]
        filter: BookFilter,
        #[arg(long, default_value = "title")]
        sort: SortKey,
    },
    /// Show a single book
    Show { id: String },
    /// Add a book to the catalog
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, allow_negative_numbers = true)]
        year: i32,
        #[arg(long)]
        genre: String,
    },
    /// Change bibliographic fields of a book
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        year: Option<i32>,
        #[arg(long)]
        genre: Option<String>,
    },
    /// Remove a book
    Delete { id: String },
    /// Lend a book
    Borrow {
        id: String,
        #[arg(long)]
        borrower: String,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Mark a book as returned
    Return { id: String },
    /// Borrowed books due within the horizon
    Expiring {
        /// Defaults to `lending.expiring_horizon_days`
        #[arg(long)]
        days: Option<u32>,
    },
    /// Catalog statistics
    Stats,
    /// Run the HTTP server
    Serve,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load().with_context(|| "failed to load shelf settings")?;
    if let Some(path) = cli.data_file {
        settings.storage.data_file = path;
    }

    if let Command::Serve = cli.command {
        return serve(settings);
    }

    // stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    log_bootstrap(&settings);

    let store = shelf_app::open_store(&settings);
    execute(&store, cli.command)
}

fn serve(settings: Settings) -> anyhow::Result<()> {
    shelf_telemetry::init(&settings.telemetry)?;
    log_bootstrap(&settings);
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(shelf_app::run(settings))
}

fn log_bootstrap(settings: &Settings) {
    tracing::info!(
        env = ?settings.environment,
        data_file = %settings.storage.data_file.display(),
        "shelf CLI bootstrap"
    );
}

fn execute(store: &LibraryStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { filter, sort } => print_json(&store.list_books(filter, sort)),
        Command::Show { id } => match store.book_by_id(&id) {
            Some(book) => print_json(&book),
            None => bail!("book {id} not found"),
        },
        Command::Add {
            title,
            author,
            year,
            genre,
        } => {
            let new = NewBook {
                title,
                author,
                year,
                genre,
            };
            reject_problems(&new.validate())?;
            print_json(&store.add_book(new)?)
        }
        Command::Update {
            id,
            title,
            author,
            year,
            genre,
        } => {
            let update = BookUpdate {
                title,
                author,
                year,
                genre,
            };
            if update.is_empty() {
                bail!("no fields to update");
            }
            reject_problems(&update.validate())?;
            print_json(&store.update_book(&id, update)?)
        }
        Command::Delete { id } => {
            store.delete_book(&id)?;
            print_json(&serde_json::json!({ "id": id, "deleted": true }))
        }
        Command::Borrow {
            id,
            borrower,
            due,
            email,
            phone,
        } => {
            let request = BorrowRequest::new(borrower, due).with_contact(email, phone);
            reject_problems(&request.validate())?;
            print_json(&store.borrow_book(&id, request)?)
        }
        Command::Return { id } => print_json(&store.return_book(&id)?),
        Command::Expiring { days } => {
            let horizon = days.map_or(store.policy().expiring_horizon_days, i64::from);
            print_json(&store.expiring_books(horizon))
        }
        Command::Stats => print_json(&store.statistics()),
        Command::Serve => bail!("serve is not a catalog command"),
    }
}

fn reject_problems(problems: &[FieldProblem]) -> anyhow::Result<()> {
    if problems.is_empty() {
        return Ok(());
    }
    let described: Vec<String> = problems
        .iter()
        .map(|p| format!("{}: {}", p.field, p.error))
        .collect();
    bail!("invalid input ({})", described.join(", "))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
