use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use member_payments::application::service::PaymentsService;
use member_payments::domain::payment::{PaymentCategory, PaymentId, PaymentRecord};
use member_payments::domain::ports::PaymentRepositoryBox;
use member_payments::domain::validator::{CreatePayment, PaymentPolicy, PaymentValidator};
use member_payments::infrastructure::in_memory::InMemoryPaymentRepository;
use member_payments::interfaces::csv::payment_reader::PaymentReader;
use member_payments::interfaces::csv::payment_writer::PaymentWriter;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Largest amount accepted for a single payment.
    #[arg(long, global = true, default_value_t = PaymentPolicy::DEFAULT_MAX_AMOUNT)]
    max_amount: Decimal,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new unpaid payment
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: PaymentCategory,
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,
        /// DNI of the member who owes the payment
        #[arg(long = "user")]
        user_dni: String,
    },
    /// Mark a payment as paid
    Pay {
        id: PaymentId,
        /// Settlement time, `YYYY-MM-DDTHH:MM[:SS]`
        #[arg(long, value_parser = parse_timestamp)]
        at: NaiveDateTime,
    },
    /// Cancel an unpaid payment
    Cancel { id: PaymentId },
    /// Show one payment
    Show { id: PaymentId },
    /// List the payments of a member
    List {
        #[arg(long = "user")]
        user_dni: String,
    },
    /// List every member's payments, grouped by member
    Report,
    /// Create one payment per row of a CSV file
    Import { input: PathBuf },
}

impl Command {
    /// Name of a command that works on payments stored by an earlier run.
    fn reads_stored_payments(&self) -> Option<&'static str> {
        match self {
            Command::Pay { .. } => Some("pay"),
            Command::Cancel { .. } => Some("cancel"),
            Command::Show { .. } => Some("show"),
            Command::List { .. } => Some("list"),
            Command::Report => Some("report"),
            Command::Create { .. } | Command::Import { .. } => None,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
const STORAGE_HELP: &str = "pass --db-path to keep payments between runs";
#[cfg(not(feature = "storage-rocksdb"))]
const STORAGE_HELP: &str =
    "build with the 'storage-rocksdb' feature and pass --db-path to keep payments between runs";

fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
}

/// Opens the payment store. The flag tells whether payments outlive the
/// process.
fn open_repository(db_path: Option<PathBuf>) -> Result<(PaymentRepositoryBox, bool)> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            use member_payments::infrastructure::rocksdb::RocksDBPaymentRepository;
            let store = RocksDBPaymentRepository::open(path).into_diagnostic()?;
            Ok((Box::new(store), true))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok((Box::new(InMemoryPaymentRepository::new()), false))
        }
        None => Ok((Box::new(InMemoryPaymentRepository::new()), false)),
    }
}

fn print(records: &[PaymentRecord]) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(records).into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (repository, persistent) = open_repository(cli.db_path)?;
    if let Some(name) = cli.command.reads_stored_payments()
        && !persistent
    {
        return Err(miette!(
            help = STORAGE_HELP,
            "`{name}` needs persistent storage, an in-memory run starts with no payments"
        ));
    }

    let validator = PaymentValidator::new(PaymentPolicy {
        max_amount: cli.max_amount,
    });
    let service = PaymentsService::new(repository, validator);

    match cli.command {
        Command::Create {
            title,
            description,
            category,
            amount,
            user_dni,
        } => {
            let request = CreatePayment {
                title: Some(title),
                description: Some(description),
                category: Some(category),
                amount: Some(amount),
                user_dni: Some(user_dni),
            };
            let record = service.create_payment(request).await.into_diagnostic()?;
            print(&[record])
        }
        Command::Pay { id, at } => {
            let record = service.mark_paid(id, Some(at)).await.into_diagnostic()?;
            print(&[record])
        }
        Command::Cancel { id } => {
            let record = service.cancel_payment(id).await.into_diagnostic()?;
            print(&[record])
        }
        Command::Show { id } => {
            let record = service.find_payment(id).await.into_diagnostic()?;
            print(&[record])
        }
        Command::List { user_dni } => {
            let records = service
                .get_user_payments(Some(&user_dni))
                .await
                .into_diagnostic()?;
            print(&records)
        }
        Command::Report => {
            let by_user = service.get_all_users_with_payments().await.into_diagnostic()?;
            let records: Vec<PaymentRecord> = by_user.into_values().flatten().collect();
            print(&records)
        }
        Command::Import { input } => {
            let file = File::open(input).into_diagnostic()?;
            let mut created = Vec::new();
            // Row 1 is the header.
            for (row, request) in (2..).zip(PaymentReader::new(file).requests()) {
                let result = match request {
                    Ok(request) => service.create_payment(request).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(record) => created.push(record),
                    Err(e) => warn!(row, reason = %e, "Skipping payment row"),
                }
            }
            print(&created)
        }
    }
}
