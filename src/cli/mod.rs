use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::SettlementService;
use crate::domain::{
    format_cents, parse_cents, CalculationRecord, Expense, HistoryEntry, HistoryRecord,
    Settlement, SimpleRecord,
};

/// Divvy - shared expense splitter
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Split shared expenses and settle who owes whom")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "divvy.db", env = "DIVVY_DATABASE", global = true)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Compute balances and the transfers that settle them
    Calculate {
        /// Participant names (repeat or separate with commas)
        #[arg(short, long = "participant", value_delimiter = ',', required = true)]
        participants: Vec<String>,

        /// Expense as DESCRIPTION:AMOUNT:PAYER:SHARER,SHARER (description may be empty)
        #[arg(short, long = "expense")]
        expenses: Vec<String>,

        /// CSV file with columns description,amount,payer,shared_by
        #[arg(short, long)]
        file: Option<String>,

        /// Save the calculation to history
        #[arg(long)]
        save: bool,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Calculation history commands
    #[command(subcommand)]
    History(HistoryCommands),

    /// Export the calculation history as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import calculation history from a JSON export
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip entries that are already in history
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved calculations
    List {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show a saved calculation
    Show {
        /// History entry ID
        id: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Delete a saved calculation
    Delete {
        /// History entry ID
        id: String,
    },

    /// Delete all saved calculations
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "divvy=debug" } else { "divvy=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                SettlementService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Calculate {
                participants,
                expenses,
                file,
                save,
                format,
            } => {
                let mut all_expenses = expenses
                    .iter()
                    .map(|arg| parse_expense_arg(arg))
                    .collect::<Result<Vec<_>>>()?;

                if let Some(path) = file {
                    all_expenses.extend(read_expense_file(&path)?);
                }

                let settlement = if save {
                    let service = SettlementService::connect(&self.database).await?;
                    let saved = service
                        .calculate_and_save(&participants, &all_expenses, Utc::now())
                        .await?;
                    eprintln!("Saved calculation: {}", saved.entry.id);
                    saved.settlement
                } else {
                    SettlementService::calculate(&participants, &all_expenses)?
                };

                print_settlement(&settlement, &format)?;
            }

            Commands::History(history_cmd) => {
                let service = SettlementService::connect(&self.database).await?;
                run_history_command(&service, history_cmd).await?;
            }

            Commands::Export { output } => {
                let service = SettlementService::connect(&self.database).await?;
                run_export_command(&service, output.as_deref()).await?;
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = SettlementService::connect(&self.database).await?;
                run_import_command(&service, input.as_deref(), dry_run, skip_duplicates).await?;
            }
        }

        Ok(())
    }
}

/// Parse `DESCRIPTION:AMOUNT:PAYER:SHARER,SHARER`.
pub fn parse_expense_arg(arg: &str) -> Result<Expense> {
    let parts: Vec<&str> = arg.splitn(4, ':').collect();
    let [description, amount, payer, shared_by] = parts[..] else {
        anyhow::bail!(
            "Invalid expense '{}'. Use DESCRIPTION:AMOUNT:PAYER:SHARER,SHARER",
            arg
        );
    };

    let amount = parse_cents(amount)
        .with_context(|| format!("Invalid amount in expense '{}'. Use '50.00' or '50'", arg))?;

    Ok(Expense::new(description, amount, payer, shared_by.split(',')))
}

fn read_expense_file(path: &str) -> Result<Vec<Expense>> {
    use crate::io::read_expenses_csv;
    use std::fs::File;

    let file = File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
    let import = read_expenses_csv(file)?;

    for error in &import.errors {
        eprintln!(
            "  Line {}: {}{}",
            error.line,
            error
                .field
                .as_ref()
                .map(|f| format!("{}: ", f))
                .unwrap_or_default(),
            error.error
        );
    }
    if !import.errors.is_empty() {
        anyhow::bail!("{} line(s) of {} could not be read", import.errors.len(), path);
    }

    Ok(import.expenses)
}

fn print_settlement(settlement: &Settlement, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(settlement)?);
        }
        "csv" => {
            crate::io::write_totals_csv(settlement, std::io::stdout())?;
            println!();
            crate::io::write_settlement_csv(settlement, std::io::stdout())?;
        }
        "table" => {
            print_totals_table(settlement);
            println!();
            print_transfers(settlement);
        }
        _ => {
            anyhow::bail!("Invalid format '{}'. Valid formats: table, json, csv", format);
        }
    }
    Ok(())
}

fn print_totals_table(settlement: &Settlement) {
    println!("{:<20} {:>12}", "NAME", "NET");
    println!("{}", "-".repeat(33));
    for balance in &settlement.totals {
        println!(
            "{:<20} {:>12}",
            truncate(&balance.name, 20),
            format_cents(balance.net)
        );
    }
    println!("{}", "-".repeat(33));
    println!(
        "{:<20} {:>12}",
        "TOTAL SPENT",
        format_cents(settlement.total_spent)
    );
}

fn print_transfers(settlement: &Settlement) {
    if settlement.transfers.is_empty() {
        println!("Everyone is settled up.");
        return;
    }

    println!("Settlement:");
    for transfer in &settlement.transfers {
        println!(
            "  {} pays {} {}",
            transfer.from,
            transfer.to,
            format_cents(transfer.amount)
        );
    }
}

async fn run_history_command(service: &SettlementService, cmd: HistoryCommands) -> Result<()> {
    match cmd {
        HistoryCommands::List { format } => {
            let entries = service.list_history().await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
                _ => {
                    if entries.is_empty() {
                        println!("No saved calculations.");
                        return Ok(());
                    }
                    println!(
                        "{:<36}  {:<19}  {:<8} {:>12}  {}",
                        "ID", "DATE", "TYPE", "TOTAL", "PEOPLE"
                    );
                    println!("{}", "-".repeat(100));
                    for entry in &entries {
                        println!(
                            "{:<36}  {:<19}  {:<8} {:>12}  {}",
                            entry.id,
                            entry.record.timestamp().format("%Y-%m-%d %H:%M:%S"),
                            entry.record.kind(),
                            format_cents(entry.record.total_spent()),
                            truncate(&entry.record.people().join(", "), 40)
                        );
                    }
                }
            }
        }

        HistoryCommands::Show { id, format } => {
            let entry = service.get_history(parse_entry_id(&id)?).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&entry.record)?);
                }
                _ => print_history_entry(&entry),
            }
        }

        HistoryCommands::Delete { id } => {
            let entry = service.delete_history(parse_entry_id(&id)?).await?;
            println!(
                "Deleted calculation from {}",
                entry.record.timestamp().format("%Y-%m-%d %H:%M:%S")
            );
        }

        HistoryCommands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear history without --yes");
            }
            let removed = service.clear_history().await?;
            println!("Deleted {} calculation(s)", removed);
        }
    }

    Ok(())
}

fn parse_entry_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid history entry ID format (expected UUID)")
}

fn print_history_entry(entry: &HistoryEntry) {
    println!("Calculation: {}", entry.id);
    println!(
        "  Date:    {}",
        entry.record.timestamp().format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Type:    {}", entry.record.kind());
    println!();

    match &entry.record {
        HistoryRecord::Advanced(record) => print_advanced_record(record),
        HistoryRecord::Simple(record) => print_simple_record(record),
    }
}

fn print_advanced_record(record: &CalculationRecord) {
    println!("Participants: {}", record.participants.join(", "));
    println!();
    println!(
        "{:<24} {:>12} {:<12} {}",
        "EXPENSE", "AMOUNT", "PAID BY", "SHARED BY"
    );
    println!("{}", "-".repeat(72));
    for expense in &record.expenses {
        println!(
            "{:<24} {:>12} {:<12} {}",
            truncate(&expense.description, 24),
            format_cents(expense.amount),
            truncate(&expense.payer, 12),
            expense.shared_by.join(", ")
        );
    }
    println!();

    // Records are immutable, so render exactly what was saved.
    let settlement = Settlement {
        totals: record.totals.clone(),
        transfers: record.settlement.clone(),
        total_spent: record.total_spent,
    };
    print_totals_table(&settlement);
    println!();
    print_transfers(&settlement);
}

fn print_simple_record(record: &SimpleRecord) {
    println!("Names:   {}", record.names.join(", "));
    println!("Alcohol: {:>12}", format_cents(record.alcohol));
    println!("Food:    {:>12}", format_cents(record.food));
    println!("Total:   {:>12}", format_cents(record.total()));
    match record.share_per_person() {
        Some(share) => println!("Each:    {:>12}", format_cents(share)),
        None => println!("Each:    {:>12}", "-"),
    }
}

async fn run_export_command(service: &SettlementService, output: Option<&str>) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let snapshot = exporter.export_history_json(writer).await?;
    if output.is_some() {
        eprintln!("Exported {} calculation(s)", snapshot.entries.len());
    }

    Ok(())
}

async fn run_import_command(
    service: &SettlementService,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };
    let result = importer.import_history_json(reader, options).await?;

    if dry_run {
        println!("Validation successful");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!("  Entry {}: {}", error.line, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
