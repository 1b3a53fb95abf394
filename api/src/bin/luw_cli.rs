//! Runs the same benchmarks as the HTTP routes from a terminal, optionally
//! several rounds in a row, and prints an aggregate report.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use api::AppState;
use api::config::{LogSettings, Settings};
use luw_core::generator::FakeDataGenerator;
use luw_core::records::EntityKind;
use luw_core::report::{RoundSummary, print_report};
use luw_core::runner::{BenchmarkResult, Operation};

#[derive(Parser, Debug)]
#[command(name = "luw-cli", about = "Durable-write benchmark: SQL vs NoSQL")]
struct Cli {
    /// How many times to repeat a benchmark command.
    #[arg(
        long,
        default_value_t = 1,
        global = true,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    rounds: u32,

    /// Seed for generated data; random when omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert COUNT fake users into both stores.
    Write { count: usize },
    /// Read up to COUNT users from both stores.
    Read { count: usize },
    /// Apply COUNT random stock decrements.
    Update { count: usize },
    /// Make sure both stores hold at least SIZE products.
    Inventory { size: usize },
    /// Clear one entity kind, or everything.
    Reset { kind: Option<String> },
}

fn generator(seed: Option<u64>) -> FakeDataGenerator {
    match seed {
        Some(seed) => FakeDataGenerator::seeded(seed),
        None => FakeDataGenerator::from_entropy(),
    }
}

fn run_rounds(
    state: &AppState,
    cli: &Cli,
    operation: Operation,
    count: usize,
) -> anyhow::Result<()> {
    let mut generator = generator(cli.seed);
    let mut summary: Option<RoundSummary> = None;

    for round in 1..=cli.rounds {
        let mut runner = state.runner()?;
        let result: BenchmarkResult = match operation {
            Operation::Insert => runner.insert_users(generator.users(count)?)?,
            Operation::Read => runner.read_users(count)?,
            Operation::Update => runner.update_random_stock(count, &mut generator)?,
        };
        info!(
            "Round {}: {}={:.4}s {}={:.4}s",
            round, result.backend_a, result.elapsed_a, result.backend_b, result.elapsed_b
        );

        summary
            .get_or_insert_with(|| {
                RoundSummary::new(operation, count, result.backend_a, result.backend_b)
            })
            .add(&result);
    }

    if let Some(summary) = summary {
        print_report(&summary);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to read .env: {err}");
        }
    }

    let cli = Cli::parse();
    let logging = LogSettings::from_env();
    luw_core::initialize_logger(logging.level, None)?;

    let settings = Settings::from_env();
    let state = AppState::new(&settings).context("invalid backend settings")?;

    match &cli.command {
        Command::Write { count } => run_rounds(&state, &cli, Operation::Insert, *count)?,
        Command::Read { count } => run_rounds(&state, &cli, Operation::Read, *count)?,
        Command::Update { count } => run_rounds(&state, &cli, Operation::Update, *count)?,
        Command::Inventory { size } => {
            let report = state
                .runner()?
                .ensure_inventory(*size, &mut generator(cli.seed))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Reset { kind } => {
            let kinds = match kind {
                Some(kind) => vec![kind.parse::<EntityKind>()?],
                None => EntityKind::ALL.to_vec(),
            };
            let cleared = state.runner()?.reset(&kinds)?;
            println!("{}", serde_json::to_string_pretty(&cleared)?);
        }
    }

    Ok(())
}
