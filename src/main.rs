use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::debug;

use glucose_ledger::blockchain::Blockchain;
use glucose_ledger::config::Config;
use glucose_ledger::exam::ExamContract;
use glucose_ledger::exam::collect::{confirm, read_glucose};
use glucose_ledger::storage::LedgerStore;
use glucose_ledger::{Ledger, LedgerError, Result, report};

#[derive(Parser)]
#[command(
    name = "glucose-ledger",
    version,
    about = "Tamper-evident ledger of glucose readings"
)]
struct Cli {
    /// Ledger file (default: $LEDGER_PATH or ./blockchain.json)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Proof-of-work difficulty (default: $LEDGER_DIFFICULTY or 2)
    #[arg(long)]
    difficulty: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a single glucose reading
    Add {
        #[arg(allow_negative_numbers = true)]
        glucose: f64,
    },
    /// Prompt for readings until told to stop (default)
    Interactive,
    /// Print the stored ledger
    Show,
    /// Check the stored ledger's integrity
    Validate,
}

fn main() {
    let _ = dotenv();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(path) = cli.ledger {
        config.ledger_path = path;
    }
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }
    let config = config.sanitized();
    debug!("CONFIG - {:?}", config);

    let result = match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Add { glucose } => cmd_add(&config, glucose),
        Commands::Interactive => cmd_interactive(&config),
        Commands::Show => cmd_show(&config),
        Commands::Validate => cmd_validate(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        let code = match e {
            LedgerError::Integrity(_) => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

fn cmd_add(config: &Config, glucose: f64) -> Result<()> {
    let mut ledger = Ledger::open(config)?;
    let block = ledger.record_reading(&ExamContract::default(), glucose)?;
    println!(
        "Ledger valid and saved: block #{} (hash={}, nonce={})",
        block.index, block.digest, block.nonce
    );
    Ok(())
}

fn cmd_interactive(config: &Config) -> Result<()> {
    let mut ledger = Ledger::open(config)?;
    let contract = ExamContract::default();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    loop {
        let Some(glucose) = read_glucose(&mut input, &mut output)? else {
            writeln!(output)?;
            break;
        };

        match ledger.record_reading(&contract, glucose) {
            Ok(_) => writeln!(output, "Ledger valid and saved successfully!")?,
            Err(e @ LedgerError::InvalidReading(_)) => {
                writeln!(output, "Error: {e}")?;
                continue;
            }
            Err(LedgerError::Integrity(violation)) => {
                writeln!(output, "Ledger is invalid! ({violation})")?
            }
            Err(e) => return Err(e),
        }

        if !confirm(&mut input, &mut output, "Add more blocks?")? {
            writeln!(output, "Exiting...")?;
            break;
        }
    }

    report::render(ledger.store(), &mut output)?;
    Ok(())
}

fn cmd_show(config: &Config) -> Result<()> {
    let store = LedgerStore::new(&config.ledger_path);
    let mut out = io::stdout().lock();
    report::render(&store, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_validate(config: &Config) -> Result<()> {
    let store = LedgerStore::new(&config.ledger_path);
    let blocks = match store.load() {
        Ok(blocks) => blocks,
        Err(LedgerError::LedgerMissing(path)) => {
            println!("No ledger at {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let chain = Blockchain::from_blocks(blocks, config.difficulty);

    println!("{} blocks, difficulty {}", chain.len(), chain.difficulty());
    println!(
        "hash and linkage check: {}",
        if chain.validate() { "ok" } else { "FAILED" }
    );
    match chain.audit() {
        Ok(()) => {
            println!("strict audit: ok");
            Ok(())
        }
        Err(violation) => {
            println!("strict audit: {violation}");
            Err(LedgerError::Integrity(violation))
        }
    }
}
