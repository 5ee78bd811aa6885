use samarth::{AnswerResult, EngineConfig, QaEngine};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXAMPLE_QUESTIONS: [&str; 3] = [
    "Compare the average annual rainfall in Karnataka and Maharashtra for the last 3 years",
    "List top 3 crops produced in each state for the last 5 years",
    "Analyze trend of Rice and correlate with temperature in Karnataka",
];

#[derive(Parser)]
#[command(name = "samarth")]
#[command(about = "Agri x climate question answering over state rainfall, crop and temperature data")]
#[command(version)]
struct Args {
    /// Directory holding the three CSV datasets (overrides config and SAMARTH_DATA_DIR)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question in plain English
        question: String,

        /// Print the full answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the states known to the datasets
    States,
    /// List the crop names recognized in questions
    Crops,
    /// Read questions from stdin until EOF or "exit"
    Interactive,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(args.config, args.data_dir)?;

    info!("Loading datasets from {}", config.data_dir.display());
    let engine = QaEngine::load(config)
        .map_err(|e| anyhow::anyhow!("Failed to load datasets: {}", e))?;

    match args.command {
        Commands::Ask { question, json } => ask(&engine, &question, json),
        Commands::States => {
            for state in engine.all_states() {
                println!("- {}", state);
            }
            Ok(())
        }
        Commands::Crops => {
            for crop in engine.extractor().crop_vocabulary() {
                println!("- {}", crop);
            }
            Ok(())
        }
        Commands::Interactive => interactive(&engine),
    }
}

fn resolve_config(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match config_path {
        Some(path) => {
            let mut config = EngineConfig::load(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;
            config.apply_env();
            config
        }
        None => EngineConfig::from_env(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn ask(engine: &QaEngine, question: &str, json: bool) -> Result<()> {
    let answer = engine.answer_question(question);
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

fn interactive(engine: &QaEngine) -> Result<()> {
    println!("Ask questions combining agriculture and climate data. Examples:");
    for example in EXAMPLE_QUESTIONS {
        println!("  - {}", example);
    }
    println!("Type 'exit' to quit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        print_answer(&engine.answer_question(question));
        println!();
    }
    Ok(())
}

fn print_answer(answer: &AnswerResult) {
    println!("\n{}", "=".repeat(80));
    println!(" Answer");
    println!("{}", "=".repeat(80));
    println!("{}", answer.summary);

    if let Some(table) = &answer.table {
        println!("\n Result Table ({} rows)", table.len());
        println!("{}", "-".repeat(80));
        print!("{}", table);
    }

    if !answer.provenance.is_empty() {
        println!("\n Data Sources / Provenance");
        println!("{}", "-".repeat(80));
        for source in &answer.provenance {
            println!("- {} ({})", source.title, source.url);
            println!("  rows used: {}", source.rows_used);
        }
    }
}
