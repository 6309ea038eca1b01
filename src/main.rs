//! Terminal front end for the risk profiler.
//!
//! Usage:
//!   risk-profiler                       # interactive questionnaire
//!   risk-profiler run --json            # questionnaire, results as JSON
//!   risk-profiler classify "some text"  # one-shot classification
//!   risk-profiler correct "stabel growth"
//!   risk-profiler vocab

use anyhow::Result;
use clap::{Parser, Subcommand};
use risk_profiler::taxonomy::TaxonomyStore;
use risk_profiler::vocabulary::Vocabulary;
use risk_profiler::config::RuntimeConfig;
use risk_profiler::{Config, Profiler};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "risk-profiler")]
#[command(about = "Risk tolerance and behavioral bias profiling from free-text answers", long_about = None)]
struct Cli {
    /// Embedding provider override (candle, local, openai, hashing)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Similarity threshold override (0.0-1.0)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the questionnaire interactively
    Run {
        /// Print the final profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a single text against both taxonomies
    Classify { text: String },
    /// Print the spelling-corrected form of a text
    Correct { text: String },
    /// Print the exemplar vocabulary
    Vocab,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the questionnaire. Installed
    // before config loading so its warnings are visible.
    risk_profiler::config::load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(RuntimeConfig::load_from_env().log_level.as_str())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(provider) = cli.provider {
        if provider == "hashing" {
            let offline = Config::offline();
            config.system = offline.system;
        } else {
            config.system.embedding_provider = provider.trim().to_lowercase();
        }
    }
    if let Some(threshold) = cli.threshold {
        config.classifier.threshold = threshold;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run { json: false }) {
        Commands::Run { json } => run(&config, json).await,
        Commands::Classify { text } => classify(&config, &text).await,
        Commands::Correct { text } => correct(&config, &text),
        Commands::Vocab => vocab(&config),
    }
}

async fn run(config: &Config, json: bool) -> Result<()> {
    let embedding = config.embedding();
    info!(
        "Starting risk profiler (embedding={}, model={}, dims={}, retries={})",
        embedding.provider, embedding.model, embedding.dimensions, embedding.retries
    );
    let profiler = Profiler::from_config(config).await?;
    let mut session = profiler.start_session();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(question) = profiler.next_question(&session) {
        println!("\nQuestion {}: {}", question.index + 1, question.text);
        println!("Your response:");
        let Some(line) = lines.next_line().await? else {
            anyhow::bail!(
                "input closed after {} of {} answers",
                session.current_index(),
                session.question_count()
            );
        };
        match profiler.submit_answer(&mut session, &line).await {
            Ok(submission) => {
                if let Some(warning) = submission.warning {
                    println!("{}", warning);
                }
            }
            Err(e) if !e.is_fatal() => {
                warn!("Answer not recorded: {}", e);
                println!("Sorry, that answer could not be processed. Please try again.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let results = profiler.results(&session)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!("\nTest completed! Here are your results:");
    println!("Overall Risk Profile: {}", results.risk_label);
    println!("Dominant Behavioral Bias: {}", results.bias_label);
    println!("\nYour Responses:");
    for entry in &results.transcript {
        println!("Question {}: {}", entry.question_index + 1, entry.question_text);
        println!("Your Answer: {}", entry.answer_text);
        println!("---");
    }
    Ok(())
}

async fn classify(config: &Config, text: &str) -> Result<()> {
    let profiler = Profiler::from_config(config).await?;
    let outcomes = profiler
        .classifier()
        .classify_all(text, profiler.store())
        .await?;
    for outcome in outcomes {
        println!(
            "{}: {} (best score {:.3})",
            outcome.taxonomy,
            outcome
                .category
                .as_deref()
                .unwrap_or(risk_profiler::NO_MATCH),
            outcome.score
        );
    }
    Ok(())
}

fn load_vocabulary(config: &Config) -> Result<Vocabulary> {
    let store = TaxonomyStore::load(config.runtime.taxonomy_path.as_deref())?;
    Ok(Vocabulary::build(store.all()))
}

fn correct(config: &Config, text: &str) -> Result<()> {
    let vocabulary = load_vocabulary(config)?;
    let corrected = risk_profiler::correction::SpellingCorrector::new(&vocabulary)
        .with_cutoff(config.classifier.correction_cutoff)
        .correct(text);
    println!("{}", corrected);
    Ok(())
}

fn vocab(config: &Config) -> Result<()> {
    let vocabulary = load_vocabulary(config)?;
    for word in vocabulary.iter() {
        println!("{}", word);
    }
    Ok(())
}
