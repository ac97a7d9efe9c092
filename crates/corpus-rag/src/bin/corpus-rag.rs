//! corpus-rag command line
//!
//! Run with: cargo run -p corpus-rag -- <command>

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpus_rag::crawl::Crawler;
use corpus_rag::evaluation::load_qa_pairs;
use corpus_rag::ingestion::DocumentLoader;
use corpus_rag::providers::{create_vector_index, ollama_providers, OllamaClient};
use corpus_rag::{RagConfig, RagPipeline};

/// Index a document corpus, answer questions from it and score the answers
#[derive(Parser, Debug)]
#[command(name = "corpus-rag", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the configured website into the corpus directory
    Crawl {
        /// Start URL (overrides crawl.base_url)
        #[arg(long)]
        url: Option<String>,
    },
    /// Extract, chunk, embed and index every file in the corpus directory
    Index {
        /// Corpus directory (overrides corpus.dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Answer one question from the indexed corpus
    Ask {
        /// The question
        question: String,
    },
    /// Answer a QA set and score the answers with ROUGE and BLEU
    Evaluate {
        /// QA file (overrides corpus.qa_file)
        #[arg(short, long)]
        qa_file: Option<PathBuf>,
        /// Write answers and scores as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RagConfig::default(),
    };

    match cli.command {
        Commands::Crawl { url } => {
            if let Some(url) = url {
                config.crawl.base_url = url;
            }
            let state = Crawler::new(&config.crawl)?.crawl().await?;
            println!(
                "{} {} pages, {} files saved to {} ({} failures)",
                style("Crawled").green().bold(),
                state.pages_fetched,
                state.report.len(),
                config.crawl.output_dir.display(),
                state.failures
            );
        }
        Commands::Index { dir } => {
            if let Some(dir) = dir {
                config.corpus.dir = dir;
            }

            let progress = spinner(format!("Loading {}", config.corpus.dir.display()))?;
            let loader = DocumentLoader::from_config(&config);
            let corpus_dir = config.corpus.dir.clone();
            let loaded = tokio::task::spawn_blocking(move || loader.load(&corpus_dir)).await??;
            progress.finish_and_clear();

            for error in &loaded.errors {
                println!("{} {}", style("skip").yellow(), error);
            }

            let pipeline = build_pipeline(config).await?;
            let progress = spinner(format!("Indexing {} documents", loaded.documents.len()))?;
            let report = pipeline.index(&loaded.documents).await?;
            progress.finish_and_clear();

            for error in &report.errors {
                println!("{} {}", style("fail").red(), error);
            }
            println!(
                "{} {} units from {} documents ({} files unreadable, {} unsupported, {} units failed)",
                style("Indexed").green().bold(),
                report.indexed_count,
                loaded.documents.len(),
                loaded.errors.len(),
                loaded.skipped.len(),
                report.errors.len()
            );
        }
        Commands::Ask { question } => {
            let pipeline = build_pipeline(config).await?;
            let progress = spinner("Thinking".to_string())?;
            let answer = pipeline.answer(question.as_str()).await?;
            progress.finish_and_clear();

            println!("{}\n", answer.answer);
            println!("{}", style("Sources:").bold());
            for (i, source) in answer.sources().iter().enumerate() {
                println!("  [{}] {}", i + 1, source);
            }
        }
        Commands::Evaluate { qa_file, output } => {
            let qa_path = qa_file.unwrap_or_else(|| config.corpus.qa_file.clone());
            let pairs = load_qa_pairs(&qa_path)?;
            let pipeline = build_pipeline(config).await?;

            let questions: Vec<&str> = pairs.iter().map(|pair| pair.question.as_str()).collect();
            let truths: Vec<&str> = pairs.iter().map(|pair| pair.ground_truth.as_str()).collect();

            let progress = spinner(format!("Answering {} questions", questions.len()))?;
            let answers = pipeline.answer_all(&questions).await?;
            progress.finish_and_clear();

            let responses: Vec<&str> = answers.iter().map(|answer| answer.answer.as_str()).collect();
            let result = pipeline.evaluate(&responses, &truths)?;

            println!("{:>4}  {:>7}  {:>7}  {:>7}  {:>7}", "#", "ROUGE-1", "ROUGE-2", "ROUGE-L", "BLEU");
            for (i, scores) in result.per_pair.iter().enumerate() {
                println!(
                    "{:>4}  {:>7.3}  {:>7.3}  {:>7.3}  {:>7.3}",
                    i + 1,
                    scores.rouge1,
                    scores.rouge2,
                    scores.rouge_l,
                    scores.bleu
                );
            }
            println!(
                "{:>4}  {:>7.3}  {:>7.3}  {:>7.3}  {:>7.3}",
                style("avg").bold(),
                result.averages.rouge1,
                result.averages.rouge2,
                result.averages.rouge_l,
                result.averages.bleu
            );
            println!(
                "\nWord overlap (ROUGE): {}\nFluency/precision (BLEU): {}",
                style(result.rouge_rating).cyan(),
                style(result.bleu_rating).cyan()
            );

            if let Some(path) = output {
                let report = serde_json::json!({
                    "answers": answers,
                    "evaluation": result,
                });
                std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
                println!("Results written to {}", path.display());
            }
        }
    }

    Ok(())
}

async fn build_pipeline(config: RagConfig) -> anyhow::Result<RagPipeline> {
    let client = OllamaClient::new(&config.llm)?;
    if !client.health_check().await {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!(
            "  Start it with `ollama serve`, then pull {} and {}",
            config.llm.embed_model,
            config.llm.generate_model
        );
    }

    let (embedder, llm) = ollama_providers(&config.llm, config.embeddings.dimensions)?;
    let index = create_vector_index(&config.vector_db)?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_index(index)
        .generation_model(llm)
        .build()?;
    Ok(pipeline)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}
