use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pdfqa_core::{init_tracing, ConfigManager, PdfQaConfig};
use pdfqa_rag::{
    AnalysisReport, AnalysisRequest, DocumentSet, OutputShape, Pipeline, Question, RequestOptions,
    Retriever, Session,
};
use pdfqa_vector::ChunkingStrategy;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(about = "Ask questions about PDF documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./.pdfqa.toml, then ~/.pdfqa/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question from one or more documents
    Ask {
        /// PDF or text files to read
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Free-form question
        #[arg(short, long, conflicts_with = "preset", required_unless_present = "preset")]
        question: Option<String>,

        /// Name of a question preset from the configuration
        #[arg(short, long)]
        preset: Option<String>,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Always render the answer as HTML
        #[arg(long, conflicts_with = "text")]
        html: bool,

        /// Never render the answer as HTML
        #[arg(long)]
        text: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the chunks that would be used as context, without generating an answer
    Search {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// Write a configuration template
    InitConfig {
        /// Target path
        #[arg(default_value = ".pdfqa.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args)]
struct RetrievalArgs {
    /// Chunking strategy: word, page or char
    #[arg(long)]
    strategy: Option<String>,

    /// Window size for word/char chunking
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Window overlap for word/char chunking
    #[arg(long)]
    overlap: Option<usize>,

    /// Number of chunks to use as context
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

impl RetrievalArgs {
    fn options(&self, config: &PdfQaConfig, output: OutputShape) -> Result<RequestOptions> {
        let strategy = if self.strategy.is_some() || self.chunk_size.is_some() || self.overlap.is_some() {
            let name = self.strategy.as_deref().unwrap_or(&config.chunking.strategy);
            Some(ChunkingStrategy::parse(
                name,
                self.chunk_size.unwrap_or(config.chunking.chunk_size),
                self.overlap.unwrap_or(config.chunking.overlap),
            )?)
        } else {
            None
        };
        Ok(RequestOptions {
            strategy,
            top_k: self.top_k,
            output,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig { path, force } = &cli.command {
        return init_config(path, *force);
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    let mut config = manager.into_config();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging);

    match cli.command {
        Commands::Ask {
            files,
            question,
            preset,
            retrieval,
            html,
            text,
            json,
        } => {
            let output = if html {
                OutputShape::Html
            } else if text {
                OutputShape::Text
            } else {
                OutputShape::Auto
            };
            let question = match (question, preset) {
                (Some(q), _) => Question::Custom(q),
                (None, Some(key)) => Question::Preset(key),
                (None, None) => bail!("either --question or --preset is required"),
            };
            let options = retrieval.options(&config, output)?;

            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            let session = Session::new(pipeline, config.prompts.clone());
            session.upload(&files)?;
            let report = session.ask_with(question, options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Search {
            files,
            question,
            retrieval,
        } => {
            let options = retrieval.options(&config, OutputShape::Text)?;
            let retriever = Retriever::from_config(&config)?;
            let snapshot = DocumentSet::from_paths(files);
            let request = AnalysisRequest::new(question).with_options(options);
            let retrieval = retriever.retrieve(&snapshot, &request).await?;

            for step in &retrieval.steps {
                println!("{} {}", "•".dimmed(), step.dimmed());
            }
            println!();
            for (rank, chunk) in retrieval.chunks.iter().enumerate() {
                println!(
                    "{} {} {}",
                    format!("#{}", rank + 1).cyan().bold(),
                    chunk.provenance().bold(),
                    format!("{:.3}", chunk.score.unwrap_or(0.0)).yellow()
                );
                println!("{}\n", preview(&chunk.text, 400));
            }
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ConfigManager::create_default_config(path)?;
    println!("{} {}", "Wrote".green().bold(), path.display());
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    for step in &report.steps {
        println!("{} {}", "•".dimmed(), step.dimmed());
    }
    println!();
    println!("{}", report.answer);
    println!();
    println!(
        "{} {} of {} chunks, average similarity {}",
        "Context:".cyan().bold(),
        report.chunks_used,
        report.chunks_produced,
        format!("{:.3}", report.average_similarity).yellow()
    );
    for source in &report.sources {
        let page = source
            .page
            .map(|p| format!(" p.{}", p))
            .unwrap_or_default();
        println!(
            "  {}{} #{} {}",
            source.document_id,
            page,
            source.chunk_id,
            format!("{:.3}", source.score).yellow()
        );
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
