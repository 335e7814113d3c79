use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use ragdesk_cli::{
    ChatCommand, ChatSession, display_banner, handle_input_with_history, logging, print_answer,
    print_help, ui,
};
use ragdesk_core::{AnswerStrategy, EmbeddingProvider, TextGenerator};
use ragdesk_openai::{OpenAiChatClient, OpenAiEmbeddingProvider};
use ragdesk_rag::{
    EmbedderKind, HashingEmbeddingProvider, OnnxEmbeddingProvider, PipelineConfig, RagPipeline,
};

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Answer questions from company documents", long_about = None, version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Persist the index under this directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Answer strategy: template or generative
    #[arg(long, global = true)]
    strategy: Option<AnswerStrategy>,

    /// Embedding provider: onnx, hashing or openai
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the index with the given documents
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Sentence packing only, no section detection
        #[arg(long)]
        plain: bool,
    },
    /// Answer one question from the persisted index
    Ask {
        #[arg(required = true)]
        question: Vec<String>,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Interactive chat, optionally loading documents first
    Chat { files: Vec<PathBuf> },
    /// Print index statistics as JSON
    Stats,
}

async fn build_pipeline(config: &PipelineConfig) -> Result<RagPipeline> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedder {
        EmbedderKind::Onnx => {
            let onnx = OnnxEmbeddingProvider::new(config.model_dir.clone());
            if onnx.is_available() {
                Arc::new(onnx)
            } else {
                warn!(
                    model_dir = %config.model_dir.display(),
                    "onnx model not found, falling back to the hashing embedder"
                );
                Arc::new(HashingEmbeddingProvider::default())
            }
        }
        EmbedderKind::Hashing => Arc::new(HashingEmbeddingProvider::default()),
        EmbedderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::from_env()?),
    };

    let generator: Option<Arc<dyn TextGenerator>> = match config.strategy {
        AnswerStrategy::Generative => {
            let client: Arc<dyn TextGenerator> = Arc::new(OpenAiChatClient::from_env()?);
            Some(client)
        }
        AnswerStrategy::Template => None,
    };

    Ok(RagPipeline::from_config(config, provider, generator).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(embedder) = cli.embedder {
        config.embedder = embedder;
    }

    match cli.command.unwrap_or(Commands::Chat { files: Vec::new() }) {
        Commands::Ingest { files, plain } => {
            if plain {
                config.structured = false;
            }
            let pipeline = build_pipeline(&config).await?;
            let report = pipeline.ingest_files(&files).await?;
            ui::print_ingest_report(&report);
            if config.data_dir.is_none() {
                println!(
                    "{} No data directory set; the index lives only for this run",
                    "💡".cyan()
                );
            }
        }
        Commands::Ask { question, top_k } => {
            let pipeline = build_pipeline(&config).await?;
            let question = question.join(" ");
            let answer = pipeline
                .ask_with_k(&question, top_k.unwrap_or(config.top_k))
                .await?;
            print_answer(&answer.text, &answer.sources);
        }
        Commands::Stats => {
            let pipeline = build_pipeline(&config).await?;
            println!("{}", serde_json::to_string_pretty(&pipeline.stats().await?)?);
        }
        Commands::Chat { files } => {
            let pipeline = Arc::new(build_pipeline(&config).await?);
            if !files.is_empty() {
                let report = pipeline.ingest_files(&files).await?;
                ui::print_ingest_report(&report);
            }
            run_chat(pipeline).await?;
        }
    }

    Ok(())
}

async fn run_chat(pipeline: Arc<RagPipeline>) -> Result<()> {
    let indexed = pipeline.index().count().await?;
    display_banner(pipeline.strategy().as_str(), indexed);

    let mut session = ChatSession::new(pipeline);
    info!(session = %session.id(), "chat session started");
    let mut history = Vec::new();

    loop {
        let input = handle_input_with_history(&mut history).await?;

        match ChatCommand::parse(&input) {
            ChatCommand::Empty => continue,
            ChatCommand::Exit => {
                println!("{}", "👋 Goodbye!".green());
                break;
            }
            ChatCommand::Help => print_help(),
            ChatCommand::Reset => {
                session.reset();
                println!("{} Conversation cleared", "🧹".cyan());
            }
            ChatCommand::History => ui::print_history(session.transcript()),
            ChatCommand::Stats => {
                let stats = session.pipeline().stats().await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            ChatCommand::Load(file) => {
                println!("{} Loading {}...", "📄".blue(), file);
                match session.load(std::path::Path::new(&file)).await {
                    Ok(report) => ui::print_ingest_report(&report),
                    Err(e) => println!("{} Load failed: {}", "❌".red(), e),
                }
            }
            ChatCommand::Ask(question) => {
                println!("{} Searching...", "🔍".blue());
                let reply = session.submit(&question).await;
                print_answer(&reply.text, &reply.sources);
            }
        }
    }

    Ok(())
}
