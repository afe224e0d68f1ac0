use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragdesk::retrieval::ProviderHandle;
use ragdesk::{
    AnswerPipeline, AnswerRequest, CommandGenerator, ExtractiveGenerator, GenerationProvider,
    KeywordProvider, PipelineConfig, ProviderKind, ProviderRegistry,
};
use ragdesk_cache::{spawn_cleanup_task, CacheManager};

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Grounded answers to customer questions", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question once
    Ask {
        /// The customer question
        question: String,

        /// JSON-lines file with document evidence
        #[arg(long)]
        docs: Option<PathBuf>,

        /// JSON-lines file with FAQ entries
        #[arg(long)]
        faq: Option<PathBuf>,

        /// Generator command line; the prompt is appended as last argument
        #[arg(short, long)]
        generator: Option<String>,

        /// Answer locale (e.g. pt-BR, en)
        #[arg(short, long)]
        locale: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,

    /// Show the complexity score and retrieval strategy for a question
    Complexity {
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ragdesk=info".into())
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Ask {
            ref question,
            ref docs,
            ref faq,
            ref generator,
            ref locale,
            json,
        } => {
            let cache = Arc::new(CacheManager::new(config.cache_config()));
            let _sweeper = config
                .cache
                .enable_auto_cleanup
                .then(|| spawn_cleanup_task(cache.clone()));

            let registry = build_registry(&config, cache.clone(), docs.as_deref(), faq.as_deref());
            let generator: Arc<dyn GenerationProvider> = match generator {
                Some(line) => Arc::new(CommandGenerator::from_command_line(line)?),
                None => Arc::new(ExtractiveGenerator::new()),
            };

            let pipeline = AnswerPipeline::new(config, cache, registry, generator);
            pipeline.warm_up();

            let mut request = AnswerRequest::new(question.clone());
            request.locale = locale.clone();
            let response = pipeline.answer(&request).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.answer);
                println!();
                println!(
                    "route: {}  confidence: {:.2}  mode: {:?}",
                    response.route, response.grounding.confidence, response.grounding.mode
                );
            }
        }

        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }

        Commands::Complexity { ref question } => {
            let cache = Arc::new(CacheManager::new(config.cache_config()));
            let registry = ProviderRegistry::new(cache.clone());
            let orchestrator =
                ragdesk::RetrievalOrchestrator::new(config.retrieval.clone(), cache, registry);
            let (strategy, complexity) = orchestrator.select_strategy(question, ProviderKind::ALL.len());

            println!("complexity: {}", complexity);
            println!("threshold:  {}", config.retrieval.complexity_threshold);
            println!("strategy:   {}", strategy);
        }
    }

    Ok(())
}

/// Keyword providers over the given knowledge files, built on first use
fn build_registry(
    config: &PipelineConfig,
    cache: Arc<CacheManager>,
    docs: Option<&Path>,
    faq: Option<&Path>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(cache);

    for (kind, path) in [(ProviderKind::SemanticVector, docs), (ProviderKind::Faq, faq)] {
        let Some(path) = path else { continue };
        let path = path.to_path_buf();
        let limit = config.retrieval.k_for(kind);
        registry = registry.register(kind, move || {
            KeywordProvider::from_jsonl(kind, &path, limit).map(|p| Arc::new(p) as ProviderHandle)
        });
    }

    registry
}
