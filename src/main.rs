use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;

// Import from our modular crates
use grag_cli::{print_command_output, print_search_result, run_chat, QueryEngine};
use grag_client::{CommandRunner, InitOutcome, RagClient, RunSelection};
use grag_config::{EnvStore, UserConfig};
use grag_core::{EmitFormat, IndexingRequest, PromptTuneRequest, Reporter, WorkspaceLayout};
use grag_query::{
    ChatClient, EmbeddingClient, GlobalSearchEngine, GlobalSearchParams, LocalSearchEngine,
    LocalSearchParams, OpenAiConfig,
};

#[derive(Parser)]
#[command(name = "grag")]
#[command(about = "Terminal companion for a graph-based RAG indexing engine", long_about = None)]
struct Cli {
    /// Workspace root directory
    #[arg(long, global = true, default_value = "./ragtest")]
    root: PathBuf,

    /// User-facing env file holding credentials and model settings
    #[arg(long, global = true, default_value = ".env")]
    user_env: PathBuf,

    /// Launcher binary for the external engine
    #[arg(long, global = true, default_value = "graphrag")]
    engine_bin: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Map/reduce over community report summaries
    Global,
    /// Entity-level mixed context
    Local,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a new workspace and run the engine's init pass
    Init,
    /// Run an indexing pass over the workspace
    Index {
        /// Resume a prior run by its timestamp name
        #[arg(long)]
        resume: Option<String>,
        /// Comma-separated artifact formats (json, csv, parquet)
        #[arg(long)]
        emit: Option<String>,
        /// Progress reporter style (rich, print, none)
        #[arg(long)]
        reporter: Option<String>,
        /// Explicit settings file instead of <root>/settings.yaml
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        verbose: bool,
        /// Validate the pipeline without running it
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        skip_validations: bool,
        #[arg(long)]
        memprofile: bool,
    },
    /// Generate domain-adapted prompts from the indexed input
    Tune {
        #[arg(long)]
        domain: Option<String>,
        /// Number of text units to sample
        #[arg(long, default_value_t = 15)]
        limit: u32,
        #[arg(long)]
        language: Option<String>,
        #[arg(long, default_value_t = 2048)]
        max_tokens: u32,
        #[arg(long, default_value_t = 256)]
        chunk_size: u32,
        #[arg(long)]
        no_entity_types: bool,
        /// Directory for the generated prompts
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Reconcile the user env file into the engine's env and settings
    Config {
        /// Print the effective user configuration
        #[arg(long)]
        show: bool,
    },
    /// List prior indexing runs
    Runs,
    /// Answer one question and exit
    Query {
        text: String,
        #[arg(long, value_enum, default_value_t = EngineKind::Global)]
        engine: EngineKind,
        /// Read artifacts from the nth run instead of the latest
        #[arg(long)]
        run: Option<usize>,
        /// Print the context tables the answer was grounded on
        #[arg(long)]
        context: bool,
    },
    /// Interactive chat session
    Chat {
        #[arg(long, value_enum, default_value_t = EngineKind::Global)]
        engine: EngineKind,
        /// Read artifacts from the nth run instead of the latest
        #[arg(long)]
        run: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize components
    let runner = CommandRunner::with_program(&cli.engine_bin, &[]);
    let layout = WorkspaceLayout::new(&cli.root);
    let client = RagClient::new(runner, layout, &cli.user_env);

    match cli.command {
        Commands::Init => {
            match client.initialize_indexing()? {
                InitOutcome::AlreadyExists => {
                    println!(
                        "{} Workspace {} already exists, leaving it untouched",
                        "ℹ".blue(),
                        cli.root.display()
                    );
                }
                InitOutcome::Initialized(output) => {
                    print_command_output(&output);
                    client.initialize_config()?;
                    println!("{} Configuration reconciled", "✓".green());
                }
            }
            Ok(())
        }
        Commands::Index {
            resume,
            emit,
            reporter,
            config,
            verbose,
            dry_run,
            no_cache,
            skip_validations,
            memprofile,
        } => {
            let mut builder = IndexingRequest::builder(&cli.root)
                .verbose(verbose)
                .dry_run(dry_run)
                .no_cache(no_cache)
                .skip_validations(skip_validations)
                .mem_profile(memprofile);
            if let Some(token) = resume {
                builder = builder.resume(token);
            }
            if let Some(path) = config {
                builder = builder.config(path);
            }
            if let Some(list) = emit {
                builder = builder.emit(parse_emit(&list)?);
            }
            if let Some(name) = reporter {
                let reporter = Reporter::parse(&name)
                    .ok_or_else(|| anyhow::anyhow!("unknown reporter style: {}", name))?;
                builder = builder.reporter(reporter);
            }
            let request = builder.build()?;

            // Settings follow the env file before every pass
            client.initialize_config()?;

            println!("{} Running indexing...", "→".blue());
            let output = client.run_indexing(&request)?;
            print_command_output(&output);
            if !output.success() {
                anyhow::bail!("indexing exited with status {:?}", output.status);
            }
            Ok(())
        }
        Commands::Tune {
            domain,
            limit,
            language,
            max_tokens,
            chunk_size,
            no_entity_types,
            output,
        } => {
            let mut builder = PromptTuneRequest::builder(&cli.root)
                .limit(limit)
                .max_tokens(max_tokens)
                .chunk_size(chunk_size)
                .no_entity_types(no_entity_types);
            if let Some(domain) = domain {
                builder = builder.domain(domain);
            }
            if let Some(language) = language {
                builder = builder.language(language);
            }
            if let Some(path) = output {
                builder = builder.output(path);
            }
            let request = builder.build()?;

            println!("{} Tuning prompts...", "→".blue());
            let output = client.initialize_prompt_tune(&request)?;
            print_command_output(&output);
            if !output.success() {
                anyhow::bail!("prompt tuning exited with status {:?}", output.status);
            }
            Ok(())
        }
        Commands::Config { show } => {
            client.initialize_config()?;
            println!(
                "{} Reconciled {} into {}",
                "✓".green(),
                cli.user_env.display(),
                client.layout().root().display()
            );
            if show {
                let store = EnvStore::open(client.user_env_path())?;
                let user = UserConfig::from_store(&store)?;
                print_user_config(&user);
            }
            Ok(())
        }
        Commands::Runs => {
            let runs = client.list_runs()?;
            if runs.is_empty() {
                println!("{}", "No indexing runs found".dimmed());
            } else {
                for (i, run) in runs.iter().enumerate() {
                    println!("{:>3}  {}", i, run.name);
                }
            }
            Ok(())
        }
        Commands::Query {
            text,
            engine,
            run,
            context,
        } => {
            let query_engine = build_query_engine(&client, engine, run)?;
            let result = query_engine.search(&text).await?;
            print_search_result(&result, context);
            Ok(())
        }
        Commands::Chat { engine, run } => {
            let alternate = match engine {
                EngineKind::Global => EngineKind::Local,
                EngineKind::Local => EngineKind::Global,
            };
            let initial = build_query_engine(&client, engine, run)?;
            let alternate = build_query_engine(&client, alternate, run)?;
            run_chat(initial, alternate).await?;
            Ok(())
        }
    }
}

fn parse_emit(list: &str) -> Result<Vec<EmitFormat>> {
    list.split(',')
        .map(|part| {
            EmitFormat::parse(part)
                .ok_or_else(|| anyhow::anyhow!("unknown emit format: {}", part.trim()))
        })
        .collect()
}

fn run_selection(run: Option<usize>) -> RunSelection {
    match run {
        Some(i) => RunSelection::Index(i),
        None => RunSelection::Latest,
    }
}

/// API configuration for the query engines. The user env file wins over
/// the process environment.
fn query_config(client: &RagClient) -> Result<OpenAiConfig> {
    let store = EnvStore::open(client.user_env_path())?;
    let user = UserConfig::from_store(&store)?;
    let config = match user.api_key {
        Some(key) => {
            let mut config = OpenAiConfig::new(
                key,
                user.api_base
                    .unwrap_or_else(|| "https://open.bigmodel.cn/api/paas/v4/".to_string()),
                user.model_id.unwrap_or_else(|| "glm-4".to_string()),
            );
            if let Some(model) = user.embedding_model_id {
                config = config.with_embedding_model(model);
            }
            config
        }
        None => OpenAiConfig::from_env()?,
    };
    Ok(config)
}

fn build_query_engine(
    client: &RagClient,
    kind: EngineKind,
    run: Option<usize>,
) -> Result<QueryEngine> {
    let artifacts = client.get_config_for_query(run_selection(run))?;
    let config = query_config(client)?;
    let chat = ChatClient::with_defaults(config.clone())?;

    let engine = match kind {
        EngineKind::Global => QueryEngine::Global(GlobalSearchEngine::new(
            chat,
            &artifacts,
            GlobalSearchParams::default(),
        )?),
        EngineKind::Local => {
            let embedder = EmbeddingClient::new(config)?;
            QueryEngine::Local(LocalSearchEngine::new(
                chat,
                Some(embedder),
                &artifacts,
                LocalSearchParams::default(),
            )?)
        }
    };
    Ok(engine)
}

fn print_user_config(user: &UserConfig) {
    let masked = |v: &Option<String>| match v {
        Some(_) => "set".green().to_string(),
        None => "not set".yellow().to_string(),
    };
    println!("{}", "User configuration:".bold());
    println!("  GRAPHRAG_API_KEY   {}", masked(&user.api_key));
    println!(
        "  API_BASE           {}",
        user.api_base.as_deref().unwrap_or("(default)")
    );
    println!(
        "  MODEL_ID           {}",
        user.model_id.as_deref().unwrap_or("(default)")
    );
    println!(
        "  EMBEDDING_MODEL_ID {}",
        user.embedding_model_id.as_deref().unwrap_or("(default)")
    );
    println!(
        "  CLAIM_EXTRACTION   {}",
        if user.claim_extraction { "True" } else { "False" }
    );
}
