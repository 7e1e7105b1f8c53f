//! dandi-notebook-gen - generate exploration notebooks for DANDI datasets

mod config;
mod generator;
mod progress;
mod script_runner;
mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nbgen_agent::{Agent, AgentConfig, InteractionLog, ProviderTransport};
use nbgen_ai::providers::{
    OPENROUTER_API_KEY_ENV,
    openrouter::{DEFAULT_REFERER, ProviderConfig},
};
use tracing_subscriber::EnvFilter;

/// Generate a Jupyter notebook for exploring a Dandiset.
#[derive(Parser, Debug)]
#[command(name = "dandi-notebook-gen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The ID of the Dandiset to generate a notebook for
    #[arg(required_unless_present = "init_config")]
    dandiset_id: Option<String>,

    /// Output file path for the notebook
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory where log files will be stored (default: logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Name of the log file (default: auto-generated timestamp)
    #[arg(long)]
    log_file: Option<String>,

    /// OpenRouter model id
    #[arg(short, long)]
    model: Option<String>,

    /// Stop after this many completion requests
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Run the generated script afterwards
    #[arg(long)]
    run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nbgen_ai=debug,nbgen_agent=debug,dandi_notebook_gen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(dandiset_id) = args.dandiset_id.clone() else {
        eprintln!("Error: DANDISET_ID is required");
        std::process::exit(2);
    };

    println!("Generating notebook for Dandiset {}", dandiset_id);
    if let Err(e) = run(&args, &dandiset_id).await {
        eprintln!("Error generating notebook: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args, dandiset_id: &str) -> anyhow::Result<()> {
    // Merge config with CLI args (CLI takes precedence)
    let mut settings = config::Config::load().settings();
    if let Some(ref model) = args.model {
        settings.model = model.clone();
    }
    if let Some(ref log_dir) = args.log_dir {
        settings.log_dir = log_dir.clone();
    }
    if args.max_iterations.is_some() {
        settings.max_iterations = args.max_iterations;
    }

    let api_key =
        settings.resolve_api_key(OPENROUTER_API_KEY_ENV, Path::new(config::DOTENV_FILE))?;
    let transport = ProviderTransport::from_config(ProviderConfig {
        api_key: Some(api_key),
        base_url: settings.base_url.clone(),
        referer: Some(DEFAULT_REFERER.to_string()),
        timeout: settings.request_timeout,
    })?;

    let client = tools::ArchiveClient::new(settings.request_timeout)
        .context("failed to build archive client")?;
    let registry = tools::archive_registry(Arc::new(client))?;

    let log = InteractionLog::open(&settings.log_dir, args.log_file.as_deref())
        .with_context(|| format!("failed to open log in {}", settings.log_dir.display()))?;
    tracing::debug!(log = %log.path().display(), "Interaction log ready");

    let agent_config = AgentConfig {
        model: settings.model.clone(),
        max_iterations: settings.max_iterations,
    };
    let agent = Agent::new(agent_config, registry, Arc::new(transport)).with_log(log);

    let printer = tokio::spawn(progress::print_events(agent.subscribe()));
    let run_id = uuid::Uuid::new_v4().to_string();
    let result =
        generator::generate_notebook(&agent, dandiset_id, args.output.as_deref(), &run_id).await;
    let _ = printer.await;
    let generated = result?;

    let tally = generated.outcome.tally;
    println!(
        "Tokens used: {} prompt, {} completion",
        tally.prompt_tokens, tally.completion_tokens
    );
    println!("Notebook generated successfully: {}", generated.path.display());

    if args.run {
        let runner = script_runner::ScriptRunner::new(settings.python);
        println!("Running {}", generated.path.display());
        let outcome = runner
            .preprocess_and_run(&generated.path, true)
            .await
            .with_context(|| format!("failed to run {}", generated.path.display()))?;

        if let Some(ref stdout) = outcome.stdout {
            print!("{}", stdout);
        }
        if outcome.success {
            println!("Script ran successfully");
        } else {
            if let Some(ref stderr) = outcome.stderr {
                eprint!("{}", stderr);
            }
            eprintln!("Script failed");
            std::process::exit(1);
        }
    }

    Ok(())
}
