mod script;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foreman_config::ConfigLoader;
use foreman_core::{ExecutionStatus, Plan, RunEventBus, RunRecord};
use foreman_llm::ProviderRouter;
use foreman_runtime::{ActivityLogger, CreditLedger, DecisionEngine, Supervisor};
use foreman_store::{PersistenceClient, SqliteStore};

use script::{EchoTools, ScriptProvider};

#[derive(Parser)]
#[command(name = "foreman", version, about = "Plan-driven execution supervisor")]
struct Cli {
    /// Path to foreman.toml (default: FOREMAN_CONFIG or ~/.foreman/foreman.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a plan, replaying model decisions from a script file.
    Run {
        /// Plan file (TOML).
        #[arg(long)]
        plan: PathBuf,
        /// Script file with one model response per line.
        #[arg(long)]
        script: PathBuf,
        /// User the run is billed to.
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Check a plan file without executing it.
    Validate {
        #[arg(long)]
        plan: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loader = ConfigLoader::load(cli.config.as_deref())?;
    let config = loader.get();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    match config.logging.format.as_str() {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        "compact" => tracing_subscriber::fmt().with_env_filter(filter).compact().init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    match cli.command {
        Command::Validate { plan } => {
            let plan = load_plan(&plan)?;
            plan.validate()?;
            println!("plan ok: {} phase(s) toward \"{}\"", plan.phases.len(), plan.goal);
            Ok(())
        }
        Command::Run { plan, script, user } => {
            let plan = load_plan(&plan)?;
            plan.validate()?;

            let store = Arc::new(SqliteStore::open(&config.store.db_path)?);
            let run = RunRecord::new(&user);
            store.insert_run(&run).await?;
            info!(run = %run.id, goal = %plan.goal, "run created");

            let provider = ScriptProvider::from_file(
                &script,
                config.llm.input_cost_per_mtok,
                config.llm.output_cost_per_mtok,
            )?;
            let mut router = ProviderRouter::new();
            router.add_provider(Arc::new(provider));

            let mut llm_config = config.llm.clone();
            llm_config.model = "script/replay".to_string();
            llm_config.fallback_model = None;

            let engine = DecisionEngine::new(router, llm_config);
            let ledger =
                CreditLedger::new(store.clone(), config.supervisor.default_credit_grant);

            let bus = RunEventBus::default();
            let mut events = bus.subscribe(run.id);
            let printer = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    println!("[{}] {}", event.kind.as_str(), event.message);
                }
            });

            let activity = ActivityLogger::new(store.clone(), bus);
            let mut supervisor = Supervisor::new(
                store.clone(),
                engine,
                ledger,
                Arc::new(EchoTools),
                activity,
                config.supervisor.clone(),
                run.id,
                user,
                plan,
            );

            let result = supervisor.execute().await;
            printer.abort();

            let final_run = store.fetch_run(run.id).await?;
            println!(
                "run {} finished: {} (credits used: {:.2})",
                run.id,
                final_run.status.as_str(),
                final_run.total_credits_used
            );
            if let Some(message) = result.final_message {
                println!("{message}");
            }

            match result.status {
                ExecutionStatus::Failed => {
                    anyhow::bail!(result.error.unwrap_or_else(|| "run failed".to_string()))
                }
                _ => Ok(()),
            }
        }
    }
}

fn load_plan(path: &PathBuf) -> anyhow::Result<Plan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan file {}", path.display()))?;
    let plan: Plan =
        toml::from_str(&raw).with_context(|| format!("parsing plan file {}", path.display()))?;
    Ok(plan)
}
