//! DraftLoop - writer/reviewer refinement loop
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use draftloop::background::{self, BackgroundItem};
use draftloop::cli::{Cli, Command, RoleArg, RunArgs, get_log_path, resolve_text};
use draftloop::config::Config;
use draftloop::domain::{RunConfiguration, RunState};
use draftloop::events::EventBus;
use draftloop::llm::create_client;
use draftloop::prompts::PromptLoader;
use draftloop::r#loop::RunController;
use draftloop::repl::{PauseSession, print_batch_result, print_event, print_history};
use draftloop::validation::{Validated, inspect, schema_for};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("DraftLoop loaded config: provider={} model={}", config.llm.provider, config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run(args) => cmd_run(&config, args).await,
        Command::Schema { role, drafts } => cmd_schema(role, drafts),
        Command::Validate { role, drafts, file } => cmd_validate(role, drafts, &file),
    }
}

/// Assemble the run configuration from config defaults and CLI overrides
fn build_run_configuration(config: &Config, args: &RunArgs) -> Result<(RunConfiguration, Vec<BackgroundItem>)> {
    debug!(?args, "build_run_configuration: called");
    let brief = resolve_text(&args.brief)?;
    let criteria = resolve_text(&args.criteria)?;
    let model = args.model.clone().unwrap_or_else(|| config.llm.model.clone());

    let mut items = Vec::new();
    for path in &args.background {
        items.push(background::load_file(path)?);
    }
    for (i, text) in args.paste.iter().enumerate() {
        items.push(background::pasted_text(text, i + 1)?);
    }

    let mut run_config = RunConfiguration::from_defaults(&config.run, model, brief, criteria)
        .with_background(items.iter().map(|item| item.part.clone()).collect());
    if let Some(min) = args.min_iterations {
        run_config.min_iterations = min;
    }
    if let Some(max) = args.max_iterations {
        run_config.max_iterations = max;
    }
    if let Some(target) = args.target_score {
        run_config.target_score = target;
    }
    if let Some(drafts) = args.drafts {
        run_config.draft_count = drafts;
    }

    Ok((run_config, items))
}

async fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    debug!("cmd_run: called");
    let (run_config, items) = build_run_configuration(config, &args)?;

    // Reject bad parameters before anything touches the network
    run_config.validate().map_err(|e| eyre::eyre!(e.user_message()))?;
    config.validate()?;

    for item in &items {
        println!("{} {}", "Background:".dimmed(), item.describe());
    }

    let client = create_client(&config.llm)?;
    let prompts = PromptLoader::new(config.prompts.dir.as_deref());
    let bus = Arc::new(EventBus::with_default_capacity());
    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let mut controller = RunController::new(client, prompts).with_events(bus.clone());
    let result = controller.start(run_config.clone()).await;
    tokio::task::yield_now().await;
    print_batch_result(&controller, &result);

    if !args.no_interactive {
        PauseSession::new(&mut controller, run_config).run().await?;
    } else if controller.state() == RunState::Paused {
        print_history(&controller);
    }

    printer.abort();
    write_outputs(&controller, args.output.as_ref(), args.history.as_ref())?;

    match controller.last_error() {
        Some(failure) if controller.state() == RunState::Failed => Err(eyre::eyre!("{}", failure.message)),
        _ => Ok(()),
    }
}

fn write_outputs(controller: &RunController, output: Option<&PathBuf>, history: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = output {
        match controller.final_selected_draft() {
            Some(draft) => {
                fs::write(path, draft).context(format!("Failed to write {}", path.display()))?;
                println!("Selected draft written to {}", path.display());
            }
            None => println!("{} no selected draft to write", "!".yellow()),
        }
    }

    if let Some(path) = history {
        let json = serde_json::to_string_pretty(controller.history()).context("Failed to serialize history")?;
        fs::write(path, json).context(format!("Failed to write {}", path.display()))?;
        println!("History written to {}", path.display());
    }
    Ok(())
}

fn cmd_schema(role: RoleArg, drafts: u8) -> Result<()> {
    debug!(?role, drafts, "cmd_schema: called");
    let schema = schema_for(role.shape(drafts));
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn cmd_validate(role: RoleArg, drafts: u8, file: &PathBuf) -> Result<()> {
    debug!(?role, drafts, ?file, "cmd_validate: called");
    let raw = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;

    match inspect(&raw, role.shape(drafts)) {
        Ok(Validated::Writer(writer)) => println!("{}", serde_json::to_string_pretty(&writer)?),
        Ok(Validated::Reviewer(reviewer)) => println!("{}", serde_json::to_string_pretty(&reviewer)?),
        Err(violation) => {
            eprintln!("{} {}", "Invalid:".bright_red(), violation);
            std::process::exit(1);
        }
    }
    Ok(())
}
