//! Autonomous tool-calling agent.
//!
//! Routes a request either to a direct model answer or to the reasoning loop,
//! which calls workspace tools until it can answer. Events are printed as JSON
//! lines on stdout; diagnostics go to stderr.

use std::path::{Path, PathBuf};

use agent::agent_loop::LoopConfig;
use agent::core::types::{Event, EventKind};
use agent::dispatch::{Dispatcher, policy_for};
use agent::exit_codes;
use agent::io::config::{
    AgentConfig, DEFAULT_CONFIG_PATH, RouteMode, load_config, write_config,
};
use agent::io::model::{FallbackModelCaller, GeminiBackend};
use agent::io::prompt::PromptEngine;
use agent::io::workspace::Workspace;
use agent::logging;
use agent::registry::ToolRegistry;
use agent::tools::{ToolContext, ToolLimits};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "agent",
    version,
    about = "Autonomous tool-calling agent over a sandboxed workspace"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the tools the model can call.
    Tools {
        /// Include the loop entry offered to the router.
        #[arg(long)]
        master: bool,
    },
    /// Handle one request and print its events as JSON lines.
    Run {
        /// Workspace directory (overrides `workspace_root`).
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Use only this model instead of the fallback list.
        #[arg(long)]
        model: Option<String>,
        /// Routing mode (overrides `routing.mode`).
        #[arg(long, value_enum)]
        route: Option<RouteMode>,
        /// Tool turns allowed (overrides `max_turns`).
        #[arg(long)]
        max_turns: Option<u32>,
        prompt: String,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Tools { master } => cmd_tools(master),
        Command::Run {
            workspace,
            model,
            route,
            max_turns,
            prompt,
        } => {
            let mut cfg = load_config(&cli.config)?;
            if let Some(workspace) = workspace {
                cfg.workspace_root = workspace;
            }
            if let Some(route) = route {
                cfg.routing.mode = route;
            }
            if let Some(max_turns) = max_turns {
                cfg.max_turns = max_turns;
            }
            cfg.validate().context("invalid options")?;
            cmd_run(&cfg, model.as_deref(), &prompt)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AgentConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_tools(master: bool) -> Result<i32> {
    let registry = if master {
        ToolRegistry::master()
    } else {
        ToolRegistry::sub_tools()
    };
    for tool in registry.descriptions() {
        println!("{}: {}", tool.signature, tool.description);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(cfg: &AgentConfig, model: Option<&str>, prompt: &str) -> Result<i32> {
    if prompt.trim().is_empty() {
        bail!("prompt must not be empty");
    }

    let workspace = Workspace::open(&cfg.workspace_root)?;
    info!(root = %workspace.root().display(), "workspace ready");
    let ctx = ToolContext::new(workspace, ToolLimits::from_config(&cfg.tools));

    let backend = GeminiBackend::from_env(&cfg.model)?;
    let caller = match model {
        Some(name) => FallbackModelCaller::pinned(backend, &cfg.model.models, name)?,
        None => FallbackModelCaller::new(backend, cfg.model.models.clone()),
    };

    let engine = PromptEngine::new();
    let system_prompt = engine.agent_prompt(ToolRegistry::sub_tools(), cfg.max_turns)?;
    let router_prompt = engine.router_prompt(ToolRegistry::master())?;
    let policy = policy_for(cfg.routing.mode, router_prompt);

    let dispatcher = Dispatcher {
        model: &caller,
        policy: policy.as_ref(),
        ctx: &ctx,
        system_prompt: &system_prompt,
        loop_config: LoopConfig {
            max_turns: cfg.max_turns,
        },
    };
    let events = dispatcher.handle(prompt, print_event);

    Ok(exit_code_for(&events))
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(err = %err, kind = event.kind.as_str(), "failed to serialize event"),
    }
}

fn exit_code_for(events: &[Event]) -> i32 {
    match events.last().map(|event| event.kind) {
        Some(EventKind::FinalAnswer) => exit_codes::OK,
        _ => exit_codes::AGENT_ERROR,
    }
}
