//! toolrelay - Main CLI Entry Point

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use toolrelay::{
    cli::{Args, Commands},
    config::Config,
    logging,
    telemetry::TelemetryDisplay,
    tools::{
        format::{format_chain_result, format_execution_result},
        params::{parse_parameters, parse_tool_id},
        ToolRegistry, ToolRuntime,
    },
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    logging::init(args.verbosity(), &config.logging.level);

    if let Err(message) = args.validate() {
        bail!(message);
    }

    let ok = match &args.command {
        Commands::Config => {
            show_config(&args, &config)?;
            true
        }
        command => {
            let runtime = build_runtime(&args, &config)?;
            let ok = run_command(&runtime, command).await?;
            TelemetryDisplay::new(runtime.telemetry().clone(), args.verbosity()).display_summary();
            ok
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn build_runtime(args: &Args, config: &Config) -> Result<ToolRuntime> {
    let registry = match &args.catalog {
        Some(path) => ToolRegistry::load_catalog(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => ToolRegistry::new(),
    };
    debug!(tools = registry.len(), "Registry ready");
    Ok(ToolRuntime::new(config, registry)?)
}

/// Run one tool command; returns whether it succeeded
async fn run_command(runtime: &ToolRuntime, command: &Commands) -> Result<bool> {
    match command {
        Commands::Run { tool_id, params } => {
            let tool_id = parse_tool_id(tool_id)?;
            let params = parse_parameters(params.as_deref().unwrap_or(""));
            let result = runtime.execute_by_id(&tool_id, &params).await?;
            print_json(&format_execution_result(&result))?;
            Ok(result.success)
        }
        Commands::Chain { agent, tool_ids, params } => {
            let params = parse_parameters(params.as_deref().unwrap_or(""));
            let chain = runtime
                .execute_chain_for(agent.as_deref(), tool_ids, &params)
                .await?;
            print_json(&format_chain_result(&chain))?;
            Ok(chain.success)
        }
        Commands::Check { tool_id } => {
            let check = runtime.validate_connection(&parse_tool_id(tool_id)?).await;
            print_json(&check)?;
            Ok(check.valid)
        }
        Commands::List { org } => {
            print_json(&runtime.list_tools(org.as_deref()))?;
            Ok(true)
        }
        Commands::Info { tool_id } => {
            print_json(&runtime.tool_info(tool_id)?)?;
            Ok(true)
        }
        Commands::Config => Ok(true),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!();
    println!("{}", "toolrelay Configuration".bold());
    println!("{}", "─────────────────────────────────────".dimmed());

    match (&args.config, Config::default_path()) {
        (Some(path), _) => println!("Source:    {}", path.display()),
        (None, Some(path)) if path.exists() => println!("Source:    {}", path.display()),
        _ => println!("Source:    built-in defaults"),
    }
    if let Some(catalog) = &args.catalog {
        println!("Catalog:   {}", catalog.display());
    }
    println!("Verbosity: {}", args.verbosity().as_str());
    println!();

    print!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    println!();

    Ok(())
}
