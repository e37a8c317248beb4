//! SplitBot - Discord assistant backed by MCP tool servers.
//!
//! Usage:
//!   splitbot              Connect to Discord and answer messages (same as `run`)
//!   splitbot run          Connect to Discord and answer messages
//!   splitbot tools        Start the tool providers and list what they expose

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use splitbot_agents::{
    AgentRuntime, HttpCurlTool, OpenAiProvider, RegistryOptions, Tool, ToolRegistry,
};
use splitbot_channels::{
    ChannelLifecycle, DiscordChannel, DiscordConfig, MessageCallback, ReplyTransport,
};
use splitbot_common::InboundMessage;
use splitbot_config::{AppConfig, ConfigLoader, DEFAULT_SYSTEM_PROMPT, ToolProvidersConfig};
use splitbot_gateway::TurnHandler;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "splitbot")]
#[command(version)]
#[command(about = "Discord assistant that answers with the help of MCP tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Tool provider file. Overrides SPLITBOT_MCP_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, env = "SPLITBOT_LOG", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and answer messages until interrupted.
    Run,

    /// Start the tool providers, print the registered tools and exit.
    Tools {
        /// Print the tool definitions as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let mut config = ConfigLoader::from_env().context("failed to load configuration")?;
    if let Some(path) = cli.config {
        config.mcp_config_path = path;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config).await,
        Commands::Tools { json } => cmd_tools(config, json).await,
    }
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn local_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(HttpCurlTool::new())]
}

async fn start_registry(config: &AppConfig, providers: &ToolProvidersConfig) -> ToolRegistry {
    ToolRegistry::start(
        providers,
        local_tools(),
        RegistryOptions::from(&config.agent),
    )
    .await
}

async fn cmd_run(config: AppConfig) -> Result<()> {
    let Some(api_key) = config.llm.api_key.clone() else {
        bail!("OPENAI_API_KEY is required");
    };
    let discord = DiscordConfig::from_token(config.discord.bot_token.clone())?;
    let providers = ConfigLoader::load_providers(&config.mcp_config_path)?;

    let registry = Arc::new(start_registry(&config, &providers).await);

    let provider = Arc::new(OpenAiProvider::new(api_key, config.llm.base_url.clone()));
    let mut runtime =
        AgentRuntime::new(provider, Arc::clone(&registry), config.llm.model.clone());
    runtime.set_max_steps(config.agent.max_steps);
    runtime.set_system_prompt(
        config
            .agent
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
    );
    runtime.set_tool_tags(config.agent.tool_tags.clone());
    if let Some(max_tokens) = config.llm.max_tokens {
        runtime.set_max_tokens(max_tokens);
    }

    let turns = Arc::new(TurnHandler::new(Arc::new(runtime), &config.agent));
    let on_message: MessageCallback = Arc::new(
        move |msg: InboundMessage, transport: Arc<dyn ReplyTransport>| {
            let turns = Arc::clone(&turns);
            Box::pin(async move {
                turns.handle(&msg, transport).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        },
    );

    let mut channel = DiscordChannel::new(discord, on_message);
    if let Err(e) = channel.connect().await {
        registry.shutdown().await;
        return Err(e).context("failed to connect to discord");
    }
    info!(
        model = %config.llm.model,
        tools = registry.len(),
        "splitbot is running, press Ctrl+C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");

    if let Err(e) = channel.disconnect().await {
        warn!("discord disconnect failed: {e}");
    }
    registry.shutdown().await;
    Ok(())
}

async fn cmd_tools(config: AppConfig, json: bool) -> Result<()> {
    let providers = ConfigLoader::load_providers(&config.mcp_config_path)?;
    let registry = start_registry(&config, &providers).await;
    let definitions = registry.list_definitions(config.agent.tool_tags.as_deref());

    if json {
        let rendered: Vec<_> = definitions
            .iter()
            .map(|def| {
                serde_json::json!({
                    "name": def.name,
                    "description": def.description,
                    "inputSchema": def.input_schema,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for status in registry.providers().await {
            println!(
                "provider {:<20} {} tool(s){}",
                status.name,
                status.tool_count,
                if status.connected { "" } else { " (disconnected)" }
            );
        }
        for def in &definitions {
            let source = registry.provider_of(&def.name).unwrap_or("local");
            println!("  {:<40} [{source}] {}", def.name, first_line(&def.description));
        }
        println!("{} tool(s) available", definitions.len());
    }

    registry.shutdown().await;
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["splitbot"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "splitbot",
            "tools",
            "--json",
            "--config",
            "/tmp/tools.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Tools { json: true })));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tools.json")));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn first_line_trims_multiline_descriptions() {
        assert_eq!(first_line("Fetch a URL\nMore detail"), "Fetch a URL");
        assert_eq!(first_line(""), "");
    }
}
