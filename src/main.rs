//! openrouter-chat: session-aware chat relay for OpenRouter
//!
//! Serves a small chat page, keeps each browser session's conversation and
//! relays every turn (with the whole history) to the OpenRouter completion API.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use openrouter_chat::{
    chat::ModelRegistry,
    config::{AppConfig, ENV_API_KEY},
    run_server,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "openrouter-chat")]
#[command(version = "0.1.0")]
#[command(about = "Session-aware chat relay for the OpenRouter API")]
#[command(long_about = "
openrouter-chat serves a chat page and relays each message, together with the
session's full conversation, to the OpenRouter completion API.

The API key is read from OPENROUTER_API_KEY; SITE_URL and SITE_NAME fill the
attribution headers of models that need them.

Example usage:
  openrouter-chat run --config config.yaml
  openrouter-chat list-models --verbose
")]
struct Cli {
    /// Path to config file (built-in defaults when omitted and none is found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override completion endpoint URL
        #[arg(long)]
        upstream_url: Option<String>,
    },

    /// List the selectable models
    ListModels {
        /// Show upstream ids and extra headers
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate configuration and environment
    CheckConfig,

    /// Test connection and credentials against the upstream API
    TestUpstream,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { port, upstream_url } => {
            run_chat(config_path, port, upstream_url).await?;
        }
        Commands::ListModels { verbose } => {
            list_models(config_path, verbose);
        }
        Commands::CheckConfig => {
            check_config(config_path);
        }
        Commands::TestUpstream => {
            test_upstream(config_path).await?;
        }
    }

    Ok(())
}

/// Run the chat server
async fn run_chat(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    upstream_url_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path);

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = upstream_url_override {
        config.upstream.url = url;
    }

    if let Err(e) = config.validate() {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }

    run_server(config).await
}

/// List the configured model table
fn list_models(config_path: Option<&Path>, verbose: bool) {
    let config = load_config_or_exit(config_path);
    let registry = match ModelRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    println!("Available models:\n");

    for model in registry.list() {
        let marker = if model.key == registry.default_key() {
            "[default]"
        } else {
            ""
        };
        if verbose {
            println!("  {} {}:", model.key, marker);
            println!("    Name:     {}", model.display_name);
            println!("    Upstream: {}", model.upstream_model_id);
            for (name, value) in &model.extra_headers {
                println!("    Header:   {}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
        } else {
            println!("  {:16} {:10} {}", model.key, marker, model.display_name);
        }
    }
}

/// Validate configuration file and environment
fn check_config(config_path: Option<&Path>) {
    let config = load_config_or_exit(config_path);

    match config.validate() {
        Ok(()) => {
            println!("✓ Configuration is valid\n");
            println!("Server:");
            println!("  Listen: {}:{}", config.server.host, config.server.port);
            println!("\nUpstream:");
            println!("  URL: {}", config.upstream.url);
            println!("  TLS: {}", if config.upstream.is_tls() { "enabled" } else { "disabled" });
            println!("  Timeout: {}s", config.upstream.timeout_seconds);
            println!("  API key: set");
            println!("  Site URL: {}", config.upstream.site_url.as_deref().unwrap_or("-"));
            println!("  Site name: {}", config.upstream.site_name.as_deref().unwrap_or("-"));
            println!("\nSessions:");
            println!("  Cookie: {}", config.session.cookie_name);
            println!("  TTL: {}s", config.session.ttl_seconds);
            println!("  Max sessions: {}", config.session.max_sessions);
            println!("\nChat:");
            println!("  Default model: {}", config.chat.default_model);
            match config.chat.max_history_turns {
                Some(cap) => println!("  History cap: {} turns", cap),
                None => println!("  History cap: none"),
            }
            println!("  Models: {}", config.models.len());
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Test connection to the upstream API
async fn test_upstream(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(config_path);

    let api_key = match config.upstream.api_key() {
        Some(key) => key.to_string(),
        None => {
            eprintln!("✗ {} is not set", ENV_API_KEY);
            std::process::exit(1);
        }
    };

    let models_url = match config.upstream.models_url() {
        Some(url) => url,
        None => {
            println!("Upstream URL does not end in /chat/completions; nothing to probe");
            return Ok(());
        }
    };

    println!("Testing connection to upstream: {}", models_url);

    let client = openrouter_chat::upstream::build_http_client(&config.upstream)?;

    match client.get(&models_url).bearer_auth(&api_key).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("✓ Upstream is reachable");
                println!("  Status: {}", resp.status());

                if let Ok(json) = resp.json::<serde_json::Value>().await {
                    if let Some(data) = json.get("data").and_then(|d| d.as_array()) {
                        println!("  Available models: {}", data.len());
                    }
                }
            } else {
                println!("✗ Upstream returned error status: {}", resp.status());
            }
        }
        Err(e) => {
            println!("✗ Failed to connect to upstream: {}", e);
            std::process::exit(1);
        }
    }

    let registry = ModelRegistry::from_config(&config)?;
    println!("\nConfigured models:");
    for model in registry.list() {
        println!("  - {} ({})", model.key, model.upstream_model_id);
    }

    Ok(())
}

/// Load configuration plus environment overrides, or exit with error
fn load_config_or_exit(config_path: Option<&Path>) -> AppConfig {
    match AppConfig::load_or_default(config_path) {
        Ok(mut config) => {
            config.apply_env_overrides();
            config
        }
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nPass --config <file> or omit it to use the built-in defaults.");
            std::process::exit(1);
        }
    }
}
