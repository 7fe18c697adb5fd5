use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "watson-relay")]
#[command(about = "Watson Assistant webhook relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server (GET /, POST /chat, GET /openapi.json).
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.watson-relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listening port (default: PORT env, then config, then 8080)
        #[arg(long, short)]
        port: Option<u16>,

        /// Bind address (default from config or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Chat with a running relay the way Watson Assistant calls it, carrying context between turns.
    Chat {
        /// Base URL of the relay
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Print the returned context after each reply.
        #[arg(long)]
        show_context: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("watson-relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port, bind }) => {
            if let Err(e) = run_serve(config, port, bind).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { url, show_context }) => {
            if let Err(e) = run_chat(url, show_context).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
    bind: Option<String>,
) -> anyhow::Result<()> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    log::debug!("config path: {}", path.display());
    relay::config::apply_env_overrides(&mut config);
    if let Some(p) = port {
        config.server.port = p;
    }
    if let Some(b) = bind {
        config.server.bind = b;
    }
    log::info!("starting relay on {}:{}", config.server.bind, config.server.port);
    relay::webhook::run_server(config).await
}

async fn run_chat(url: String, show_context: bool) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let endpoint = format!("{}/chat", url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let mut context = Map::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/reset") {
            context.clear();
            println!("context cleared.");
            continue;
        }

        let body = json!({ "text": input, "context": context });
        let reply: Value = match client.post(&endpoint).json(&body).send().await {
            Ok(res) => res.json().await?,
            Err(e) => {
                eprintln!("chat error: {}", e);
                continue;
            }
        };
        println!("< {}", reply.get("text").and_then(Value::as_str).unwrap_or("").trim());
        if let Some(Value::Object(returned)) = reply.get("context") {
            context = returned.clone();
            if show_context {
                println!("  context: {}", Value::Object(context.clone()));
            }
        }
    }
    Ok(())
}
