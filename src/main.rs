mod agent;
mod config;
mod error;
mod llm;
mod mode;
mod plan;
mod sandbox;
mod session;
mod tools;

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::agent::AgentRuntime;
use crate::config::Config;
use crate::llm::{Brain, GeminiClient};
use crate::sandbox::Sandbox;
use crate::session::SessionStore;
use crate::tools::ToolExecutor;

fn print_help() {
    println!(
        "\
tinker-agent v{}

A coding agent runtime that executes planner-produced tool sequences
in a filesystem sandbox with bounded auto-correction.

USAGE:
    tinker-agent [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/agent.toml]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG          Log level filter for tracing
                      (e.g. debug, tinker_agent=debug,warn)
    GEMINI_API_KEY    API key for the Gemini planner
                      (from https://aistudio.google.com/)

EXAMPLES:
    tinker-agent                        # uses config/agent.toml
    tinker-agent /etc/tinker/agent.toml # custom config path
    RUST_LOG=debug tinker-agent         # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("tinker-agent v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tinker_agent=info")),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    // Sandbox creation failure is fatal: nowhere safe to execute
    let sandbox = Sandbox::create(&config.sandbox.path)?;
    let tools = ToolExecutor::new(
        sandbox,
        config.sandbox.interpreter.clone(),
        Duration::from_secs(config.sandbox.exec_timeout_secs),
    );
    let session = SessionStore::open(&config.agent.session_path)?;
    let brain = Box::new(GeminiClient::new(config.llm.clone()));

    println!(
        "{} v{} — workspace: {}",
        config.agent.name,
        env!("CARGO_PKG_VERSION"),
        config.sandbox.path.display()
    );
    println!("Planner: {}", brain.description());
    println!("Type /help for commands, /exit to quit.");

    let mut runtime = AgentRuntime::new(config, brain, tools, session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nyou ({})> ", runtime.mode());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break, // EOF
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nbye");
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            if matches!(input, "/exit" | "/quit") {
                println!("bye");
                break;
            }
            match runtime.handle_command(input) {
                Ok(reply) => println!("{reply}"),
                Err(e) => eprintln!("error: {e:#}"),
            }
            continue;
        }

        // Ctrl-C during a request cancels it at the step boundary;
        // kill_on_drop reaps any still-running child.
        tokio::select! {
            result = runtime.process_request(input) => match result {
                Ok(response) => println!("\nagent> {response}"),
                Err(e) => eprintln!("\nerror: {e:#}"),
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n(request interrupted)");
            }
        }
    }

    Ok(())
}
