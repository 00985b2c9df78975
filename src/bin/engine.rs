use std::env;
use std::io::{self, Read};
use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use deedbook::config::EngineServerConfig;
use deedbook::engine::{service, AnalysisInput, RuleEngine};

const USAGE: &str = "Usage: engine <evaluate|serve>";

/// Exit status for input the engine cannot analyze.
const EXIT_BAD_INPUT: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("evaluate") => evaluate_stdin()?,
        Some("serve") => serve().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn evaluate_stdin() -> Result<()> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read deed payload from stdin")?;

    let payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("invalid JSON input: {err}");
            std::process::exit(EXIT_BAD_INPUT);
        }
    };
    let input = match AnalysisInput::from_payload(&payload) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(EXIT_BAD_INPUT);
        }
    };

    let evaluation = RuleEngine::new().evaluate(&input);
    tracing::debug!(outcome = evaluation.outcome.code(), "deed evaluated");
    println!("{}", serde_json::to_string(&evaluation.to_response())?);
    Ok(())
}

async fn serve() -> Result<()> {
    let config = EngineServerConfig::from_env()?;
    let listen_addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(component = "engine", "listening on {}", listen_addr);

    axum::serve(listener, service::router())
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!(component = "engine", "received shutdown signal");
            }
        })
        .await?;
    Ok(())
}

/// Logs go to stderr so `evaluate` keeps stdout for the verdict.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
