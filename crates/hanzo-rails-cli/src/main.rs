//! Screen a query from the command line.
//!
//! Prints the client response as JSON on stdout and exits with 0 when the
//! query passes, 1 when it is blocked and 2 when processing fails. Logs go
//! to stderr (`RUST_LOG` controls the level).

use anyhow::{Context, Result};
use clap::Parser;
use hanzo_rails::engine::ChatCompletionsEngine;
use hanzo_rails::tagger::PatternTagger;
use hanzo_rails::config::EngineConfig;
use hanzo_rails::{ErrorResponse, Rails, RailsConfig, RequestContext};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

/// Query screening arguments
#[derive(Parser, Debug)]
#[command(name = "hanzo-rails")]
#[command(about = "Check a query against blocked topics and mask PII")]
struct Args {
    /// Query to check; read from stdin when omitted or "-"
    query: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "HANZO_RAILS_CONFIG")]
    config: Option<PathBuf>,

    /// Blocked topic (repeatable); replaces the configured list
    #[arg(short, long = "topic")]
    topics: Vec<String>,

    /// User id recorded in the audit log
    #[arg(long)]
    user: Option<String>,

    /// Session id recorded in the audit log
    #[arg(long)]
    session: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> Result<RailsConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = RailsConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.engine = config.engine.merge_env();
            config
        }
        None => RailsConfig {
            engine: EngineConfig::from_env(),
            ..Default::default()
        },
    };
    if !args.topics.is_empty() {
        config.topics.blocked_topics = args.topics.clone();
    }
    Ok(config)
}

fn build_rails(config: RailsConfig) -> Result<Rails> {
    let engine = ChatCompletionsEngine::new(config.engine.clone(), &config.topics)
        .context("initializing policy engine")?;
    let tagger = PatternTagger::new().context("initializing entity tagger")?;

    let rails = Rails::builder()
        .config(config)
        .engine(Arc::new(engine))
        .tagger(Arc::new(tagger))
        .build()?;
    Ok(rails)
}

fn read_query(args: &Args) -> Result<String> {
    match args.query.as_deref() {
        Some(query) if query != "-" => Ok(query.to_string()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading query from stdin")?;
            Ok(buf.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Startup failures are fatal
    let rails = build_rails(load_config(&args)?)?;
    let query = read_query(&args)?;

    let mut context = RequestContext::new();
    if let Some(user) = &args.user {
        context = context.with_user_id(user.clone());
    }
    if let Some(session) = &args.session {
        context = context.with_session_id(session.clone());
    }

    match rails.run_check_with_context(&query, &context).await {
        Ok(outcome) => {
            print_json(&outcome.to_response(), args.pretty)?;
            Ok(if outcome.is_blocked() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Err(e) => {
            error!(request_id = %context.request_id, error = %e, "Guardrail check failed");
            print_json(&ErrorResponse::processing_failed(), args.pretty)?;
            Ok(ExitCode::from(2))
        }
    }
}
