use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_agent::config::AppConfig;
use triage_agent::delay::Delay;
use triage_agent::fix::FixPipeline;
use triage_agent::github::{GitHubGateway, OctocrabClient};
use triage_agent::knowledge::KnowCli;
use triage_agent::listener::{LineSource, Listener, ListenerConfig};
use triage_agent::llm::OpenAiCompatibleModel;
use triage_agent::retry::Executor;
use triage_agent::types::{IssueNumber, RepoId};
use triage_agent::webhooks::TriageHandlers;

#[derive(Debug, Parser)]
#[command(name = "triage-agent", version, about = "LLM triage and fix bot for GitHub")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Consume event envelopes (one JSON object per line on stdin) and triage them.
    Listen {
        /// Stop after this many messages.
        #[arg(long)]
        max_messages: Option<u64>,
    },

    /// Attempt to fix an issue by generating a change and opening a pull request.
    Fix {
        /// Repository as owner/name.
        repo: RepoId,
        /// Issue number.
        issue: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env().context("reading configuration")?;
    let github = OctocrabClient::from_token(config.github_token.clone())
        .context("building GitHub client")?
        .with_timeout(config.call_timeout);
    let gateway = GitHubGateway::new(github, Executor::default());

    match cli.command {
        Command::Listen { max_messages } => {
            let model = OpenAiCompatibleModel::new(
                config.triage_model.base_url.clone(),
                config.triage_model.api_key.clone(),
                config.triage_model.model.clone(),
                config.call_timeout,
            )
            .context("building triage model client")?;
            let recorder = KnowCli::new(config.know_bin.clone());
            let handlers = TriageHandlers::new(gateway, model, recorder);

            let listener_config = ListenerConfig {
                max_messages: max_messages.or(config.max_messages),
                ..ListenerConfig::default()
            };
            let source = LineSource::new(BufReader::new(tokio::io::stdin()));
            let mut listener = Listener::new(source, handlers, listener_config, Delay::tokio());

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received");
                    signal.cancel();
                }
            });

            listener.run(shutdown).await;
            Ok(ExitCode::SUCCESS)
        }

        Command::Fix { repo, issue } => {
            let model = OpenAiCompatibleModel::new(
                config.fix_model.base_url.clone(),
                config.fix_model.api_key.clone(),
                config.fix_model.model.clone(),
                config.call_timeout,
            )
            .context("building fix model client")?;
            let pipeline = FixPipeline::new(gateway, model);

            match pipeline.run(&repo, IssueNumber(issue)).await {
                Ok(outcome) => {
                    println!("{}", outcome.pull_request.html_url);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Fix attempt failed: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
