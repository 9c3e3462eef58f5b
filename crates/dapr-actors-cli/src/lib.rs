pub mod commands;
pub mod config;
pub mod error;
pub mod output;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use dapr_actors::ActorInteractor;

/// dapr-actors - invoke methods, inspect state and manage schedules of actors
/// hosted behind a Dapr sidecar.
#[derive(Debug, Parser)]
#[command(name = "dapr-actors")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Turn on verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Display output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Sidecar HTTP endpoint, overriding configuration and environment
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Invoke an actor method with a JSON body
    #[command(name = "invoke")]
    Invoke(commands::invoke::InvokeArgs),

    /// Read, write or remove actor state
    #[command(name = "state")]
    State(commands::state::StateArgs),

    /// Manage durable reminders
    #[command(name = "reminder")]
    Reminder(commands::reminder::ReminderArgs),

    /// Manage activation-scoped timers
    #[command(name = "timer")]
    Timer(commands::timer::TimerArgs),
}

/// Run the CLI asynchronously with cancellation support
pub async fn run(
    cli: Cli,
    mut config: config::Config,
    shutdown_token: CancellationToken,
) -> anyhow::Result<()> {
    if let Some(endpoint) = &cli.endpoint {
        config.sidecar.http_endpoint = endpoint.clone();
    }

    let output = output::OutputManager::new(config.output.clone());

    let ctx = CommandContext {
        config,
        output,
        verbose: cli.verbose,
        json: cli.json,
        shutdown_token: shutdown_token.clone(),
    };

    let command_future = async {
        match &cli.command {
            Commands::Invoke(args) => commands::invoke::execute_async(args, &ctx).await,
            Commands::State(args) => commands::state::execute_async(args, &ctx).await,
            Commands::Reminder(args) => commands::reminder::execute_async(args, &ctx).await,
            Commands::Timer(args) => commands::timer::execute_async(args, &ctx).await,
        }
    };

    // The token is also handed to every operation, so this only matters if a
    // command stops listening to it
    let result = tokio::select! {
        result = command_future => result,
        _ = shutdown_token.cancelled() => {
            return Err(anyhow::anyhow!("Operation cancelled"));
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("Command failed ({}): {}", e.category(), e);
            let mut message = e.user_message();
            if e.is_retryable() {
                message.push_str("\n\nThis failure may be temporary; running the command again may succeed.");
            }
            ctx.output.error(&message)?;
            if ctx.verbose {
                eprintln!("\nDebug info: {:?}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Shared context for command execution
pub struct CommandContext {
    pub config: config::Config,
    pub output: output::OutputManager,
    pub verbose: bool,
    pub json: bool,
    pub shutdown_token: CancellationToken,
}

impl CommandContext {
    /// Create an interactor for the configured sidecar
    pub fn interactor(&self) -> error::CliResult<ActorInteractor> {
        Ok(ActorInteractor::from_config(&self.config.sidecar)?)
    }
}
