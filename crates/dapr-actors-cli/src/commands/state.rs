use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::commands::{parse_address, parse_json};
use crate::error::CliResult;
use crate::output::{decode_payload, ChangeResult, StateValue};
use crate::CommandContext;

#[derive(Debug, Parser)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Read the value stored under a key
    Get(StateKeyArgs),

    /// Store a JSON value under a key
    Set(StateSetArgs),

    /// Remove a key
    Remove(StateKeyArgs),
}

#[derive(Debug, Args)]
pub struct StateKeyArgs {
    /// Registered actor type
    pub actor_type: String,

    /// Actor instance ID
    pub actor_id: String,

    /// State key
    pub key: String,
}

#[derive(Debug, Args)]
pub struct StateSetArgs {
    #[command(flatten)]
    pub target: StateKeyArgs,

    /// JSON value to store; `null` clears the key
    pub value: String,
}

pub async fn execute_async(args: &StateArgs, ctx: &CommandContext) -> CliResult<()> {
    let interactor = ctx.interactor()?;

    match &args.command {
        StateCommand::Get(target) => {
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            debug!("Reading state '{}' from {}", target.key, address);

            let value = interactor
                .get_state(&address, &target.key, &ctx.shutdown_token)
                .await?;

            let result = StateValue {
                actor_type: target.actor_type.clone(),
                actor_id: target.actor_id.clone(),
                key: target.key.clone(),
                value: value.as_deref().and_then(decode_payload),
            };
            ctx.output.output(&result, ctx.json)
        }
        StateCommand::Set(set) => {
            let target = &set.target;
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            let value = parse_json("value", &set.value)?;

            interactor
                .save_state(&address, &target.key, Some(value), &ctx.shutdown_token)
                .await?;

            ctx.output
                .output(&change("Saved", target), ctx.json)
        }
        StateCommand::Remove(target) => {
            let address = parse_address(&target.actor_type, &target.actor_id)?;

            interactor
                .remove_state(&address, &target.key, &ctx.shutdown_token)
                .await?;

            ctx.output
                .output(&change("Removed", target), ctx.json)
        }
    }
}

fn change(action: &'static str, target: &StateKeyArgs) -> ChangeResult {
    ChangeResult {
        action,
        actor_type: target.actor_type.clone(),
        actor_id: target.actor_id.clone(),
        target: target.key.clone(),
    }
}
