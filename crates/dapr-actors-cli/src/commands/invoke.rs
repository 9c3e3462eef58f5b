use bytes::Bytes;
use clap::Parser;
use tracing::debug;

use crate::commands::{parse_address, parse_json};
use crate::error::CliResult;
use crate::output::{decode_payload, InvocationResult};
use crate::CommandContext;

#[derive(Debug, Parser)]
pub struct InvokeArgs {
    /// Registered actor type
    pub actor_type: String,

    /// Actor instance ID
    pub actor_id: String,

    /// Method to call
    pub method: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}

pub async fn execute_async(args: &InvokeArgs, ctx: &CommandContext) -> CliResult<()> {
    let address = parse_address(&args.actor_type, &args.actor_id)?;
    let payload = match &args.data {
        Some(data) => parse_json("data", data)?,
        None => Bytes::new(),
    };

    debug!("Invoking {} on {}", args.method, address);

    let interactor = ctx.interactor()?;
    let response = interactor
        .invoke_without_remoting(&address, &args.method, payload, &ctx.shutdown_token)
        .await?;

    let result = InvocationResult {
        actor_type: args.actor_type.clone(),
        actor_id: args.actor_id.clone(),
        method: args.method.clone(),
        response: decode_payload(&response),
    };
    ctx.output.output(&result, ctx.json)
}
