use clap::{Args, Parser, Subcommand};

use crate::commands::reminder::{ScheduleArgs, ScheduleTarget};
use crate::commands::{parse_address, parse_json, schedule_duration};
use crate::error::CliResult;
use crate::CommandContext;
use dapr_actors::TimerRegistration;

#[derive(Debug, Parser)]
pub struct TimerArgs {
    #[command(subcommand)]
    pub command: TimerCommand,
}

#[derive(Debug, Subcommand)]
pub enum TimerCommand {
    /// Register or replace a timer
    Register(TimerRegisterArgs),

    /// Unregister a timer; unknown names are ignored
    Unregister(ScheduleTarget),
}

#[derive(Debug, Args)]
pub struct TimerRegisterArgs {
    #[command(flatten)]
    pub target: ScheduleTarget,

    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Actor method called on each firing
    #[arg(long)]
    pub callback: Option<String>,
}

pub async fn execute_async(args: &TimerArgs, ctx: &CommandContext) -> CliResult<()> {
    let interactor = ctx.interactor()?;

    match &args.command {
        TimerCommand::Register(register) => {
            let target = &register.target;
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            let timer = TimerRegistration {
                name: target.name.clone(),
                due_time: schedule_duration("due", &register.schedule.due)?,
                period: schedule_duration("period", &register.schedule.period)?,
                data: match &register.schedule.data {
                    Some(data) => Some(parse_json("data", data)?),
                    None => None,
                },
                callback: register.callback.clone(),
            };

            interactor
                .register_timer(&address, &timer, &ctx.shutdown_token)
                .await?;
            ctx.output
                .output(&target.change("Registered timer"), ctx.json)
        }
        TimerCommand::Unregister(target) => {
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            interactor
                .unregister_timer(&address, &target.name, &ctx.shutdown_token)
                .await?;
            ctx.output
                .output(&target.change("Unregistered timer"), ctx.json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::cancelled_context;
    use crate::error::CliError;
    use dapr_actors::ActorError;

    #[tokio::test]
    async fn test_unregister_empty_name() {
        let args = TimerArgs {
            command: TimerCommand::Unregister(ScheduleTarget {
                actor_type: "DemoActor".to_string(),
                actor_id: "abc".to_string(),
                name: " ".to_string(),
            }),
        };
        let result = execute_async(&args, &cancelled_context()).await;
        assert!(matches!(
            result,
            Err(CliError::Actor(ActorError::InvalidRegistration { .. }))
        ));
    }
}
