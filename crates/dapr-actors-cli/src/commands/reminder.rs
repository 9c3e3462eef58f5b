use clap::{Args, Parser, Subcommand};

use crate::commands::{parse_address, parse_json, schedule_duration};
use crate::error::CliResult;
use crate::output::ChangeResult;
use crate::CommandContext;
use dapr_actors::ReminderRegistration;

#[derive(Debug, Parser)]
pub struct ReminderArgs {
    #[command(subcommand)]
    pub command: ReminderCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReminderCommand {
    /// Register or replace a reminder
    Register(ReminderRegisterArgs),

    /// Unregister a reminder; unknown names are ignored
    Unregister(ScheduleTarget),
}

/// Actor and schedule name shared by reminder and timer commands
#[derive(Debug, Args)]
pub struct ScheduleTarget {
    /// Registered actor type
    pub actor_type: String,

    /// Actor instance ID
    pub actor_id: String,

    /// Reminder or timer name
    pub name: String,
}

/// Timing and payload shared by reminder and timer registration
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Delay before the first firing, e.g. "5s" or "1m 30s"
    #[arg(long, default_value = "0s")]
    pub due: humantime::Duration,

    /// Interval between firings
    #[arg(long)]
    pub period: humantime::Duration,

    /// JSON data delivered with every firing
    #[arg(short, long)]
    pub data: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReminderRegisterArgs {
    #[command(flatten)]
    pub target: ScheduleTarget,

    #[command(flatten)]
    pub schedule: ScheduleArgs,
}

impl ScheduleTarget {
    pub(crate) fn change(&self, action: &'static str) -> ChangeResult {
        ChangeResult {
            action,
            actor_type: self.actor_type.clone(),
            actor_id: self.actor_id.clone(),
            target: self.name.clone(),
        }
    }
}

pub async fn execute_async(args: &ReminderArgs, ctx: &CommandContext) -> CliResult<()> {
    let interactor = ctx.interactor()?;

    match &args.command {
        ReminderCommand::Register(register) => {
            let target = &register.target;
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            let reminder = ReminderRegistration {
                name: target.name.clone(),
                due_time: schedule_duration("due", &register.schedule.due)?,
                period: schedule_duration("period", &register.schedule.period)?,
                data: match &register.schedule.data {
                    Some(data) => Some(parse_json("data", data)?),
                    None => None,
                },
            };

            interactor
                .register_reminder(&address, &reminder, &ctx.shutdown_token)
                .await?;
            ctx.output
                .output(&target.change("Registered reminder"), ctx.json)
        }
        ReminderCommand::Unregister(target) => {
            let address = parse_address(&target.actor_type, &target.actor_id)?;
            interactor
                .unregister_reminder(&address, &target.name, &ctx.shutdown_token)
                .await?;
            ctx.output
                .output(&target.change("Unregistered reminder"), ctx.json)
        }
    }
}
