use crate::board::Board;
use crate::commands::{display_name, option_str, respond_ephemeral};
use crate::error::Result;
use log::{info, warn};
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::*;

pub fn create_unlock_command(
    command: &mut CreateApplicationCommand,
) -> &mut CreateApplicationCommand {
    command
        .name("unlock")
        .description("Enter the board password to get access")
        .create_option(|option| {
            option
                .name("password")
                .description("The members' password")
                .kind(CommandOptionType::String)
                .required(true)
        })
}

pub async fn handle_unlock_command(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let user_id = command.user.id.to_string();
    let attempt = option_str(&command.data.options, "password").unwrap_or_default();

    if !board.gate.check(attempt) {
        warn!("Failed unlock attempt by {}", user_id);
        respond_ephemeral(ctx, command, "Incorrect password. Please try again.").await?;
        return Ok(());
    }

    let name = display_name(&command.user, command.member.as_ref());
    board
        .database
        .unlock_member(&user_id, &name, command.user.avatar_url().as_deref())
        .await?;
    info!("{} ({}) unlocked the board", name, user_id);

    respond_ephemeral(
        ctx,
        command,
        "Welcome! You now have access to news, comments and the team poll.",
    )
    .await?;
    Ok(())
}
