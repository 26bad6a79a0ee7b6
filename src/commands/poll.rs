use crate::board::Board;
use crate::commands::{respond_ephemeral, truncate};
use crate::error::{BoardError, Result};
use crate::handlers::vote_custom_id;
use crate::models::Poll;
use crate::voting::Tally;
use crate::voting::leaderboard::{ranking_lines, total_line, voter_badge};
use crate::voting::tally::tally;
use log::info;
use serenity::builder::{CreateApplicationCommand, CreateComponents, CreateEmbed};
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::permissions::Permissions;
use serenity::prelude::*;

const BUTTONS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;
const MAX_BUTTON_LABEL: usize = 80;

pub fn create_poll_command(
    command: &mut CreateApplicationCommand,
) -> &mut CreateApplicationCommand {
    command
        .name("poll")
        .description("Team popularity poll")
        .create_option(|option| {
            option
                .name("show")
                .description("Show the team rankings and vote")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("end")
                .description("Close the current poll (moderators only)")
                .kind(CommandOptionType::SubCommand)
        })
}

pub async fn handle_poll_command(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let subcommand_name = match command.data.options.first() {
        Some(option) => option.name.as_str(),
        None => {
            respond_ephemeral(ctx, command, "No subcommand provided").await?;
            return Ok(());
        }
    };

    match subcommand_name {
        "show" => handle_show_poll(board, ctx, command).await?,
        "end" => handle_end_poll(board, ctx, command).await?,
        _ => respond_ephemeral(ctx, command, "Unknown subcommand").await?,
    }

    Ok(())
}

async fn handle_show_poll(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let user_id = command.user.id.to_string();
    let poll = board
        .database
        .get_or_create_active_poll(&board.poll_defaults)
        .await?;
    let votes = board.database.get_poll_votes(&poll.id).await?;
    let result = tally(&poll.teams, &votes, Some(&user_id));

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| leaderboard_embed(e, &poll, &result))
                        .components(|c| vote_buttons(c, &poll))
                })
        })
        .await?;

    // The leaderboard is shared; the member's own vote is told to them alone
    if let Some(badge) = voter_badge(&result) {
        command
            .create_followup_message(&ctx.http, |followup| {
                followup.content(badge).ephemeral(true)
            })
            .await
            .map_err(BoardError::Followup)?;
    }

    Ok(())
}

async fn handle_end_poll(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let is_moderator = command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.contains(Permissions::MANAGE_GUILD));

    if !is_moderator {
        respond_ephemeral(ctx, command, "Only moderators can end the poll.").await?;
        return Ok(());
    }

    let Some(mut poll) = board.database.get_active_poll().await? else {
        respond_ephemeral(ctx, command, "There is no active poll.").await?;
        return Ok(());
    };

    if !board.database.end_poll(&poll.id).await? {
        respond_ephemeral(ctx, command, "This poll has already ended.").await?;
        return Ok(());
    }
    poll.is_active = false;
    info!("Poll {} ended by {}", poll.id, command.user.id);

    let votes = board.database.get_poll_votes(&poll.id).await?;
    let result = tally(&poll.teams, &votes, None);

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message
                        .content("The poll has ended. Final standings:")
                        .embed(|e| leaderboard_embed(e, &poll, &result))
                        .components(|c| vote_buttons(c, &poll))
                })
        })
        .await?;

    Ok(())
}

pub(crate) fn leaderboard_embed<'a>(
    embed: &'a mut CreateEmbed,
    poll: &Poll,
    result: &Tally,
) -> &'a mut CreateEmbed {
    let mut description = String::new();
    if !poll.description.is_empty() {
        description.push_str(&poll.description);
        description.push_str("\n\n");
    }
    description.push_str(&ranking_lines(result));

    let footer = if poll.is_active {
        total_line(result)
    } else {
        format!("{} · poll closed", total_line(result))
    };

    embed
        .title(format!("🏆 {}", poll.title))
        .description(description)
        .colour(if poll.is_active { 0xF1C40F_u32 } else { 0x95A5A6_u32 })
        .footer(|f| f.text(footer))
}

/// One button per team in roster order, five to a row.
pub(crate) fn vote_buttons<'a>(
    components: &'a mut CreateComponents,
    poll: &Poll,
) -> &'a mut CreateComponents {
    for (row_index, chunk) in poll.teams.chunks(BUTTONS_PER_ROW).take(MAX_ROWS).enumerate() {
        components.create_action_row(|row| {
            for (offset, team) in chunk.iter().enumerate() {
                let team_index = row_index * BUTTONS_PER_ROW + offset;
                row.create_button(|button| {
                    button
                        .custom_id(vote_custom_id(&poll.id, team_index))
                        .label(truncate(team, MAX_BUTTON_LABEL))
                        .style(ButtonStyle::Primary)
                        .disabled(!poll.is_active)
                });
            }
            row
        });
    }
    components
}
