mod like;
mod vote;

use crate::board::Board;
use crate::commands;
use crate::error::{BoardError, Result};
use log::{error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::prelude::*;

pub fn vote_custom_id(poll_id: &str, team_index: usize) -> String {
    format!("vote_{}_{}", poll_id, team_index)
}

pub fn like_custom_id(post_id: i64) -> String {
    format!("like_{}", post_id)
}

#[derive(Debug, PartialEq, Eq)]
enum ComponentAction {
    Vote { poll_id: String, team_index: usize },
    Like { post_id: i64 },
}

fn parse_custom_id(custom_id: &str) -> Option<ComponentAction> {
    if let Some(rest) = custom_id.strip_prefix("vote_") {
        // Format: vote_<poll_id>_<team_index>
        let (poll_id, index) = rest.rsplit_once('_')?;
        if poll_id.is_empty() {
            return None;
        }
        let team_index = index.parse().ok()?;
        Some(ComponentAction::Vote {
            poll_id: poll_id.to_string(),
            team_index,
        })
    } else if let Some(rest) = custom_id.strip_prefix("like_") {
        // Format: like_<post_id>
        Some(ComponentAction::Like {
            post_id: rest.parse().ok()?,
        })
    } else {
        None
    }
}

// Handle slash commands
pub async fn handle_command(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    info!("Received command: {} from {}", command.data.name, command.user.id);

    // Everything but the gate itself needs an unlocked member
    if command.data.name != "unlock" {
        board
            .gate
            .require_unlocked(&board.database, &command.user.id.to_string())
            .await?;
    }

    match command.data.name.as_str() {
        "unlock" => commands::unlock::handle_unlock_command(board, ctx, command).await?,
        "poll" => commands::poll::handle_poll_command(board, ctx, command).await?,
        "news" => commands::news::handle_news_command(board, ctx, command).await?,
        "profile" => commands::profile::handle_profile_command(board, ctx, command).await?,
        _ => commands::respond_ephemeral(ctx, command, "Unknown command").await?,
    }
    Ok(())
}

pub async fn handle_component(
    board: &Board,
    ctx: &Context,
    component: &MessageComponentInteraction,
) -> Result<()> {
    let custom_id = &component.data.custom_id;
    info!("Received component interaction: {} from {}", custom_id, component.user.id);

    let Some(action) = parse_custom_id(custom_id) else {
        warn!("Unhandled component custom_id: {}", custom_id);
        respond_component_ephemeral(ctx, component, "Unknown button action.").await?;
        return Ok(());
    };

    board
        .gate
        .require_unlocked(&board.database, &component.user.id.to_string())
        .await?;

    match action {
        ComponentAction::Vote { poll_id, team_index } => {
            vote::handle_vote_button(board, ctx, component, &poll_id, team_index).await?
        }
        ComponentAction::Like { post_id } => {
            like::handle_like_button(board, ctx, component, post_id).await?
        }
    }
    Ok(())
}

pub async fn handle_interaction(board: &Board, ctx: &Context, interaction: Interaction) {
    match interaction {
        Interaction::ApplicationCommand(command) => {
            if let Err(why) = handle_command(board, ctx, &command).await {
                log_failure(&why);
                if why.response_sent() {
                    return;
                }
                let sent = commands::respond_ephemeral(ctx, &command, &why.user_message()).await;
                if let Err(e) = sent {
                    error!("Could not report error to user: {:?}", e);
                }
            }
        }
        Interaction::MessageComponent(component) => {
            if let Err(why) = handle_component(board, ctx, &component).await {
                log_failure(&why);
                if why.response_sent() {
                    return;
                }
                let sent = respond_component_ephemeral(ctx, &component, &why.user_message()).await;
                if let Err(e) = sent {
                    error!("Could not report error to user: {:?}", e);
                }
            }
        }
        _ => {
            warn!("Unhandled interaction type: {:?}", interaction.kind());
        }
    }
}

/// User mistakes are routine; anything else is a real failure.
fn log_failure(err: &BoardError) {
    match err {
        BoardError::Database(_)
        | BoardError::Discord(_)
        | BoardError::Followup(_)
        | BoardError::Serialization(_)
        | BoardError::Timestamp { .. } => error!("Interaction handler error: {:?}", err),
        _ => info!("Interaction rejected: {}", err),
    }
}

pub(crate) async fn respond_component_ephemeral(
    ctx: &Context,
    component: &MessageComponentInteraction,
    content: &str,
) -> std::result::Result<(), serenity::Error> {
    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_ids_round_trip() {
        let id = vote_custom_id("4f1c2a9e-0b7d-4c55-9a43-1d2e3f405060", 13);
        assert_eq!(
            parse_custom_id(&id),
            Some(ComponentAction::Vote {
                poll_id: "4f1c2a9e-0b7d-4c55-9a43-1d2e3f405060".to_string(),
                team_index: 13,
            })
        );
    }

    #[test]
    fn like_ids_parse() {
        assert_eq!(
            parse_custom_id(&like_custom_id(42)),
            Some(ComponentAction::Like { post_id: 42 })
        );
    }

    #[test]
    fn malformed_ids_are_ignored() {
        assert_eq!(parse_custom_id("vote_abc"), None);
        assert_eq!(parse_custom_id("vote__3"), None);
        assert_eq!(parse_custom_id("vote_abc_x"), None);
        assert_eq!(parse_custom_id("like_"), None);
        assert_eq!(parse_custom_id("star_1_2_3"), None);
    }
}
