use crate::board::Board;
use crate::commands::display_name;
use crate::commands::poll::{leaderboard_embed, vote_buttons};
use crate::error::{BoardError, Result};
use crate::handlers::respond_component_ephemeral;
use crate::voting::tally::tally;
use log::{error, info};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::prelude::*;

pub async fn handle_vote_button(
    board: &Board,
    ctx: &Context,
    component: &MessageComponentInteraction,
    poll_id: &str,
    team_index: usize,
) -> Result<()> {
    let user_id = component.user.id.to_string();
    let poll = board.database.get_poll(poll_id).await?;

    if !poll.is_active {
        return Err(BoardError::PollClosed {
            poll_id: poll.id.clone(),
        });
    }

    let Some(team) = poll.teams.get(team_index) else {
        return Err(BoardError::validation("That team is not part of this poll."));
    };

    // The unique (poll_id, user_id) constraint still guards the insert below
    if board.database.get_user_vote(&poll.id, &user_id).await?.is_some() {
        return Err(BoardError::DuplicateVote {
            poll_id: poll.id.clone(),
            user_id,
        });
    }

    let user_name = display_name(&component.user, component.member.as_ref());
    match board.database.cast_vote(&poll, &user_id, &user_name, team).await {
        Ok(vote) => info!(
            "Recorded vote {}: {} -> '{}' in poll {}",
            vote.id, user_id, team, poll.id
        ),
        Err(
            e @ (BoardError::DuplicateVote { .. }
            | BoardError::PollClosed { .. }
            | BoardError::UnknownCandidate { .. }),
        ) => {
            return Err(e);
        }
        Err(e) => {
            error!("Failed to record vote by {} in poll {}: {}", user_id, poll.id, e);
            respond_component_ephemeral(ctx, component, "Failed to record vote").await?;
            return Ok(());
        }
    }

    // Refresh the shared leaderboard the button lives on
    let votes = board.database.get_poll_votes(&poll.id).await?;
    let result = tally(&poll.teams, &votes, Some(&user_id));

    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| leaderboard_embed(e, &poll, &result))
                        .components(|c| vote_buttons(c, &poll))
                })
        })
        .await?;

    component
        .create_followup_message(&ctx.http, |followup| {
            followup
                .content(format!("Vote recorded successfully! You voted: {}", team))
                .ephemeral(true)
        })
        .await
        .map_err(BoardError::Followup)?;

    Ok(())
}
