use crate::board::Board;
use crate::commands::news::{PostView, like_ack, like_button, post_embed};
use crate::error::{BoardError, Result};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::prelude::*;

pub async fn handle_like_button(
    board: &Board,
    ctx: &Context,
    component: &MessageComponentInteraction,
    post_id: i64,
) -> Result<()> {
    let user_id = component.user.id.to_string();
    let summary = board.database.toggle_like(post_id, &user_id).await?;
    let view = PostView::load(&board.database, post_id, Some(&user_id)).await?;

    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| post_embed(e, &view))
                        .components(|c| like_button(c, &view))
                })
        })
        .await?;

    component
        .create_followup_message(&ctx.http, |followup| {
            followup.content(like_ack(post_id, summary)).ephemeral(true)
        })
        .await
        .map_err(BoardError::Followup)?;

    Ok(())
}
