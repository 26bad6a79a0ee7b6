use crate::board::Board;
use crate::commands::{option_attachment, option_str, option_user, respond_ephemeral, truncate};
use crate::error::Result;
use crate::models::ProfileEdit;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::*;

const RECENT_POSTS: u32 = 5;

pub fn create_profile_command(
    command: &mut CreateApplicationCommand,
) -> &mut CreateApplicationCommand {
    command
        .name("profile")
        .description("Member profiles")
        .create_option(|option| {
            option
                .name("show")
                .description("Show a member's profile")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("user")
                        .description("Member to look up (defaults to you)")
                        .kind(CommandOptionType::User)
                })
        })
        .create_option(|option| {
            option
                .name("edit")
                .description("Update your profile")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("name")
                        .description("Display name")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("bio")
                        .description("A few words about you")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("picture")
                        .description("Profile picture")
                        .kind(CommandOptionType::Attachment)
                })
        })
}

pub async fn handle_profile_command(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let Some(subcommand) = command.data.options.first() else {
        respond_ephemeral(ctx, command, "No subcommand provided").await?;
        return Ok(());
    };
    let options = subcommand.options.as_slice();

    match subcommand.name.as_str() {
        "show" => handle_show_profile(board, ctx, command, options).await?,
        "edit" => handle_edit_profile(board, ctx, command, options).await?,
        _ => respond_ephemeral(ctx, command, "Unknown subcommand").await?,
    }

    Ok(())
}

async fn handle_show_profile(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let user = option_user(options, "user").unwrap_or(&command.user);
    let user_id = user.id.to_string();

    let Some(member) = board.database.get_member(&user_id).await? else {
        let message = format!("{} hasn't joined the board yet.", user.name);
        respond_ephemeral(ctx, command, &message).await?;
        return Ok(());
    };

    let stats = board.database.member_stats(&user_id).await?;
    let posts = board.database.list_posts_by_author(&user_id, RECENT_POSTS).await?;
    let last_vote = board.database.list_votes_by_user(&user_id).await?.into_iter().next();
    let last_comment = board
        .database
        .list_comments_by_author(&user_id, 1)
        .await?
        .into_iter()
        .next();

    let recent_posts = if posts.is_empty() {
        "No posts yet.".to_string()
    } else {
        posts
            .iter()
            .map(|p| format!("**#{}** {}", p.id, truncate(&p.title, 80)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let bio = if member.bio.is_empty() {
        "No bio yet."
    } else {
        member.bio.as_str()
    };

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.embed(|e| {
                        e.title(&member.name)
                            .description(bio)
                            .field("Posts", stats.posts, true)
                            .field("Comments", stats.comments, true)
                            .field("Likes received", stats.likes_received, true)
                            .field("Votes cast", stats.votes, true)
                            .field("Recent posts", truncate(&recent_posts, 1024), false)
                            .footer(|f| {
                                let since = member.unlocked_at.unwrap_or(member.created_at);
                                f.text(format!("Member since {}", since.format("%Y-%m-%d")))
                            });
                        if let Some(vote) = &last_vote {
                            e.field("Latest vote", &vote.team_name, true);
                        }
                        if let Some(comment) = &last_comment {
                            e.field(
                                "Latest comment",
                                format!(
                                    "On **#{}**: {}",
                                    comment.post_id,
                                    truncate(&comment.content, 200)
                                ),
                                false,
                            );
                        }
                        if let Some(url) = &member.profile_pic_url {
                            e.thumbnail(url);
                        }
                        e
                    })
                })
        })
        .await?;

    Ok(())
}

async fn handle_edit_profile(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let edit = ProfileEdit {
        name: option_str(options, "name").map(str::to_string),
        bio: option_str(options, "bio").map(str::to_string),
        profile_pic_url: option_attachment(options, "picture").map(|a| a.url.clone()),
    };

    if edit.name.is_none() && edit.bio.is_none() && edit.profile_pic_url.is_none() {
        respond_ephemeral(ctx, command, "Nothing to update.").await?;
        return Ok(());
    }

    board
        .database
        .update_profile(&command.user.id.to_string(), edit)
        .await?;

    respond_ephemeral(ctx, command, "Profile updated successfully!").await?;
    Ok(())
}
