pub mod news;
pub mod poll;
pub mod profile;
pub mod unlock;

use serenity::model::application::command::Command;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption, CommandDataOptionValue,
};
use serenity::model::channel::Attachment;
use serenity::model::guild::Member;
use serenity::model::user::User;
use serenity::prelude::*;

/// Registers every slash command globally.
pub async fn register_commands(ctx: &Context) -> Result<Vec<Command>, serenity::Error> {
    Command::set_global_application_commands(&ctx.http, |commands| {
        commands
            .create_application_command(|command| unlock::create_unlock_command(command))
            .create_application_command(|command| poll::create_poll_command(command))
            .create_application_command(|command| news::create_news_command(command))
            .create_application_command(|command| profile::create_profile_command(command))
    })
    .await
}

pub(crate) fn option_str<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
}

pub(crate) fn option_int(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_i64())
}

pub(crate) fn option_attachment<'a>(
    options: &'a [CommandDataOption],
    name: &str,
) -> Option<&'a Attachment> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match option.resolved.as_ref() {
            Some(CommandDataOptionValue::Attachment(attachment)) => Some(attachment),
            _ => None,
        })
}

pub(crate) fn option_user<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a User> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match option.resolved.as_ref() {
            Some(CommandDataOptionValue::User(user, _)) => Some(user),
            _ => None,
        })
}

/// Server nickname when there is one, otherwise the account name.
pub(crate) fn display_name(user: &User, member: Option<&Member>) -> String {
    member
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| user.name.clone())
}

pub(crate) async fn respond_ephemeral(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
