use crate::board::Board;
use crate::commands::{
    display_name, option_attachment, option_int, option_str, respond_ephemeral, truncate,
};
use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::handlers::like_custom_id;
use crate::models::{Comment, LikeSummary, NewPost, Post, PostEdit};
use crate::tags::normalize_tags;
use log::info;
use serenity::builder::{CreateApplicationCommand, CreateComponents, CreateEmbed};
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::*;

const LIST_LIMIT: u32 = 10;
const SHOWN_COMMENTS: usize = 10;
const EMBED_TOTAL_LIMIT: usize = 6000;
const EMBED_TITLE_LIMIT: usize = 256;
const EMBED_DESCRIPTION_LIMIT: usize = 4096;
const EMBED_FIELD_LIMIT: usize = 1024;
const MEDIA_OPTIONS: [&str; 3] = ["media", "media2", "media3"];
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub fn create_news_command(
    command: &mut CreateApplicationCommand,
) -> &mut CreateApplicationCommand {
    command
        .name("news")
        .description("Read and write community news")
        .create_option(|option| {
            option
                .name("post")
                .description("Publish a news post")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("title")
                        .description("Headline")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("content")
                        .description("Body text")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("tags")
                        .description("Tags, separated by commas or spaces")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("media")
                        .description("Image or video")
                        .kind(CommandOptionType::Attachment)
                })
                .create_sub_option(|sub| {
                    sub.name("media2")
                        .description("Another image or video")
                        .kind(CommandOptionType::Attachment)
                })
                .create_sub_option(|sub| {
                    sub.name("media3")
                        .description("Another image or video")
                        .kind(CommandOptionType::Attachment)
                })
        })
        .create_option(|option| {
            option
                .name("list")
                .description("Latest news posts")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("show")
                .description("Show a post with its comments")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Post number")
                        .kind(CommandOptionType::Integer)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("edit")
                .description("Edit one of your posts")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Post number")
                        .kind(CommandOptionType::Integer)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("title")
                        .description("New headline")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("content")
                        .description("New body text")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("tags")
                        .description("Replacement tags (use \"none\" to clear)")
                        .kind(CommandOptionType::String)
                })
                .create_sub_option(|sub| {
                    sub.name("add_media")
                        .description("Attach another image or video")
                        .kind(CommandOptionType::Attachment)
                })
                .create_sub_option(|sub| {
                    sub.name("remove_media")
                        .description("URL of media to remove, or \"all\"")
                        .kind(CommandOptionType::String)
                })
        })
        .create_option(|option| {
            option
                .name("comment")
                .description("Comment on a post")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Post number")
                        .kind(CommandOptionType::Integer)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("text")
                        .description("Your comment")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("like")
                .description("Like a post, or take your like back")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Post number")
                        .kind(CommandOptionType::Integer)
                        .required(true)
                })
        })
}

pub async fn handle_news_command(
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
        "post" => handle_create_post(board, ctx, command, options).await?,
        "list" => handle_list_posts(board, ctx, command).await?,
        "show" => handle_show_post(board, ctx, command, options).await?,
        "edit" => handle_edit_post(board, ctx, command, options).await?,
        "comment" => handle_comment(board, ctx, command, options).await?,
        "like" => handle_like(board, ctx, command, options).await?,
        _ => respond_ephemeral(ctx, command, "Unknown subcommand").await?,
    }

    Ok(())
}

async fn handle_create_post(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let new_post = NewPost {
        title: option_str(options, "title").unwrap_or_default().to_string(),
        content: option_str(options, "content").unwrap_or_default().to_string(),
        tags: option_str(options, "tags").map(normalize_tags).unwrap_or_default(),
        media_urls: MEDIA_OPTIONS
            .iter()
            .filter_map(|name| option_attachment(options, name))
            .map(|attachment| attachment.url.clone())
            .collect(),
    };

    let author_name = display_name(&command.user, command.member.as_ref());
    let post = board
        .database
        .create_post(&command.user.id.to_string(), &author_name, new_post)
        .await?;
    let view = PostView::load(&board.database, post.id, None).await?;

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message
                        .content(format!("📰 New post by {}", author_name))
                        .embed(|e| post_embed(e, &view))
                        .components(|c| like_button(c, &view))
                })
        })
        .await?;

    Ok(())
}

async fn handle_list_posts(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let posts = board.database.list_posts(LIST_LIMIT).await?;

    if posts.is_empty() {
        respond_ephemeral(ctx, command, "No posts yet. Be the first with /news post!").await?;
        return Ok(());
    }

    let mut lines = Vec::with_capacity(posts.len());
    for post in &posts {
        let likes = board.database.like_summary(post.id, None).await?;
        let comments = board.database.count_comments(post.id).await?;
        lines.push(list_line(post, likes.count, comments));
    }

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.embed(|e| {
                        e.title("Latest news")
                            .description(lines.join("\n"))
                            .footer(|f| f.text("Use /news show <id> to read a post"))
                    })
                })
        })
        .await?;

    Ok(())
}

async fn handle_show_post(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let post_id = required_post_id(options)?;
    let view = PostView::load(&board.database, post_id, None).await?;

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| post_embed(e, &view))
                        .components(|c| like_button(c, &view))
                })
        })
        .await?;

    Ok(())
}

async fn handle_edit_post(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let post_id = required_post_id(options)?;
    let current = board.database.get_post(post_id).await?;

    let remove_media = match option_str(options, "remove_media").map(str::trim) {
        Some("all") => current.media_urls.clone(),
        Some(urls) => urls.split_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    };

    let edit = PostEdit {
        title: option_str(options, "title").map(str::to_string),
        content: option_str(options, "content").map(str::to_string),
        tags: option_str(options, "tags").map(|raw| {
            if raw.trim().eq_ignore_ascii_case("none") {
                Vec::new()
            } else {
                normalize_tags(raw)
            }
        }),
        add_media: option_attachment(options, "add_media")
            .map(|attachment| vec![attachment.url.clone()])
            .unwrap_or_default(),
        remove_media,
    };

    board
        .database
        .update_post(post_id, &command.user.id.to_string(), edit)
        .await?;

    respond_ephemeral(ctx, command, "Post updated successfully!").await?;
    Ok(())
}

async fn handle_comment(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let post_id = required_post_id(options)?;
    let text = option_str(options, "text").unwrap_or_default();
    let author_name = display_name(&command.user, command.member.as_ref());

    let comment = board
        .database
        .add_comment(post_id, &command.user.id.to_string(), &author_name, text)
        .await?;
    info!("Comment {} added to post {}", comment.id, post_id);

    respond_ephemeral(ctx, command, "Comment added successfully!").await?;
    Ok(())
}

async fn handle_like(
    board: &Board,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    options: &[CommandDataOption],
) -> Result<()> {
    let post_id = required_post_id(options)?;
    let summary = board
        .database
        .toggle_like(post_id, &command.user.id.to_string())
        .await?;

    respond_ephemeral(ctx, command, &like_ack(post_id, summary)).await?;
    Ok(())
}

fn required_post_id(options: &[CommandDataOption]) -> Result<i64> {
    option_int(options, "id").ok_or_else(|| BoardError::validation("A post number is required."))
}

/// A post with what is shown next to it.
pub(crate) struct PostView {
    pub post: Post,
    pub likes: LikeSummary,
    pub comments: Vec<Comment>,
}

impl PostView {
    pub async fn load(database: &Database, post_id: i64, viewer: Option<&str>) -> Result<Self> {
        Ok(Self {
            post: database.get_post(post_id).await?,
            likes: database.like_summary(post_id, viewer).await?,
            comments: database.list_comments(post_id).await?,
        })
    }
}

/// The text of a post embed, cut to fit Discord's embed limits.
struct PostEmbedText {
    title: String,
    author: String,
    description: String,
    image: Option<String>,
    fields: Vec<(String, String)>,
    footer: String,
}

impl PostEmbedText {
    fn build(view: &PostView) -> Self {
        let post = &view.post;

        let title = truncate(&format!("#{} {}", post.id, post.title), EMBED_TITLE_LIMIT);
        let author = truncate(&post.author_name, EMBED_TITLE_LIMIT);
        let edited = if post.is_edited() { " (edited)" } else { "" };
        let footer = format!(
            "Posted {}{} · {} {}",
            post.created_at.format("%Y-%m-%d %H:%M UTC"),
            edited,
            view.likes.count,
            if view.likes.count == 1 { "like" } else { "likes" }
        );

        let mut fields = Vec::new();
        if !post.tags.is_empty() {
            let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t)).collect();
            fields.push(("Tags".to_string(), truncate(&tags.join(" "), EMBED_FIELD_LIMIT)));
        }

        // First image goes inline, everything else is listed as links
        let hero = post.media_urls.iter().find(|url| is_image_url(url));
        let other_media: Vec<&str> = post
            .media_urls
            .iter()
            .filter(|url| Some(*url) != hero)
            .map(String::as_str)
            .collect();
        if !other_media.is_empty() {
            fields.push((
                "Media".to_string(),
                truncate(&other_media.join("\n"), EMBED_FIELD_LIMIT),
            ));
        }

        let comments = if view.comments.is_empty() {
            "No comments yet.".to_string()
        } else {
            recent_comment_lines(&view.comments)
        };
        fields.push((format!("Comments ({})", view.comments.len()), comments));

        // The post body gets whatever the rest leaves of the embed total
        let used = char_len(&title)
            + char_len(&author)
            + char_len(&footer)
            + fields
                .iter()
                .map(|(name, value)| char_len(name) + char_len(value))
                .sum::<usize>();
        let room = EMBED_TOTAL_LIMIT.saturating_sub(used).min(EMBED_DESCRIPTION_LIMIT);

        Self {
            title,
            author,
            description: truncate(&post.content, room),
            image: hero.cloned(),
            fields,
            footer,
        }
    }

    fn char_count(&self) -> usize {
        char_len(&self.title)
            + char_len(&self.author)
            + char_len(&self.description)
            + char_len(&self.footer)
            + self
                .fields
                .iter()
                .map(|(name, value)| char_len(name) + char_len(value))
                .sum::<usize>()
    }
}

pub(crate) fn post_embed<'a>(embed: &'a mut CreateEmbed, view: &PostView) -> &'a mut CreateEmbed {
    let text = PostEmbedText::build(view);

    embed
        .title(&text.title)
        .description(&text.description)
        .author(|a| a.name(&text.author))
        .colour(0x3498DB_u32);
    if let Some(url) = &text.image {
        embed.image(url);
    }
    for (name, value) in &text.fields {
        embed.field(name, value, false);
    }
    embed.footer(|f| f.text(&text.footer))
}

/// Newest comments that fit in one field value, shown oldest first.
fn recent_comment_lines(comments: &[Comment]) -> String {
    let mut kept = Vec::new();
    let mut used = 0;

    for comment in comments.iter().rev().take(SHOWN_COMMENTS) {
        let line = format!("**{}**: {}", comment.author_name, truncate(&comment.content, 200));
        let cost = char_len(&line) + usize::from(!kept.is_empty());
        if used + cost > EMBED_FIELD_LIMIT {
            if kept.is_empty() {
                kept.push(truncate(&line, EMBED_FIELD_LIMIT));
            }
            break;
        }
        used += cost;
        kept.push(line);
    }

    kept.reverse();
    kept.join("\n")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn like_button<'a>(
    components: &'a mut CreateComponents,
    view: &PostView,
) -> &'a mut CreateComponents {
    components.create_action_row(|row| {
        row.create_button(|button| {
            button
                .custom_id(like_custom_id(view.post.id))
                .label(format!("❤ {}", view.likes.count))
                .style(ButtonStyle::Secondary)
        })
    })
}

pub(crate) fn like_ack(post_id: i64, summary: LikeSummary) -> String {
    let total = format!(
        "{} {}",
        summary.count,
        if summary.count == 1 { "like" } else { "likes" }
    );
    if summary.liked {
        format!("You liked post #{} ({}).", post_id, total)
    } else {
        format!("You took back your like on post #{} ({}).", post_id, total)
    }
}

fn list_line(post: &Post, likes: i64, comments: i64) -> String {
    format!(
        "**#{}** {} · {} · {} · ❤ {} · 💬 {}",
        post.id,
        truncate(&post.title, 80),
        post.author_name,
        post.created_at.format("%Y-%m-%d"),
        likes,
        comments
    )
}

fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn oversized_view() -> PostView {
        let now = Utc::now();
        let comments = (0..10)
            .map(|i| Comment {
                id: i,
                post_id: 1,
                author_id: format!("u{}", i),
                author_name: format!("Member {}", i),
                content: "c".repeat(200),
                created_at: now,
            })
            .collect();

        PostView {
            post: Post {
                id: 1,
                title: "t".repeat(200),
                content: "b".repeat(4000),
                tags: vec!["x".repeat(1500)],
                media_urls: (0..3)
                    .map(|i| format!("https://cdn.example/{}{}.mp4", i, "m".repeat(380)))
                    .collect(),
                author_id: "u1".to_string(),
                author_name: "Ana".to_string(),
                created_at: now,
                updated_at: now,
            },
            likes: LikeSummary { count: 3, liked: false },
            comments,
        }
    }

    #[test]
    fn largest_post_fits_embed_limits() {
        let text = PostEmbedText::build(&oversized_view());

        assert!(text.char_count() <= EMBED_TOTAL_LIMIT);
        assert!(char_len(&text.title) <= EMBED_TITLE_LIMIT);
        assert!(char_len(&text.description) <= EMBED_DESCRIPTION_LIMIT);
        for (name, value) in &text.fields {
            assert!(char_len(value) <= EMBED_FIELD_LIMIT, "{} is too long", name);
            assert!(!value.is_empty());
        }
        // The body is shortened, not dropped
        assert!(text.description.starts_with("bbbb"));
        assert!(text.description.ends_with("..."));
    }

    #[test]
    fn comments_keep_the_newest() {
        let view = oversized_view();
        let lines = recent_comment_lines(&view.comments);

        assert!(char_len(&lines) <= EMBED_FIELD_LIMIT);
        assert!(lines.ends_with(&format!("**Member 9**: {}", "c".repeat(200))));
        assert!(!lines.contains("Member 0"));
    }

    #[test]
    fn small_post_is_shown_whole() {
        let mut view = oversized_view();
        view.post.content = "Doors open at seven.".to_string();
        view.post.tags = normalize_tags("events cup");
        view.post.media_urls = vec!["https://cdn.example/a.png".to_string()];
        view.comments.truncate(1);

        let text = PostEmbedText::build(&view);
        assert_eq!(text.description, "Doors open at seven.");
        assert_eq!(text.image.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(text.fields[0], ("Tags".to_string(), "#events #cup".to_string()));
        assert_eq!(text.fields.len(), 2);
    }

    #[test]
    fn image_detection_ignores_query_strings() {
        assert!(is_image_url("https://cdn.discordapp.com/a/b/photo.PNG?ex=1&is=2"));
        assert!(is_image_url("https://cdn.example/x.webp"));
        assert!(!is_image_url("https://cdn.example/clip.mp4"));
        assert!(!is_image_url("https://cdn.example/noext"));
    }

    #[test]
    fn like_ack_reports_new_state() {
        assert_eq!(
            like_ack(3, LikeSummary { count: 1, liked: true }),
            "You liked post #3 (1 like)."
        );
        assert_eq!(
            like_ack(3, LikeSummary { count: 0, liked: false }),
            "You took back your like on post #3 (0 likes)."
        );
    }
}
