use super::{Database, format_timestamp, now, parse_timestamp};
use crate::error::{BoardError, Result};
use crate::models::{Comment, LikeSummary, NewPost, Post, PostEdit};
use log::{debug, info};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqliteRow};

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 4000;
const MAX_COMMENT_CHARS: usize = 1000;
const MAX_EDIT_ATTEMPTS: usize = 3;

impl Database {
    pub async fn create_post(
        &self,
        author_id: &str,
        author_name: &str,
        new_post: NewPost,
    ) -> Result<Post> {
        let title = required_text("Title", &new_post.title, MAX_TITLE_CHARS)?;
        let content = required_text("Content", &new_post.content, MAX_CONTENT_CHARS)?;
        let created_at = format_timestamp(now());

        let post_id = sqlx::query(
            r#"
            INSERT INTO posts (title, content, tags, media_urls, author_id, author_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(serde_json::to_string(&new_post.tags)?)
        .bind(serde_json::to_string(&new_post.media_urls)?)
        .bind(author_id)
        .bind(author_name)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!("Post {} created by {}", post_id, author_id);
        self.get_post(post_id).await
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Post> {
        let row = sqlx::query(
            r#"
            SELECT id, title, content, tags, media_urls, author_id, author_name, created_at, updated_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BoardError::not_found(format!("Post #{}", post_id)))?;

        post_from_row(&row)
    }

    /// Newest first.
    pub async fn list_posts(&self, limit: u32) -> Result<Vec<Post>> {
        sqlx::query(
            r#"
            SELECT id, title, content, tags, media_urls, author_id, author_name, created_at, updated_at
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(post_from_row)
        .collect()
    }

    pub async fn list_posts_by_author(&self, author_id: &str, limit: u32) -> Result<Vec<Post>> {
        sqlx::query(
            r#"
            SELECT id, title, content, tags, media_urls, author_id, author_name, created_at, updated_at
            FROM posts
            WHERE author_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(post_from_row)
        .collect()
    }

    /// Applies `edit` to a post owned by `editor_id`. Media ends up as the
    /// existing URLs minus `remove_media`, followed by `add_media`.
    ///
    /// The write only lands if the post still holds what was read; a
    /// concurrent edit makes this one start over from the newer version.
    pub async fn update_post(&self, post_id: i64, editor_id: &str, edit: PostEdit) -> Result<Post> {
        for _ in 0..MAX_EDIT_ATTEMPTS {
            let post = self.get_post(post_id).await?;
            if post.author_id != editor_id {
                return Err(BoardError::forbidden("You can only edit your own posts."));
            }
            let edited = apply_edit(&post, &edit)?;

            let updated = sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, content = ?, tags = ?, media_urls = ?, updated_at = ?
                WHERE id = ? AND title = ? AND content = ? AND tags = ? AND media_urls = ?
                "#,
            )
            .bind(&edited.title)
            .bind(&edited.content)
            .bind(serde_json::to_string(&edited.tags)?)
            .bind(serde_json::to_string(&edited.media_urls)?)
            .bind(format_timestamp(now()))
            .bind(post_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(serde_json::to_string(&post.tags)?)
            .bind(serde_json::to_string(&post.media_urls)?)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if updated == 1 {
                info!("Post {} edited by {}", post_id, editor_id);
                return self.get_post(post_id).await;
            }
            debug!("Post {} changed during an edit, retrying", post_id);
        }

        Err(BoardError::validation(
            "The post changed while you were editing it. Please try again.",
        ))
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        author_id: &str,
        author_name: &str,
        content: &str,
    ) -> Result<Comment> {
        let content = required_text("Comment", content, MAX_COMMENT_CHARS)?;
        // Surface a missing post as NotFound rather than a constraint error
        self.get_post(post_id).await?;

        let comment_id = sqlx::query(
            r#"
            INSERT INTO comments (post_id, author_id, author_name, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(author_name)
        .bind(content)
        .bind(format_timestamp(now()))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row = sqlx::query(
            r#"
            SELECT id, post_id, author_id, author_name, content, created_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        comment_from_row(&row)
    }

    /// Oldest first, the order a thread is read in.
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        sqlx::query(
            r#"
            SELECT id, post_id, author_id, author_name, content, created_at
            FROM comments
            WHERE post_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(comment_from_row)
        .collect()
    }

    pub async fn list_comments_by_author(
        &self,
        author_id: &str,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        sqlx::query(
            r#"
            SELECT id, post_id, author_id, author_name, content, created_at
            FROM comments
            WHERE author_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(comment_from_row)
        .collect()
    }

    pub async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let count = sqlx::query("SELECT COUNT(*) AS n FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(count)
    }

    /// Likes the post if the member hasn't yet, otherwise removes the like.
    pub async fn toggle_like(&self, post_id: i64, user_id: &str) -> Result<LikeSummary> {
        self.get_post(post_id).await?;

        // The DELETE takes the write lock, so concurrent toggles run one after another
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                r#"
                INSERT INTO likes (post_id, user_id, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT (post_id, user_id) DO NOTHING
                "#,
            )
            .bind(post_id)
            .bind(user_id)
            .bind(format_timestamp(now()))
            .execute(&mut *tx)
            .await?;
        }

        let summary = read_like_summary(&mut *tx, post_id, Some(user_id)).await?;
        tx.commit().await?;
        Ok(summary)
    }

    pub async fn like_summary(&self, post_id: i64, user_id: Option<&str>) -> Result<LikeSummary> {
        let mut conn = self.pool.acquire().await?;
        read_like_summary(&mut *conn, post_id, user_id).await
    }
}

async fn read_like_summary(
    conn: &mut SqliteConnection,
    post_id: i64,
    user_id: Option<&str>,
) -> Result<LikeSummary> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS n,
               COALESCE(SUM(CASE WHEN user_id = ? THEN 1 ELSE 0 END), 0) AS mine
        FROM likes
        WHERE post_id = ?
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await?;

    let mine: i64 = row.try_get("mine")?;
    Ok(LikeSummary {
        count: row.try_get("n")?,
        liked: mine > 0,
    })
}

fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardError::validation(format!("{} is required.", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(BoardError::validation(format!(
            "{} is too long (max {} characters).",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

/// Post fields after an edit is applied.
struct EditedPost {
    title: String,
    content: String,
    tags: Vec<String>,
    media_urls: Vec<String>,
}

fn apply_edit(post: &Post, edit: &PostEdit) -> Result<EditedPost> {
    let title = match &edit.title {
        Some(title) => required_text("Title", title, MAX_TITLE_CHARS)?,
        None => post.title.clone(),
    };
    let content = match &edit.content {
        Some(content) => required_text("Content", content, MAX_CONTENT_CHARS)?,
        None => post.content.clone(),
    };
    let tags = edit.tags.clone().unwrap_or_else(|| post.tags.clone());

    let mut media_urls: Vec<String> = post
        .media_urls
        .iter()
        .filter(|url| !edit.remove_media.contains(url))
        .cloned()
        .collect();
    for url in &edit.add_media {
        if !media_urls.contains(url) {
            media_urls.push(url.clone());
        }
    }

    Ok(EditedPost {
        title,
        content,
        tags,
        media_urls,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let tags: String = row.try_get("tags")?;
    let media_urls: String = row.try_get("media_urls")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: serde_json::from_str(&tags)?,
        media_urls: serde_json::from_str(&media_urls)?,
        author_id: row.try_get("author_id")?,
        author_name: row.try_get("author_name")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        author_name: row.try_get("author_name")?,
        content: row.try_get("content")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
