use super::{Database, format_timestamp, now, parse_timestamp};
use crate::error::{BoardError, Result};
use crate::models::{Member, MemberStats, ProfileEdit};
use log::info;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const MAX_NAME_CHARS: usize = 80;
const MAX_BIO_CHARS: usize = 500;

impl Database {
    /// Creates the member row on first contact; existing profiles are left alone.
    pub async fn ensure_member(
        &self,
        user_id: &str,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        let at = format_timestamp(now());
        sqlx::query(
            r#"
            INSERT INTO members (id, name, bio, profile_pic_url, unlocked_at, created_at, updated_at)
            VALUES (?, ?, '', ?, NULL, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(avatar_url)
        .bind(&at)
        .bind(&at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks the member as past the access gate.
    pub async fn unlock_member(
        &self,
        user_id: &str,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        self.ensure_member(user_id, name, avatar_url).await?;
        sqlx::query(
            r#"
            UPDATE members
            SET unlocked_at = COALESCE(unlocked_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(format_timestamp(now()))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!("Member {} unlocked the board", user_id);
        Ok(())
    }

    pub async fn is_unlocked(&self, user_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT unlocked_at FROM members WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>("unlocked_at")?.is_some()),
            None => Ok(false),
        }
    }

    pub async fn get_member(&self, user_id: &str) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, bio, profile_pic_url, unlocked_at, created_at, updated_at
            FROM members
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| member_from_row(&row)).transpose()
    }

    pub async fn update_profile(&self, user_id: &str, edit: ProfileEdit) -> Result<Member> {
        let member = self
            .get_member(user_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Member"))?;

        let name = match edit.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(BoardError::validation("Name cannot be empty."));
                }
                if name.chars().count() > MAX_NAME_CHARS {
                    return Err(BoardError::validation(format!(
                        "Name is too long (max {} characters).",
                        MAX_NAME_CHARS
                    )));
                }
                name
            }
            None => member.name,
        };

        let bio = match edit.bio {
            Some(bio) => {
                let bio = bio.trim().to_string();
                if bio.chars().count() > MAX_BIO_CHARS {
                    return Err(BoardError::validation(format!(
                        "Bio is too long (max {} characters).",
                        MAX_BIO_CHARS
                    )));
                }
                bio
            }
            None => member.bio,
        };

        let profile_pic_url = edit.profile_pic_url.or(member.profile_pic_url);

        sqlx::query(
            r#"
            UPDATE members
            SET name = ?, bio = ?, profile_pic_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&bio)
        .bind(&profile_pic_url)
        .bind(format_timestamp(now()))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.get_member(user_id)
            .await?
            .ok_or_else(|| BoardError::not_found("Member"))
    }

    pub async fn member_stats(&self, user_id: &str) -> Result<MemberStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts WHERE author_id = ?1) AS posts,
                (SELECT COUNT(*) FROM comments WHERE author_id = ?1) AS comments,
                (SELECT COUNT(*) FROM votes WHERE user_id = ?1) AS votes,
                (SELECT COUNT(*) FROM likes l JOIN posts p ON p.id = l.post_id
                 WHERE p.author_id = ?1) AS likes_received
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(MemberStats {
            posts: row.try_get("posts")?,
            comments: row.try_get("comments")?,
            votes: row.try_get("votes")?,
            likes_received: row.try_get("likes_received")?,
        })
    }
}

fn member_from_row(row: &SqliteRow) -> Result<Member> {
    let unlocked_at: Option<String> = row.try_get("unlocked_at")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Member {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        profile_pic_url: row.try_get("profile_pic_url")?,
        unlocked_at: unlocked_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollDefaults;
    use crate::models::NewPost;

    #[tokio::test]
    async fn unlock_persists() {
        let db = Database::in_memory().await;
        assert!(!db.is_unlocked("u1").await.unwrap());

        db.ensure_member("u1", "Ana", None).await.unwrap();
        assert!(!db.is_unlocked("u1").await.unwrap());

        db.unlock_member("u1", "Ana", None).await.unwrap();
        assert!(db.is_unlocked("u1").await.unwrap());

        let member = db.get_member("u1").await.unwrap().unwrap();
        assert!(member.unlocked_at.is_some());
        assert_eq!(member.bio, "");
    }

    #[tokio::test]
    async fn profile_edit_keeps_untouched_fields() {
        let db = Database::in_memory().await;
        db.ensure_member("u1", "Ana", Some("https://cdn.example/ana.png")).await.unwrap();

        let member = db
            .update_profile(
                "u1",
                ProfileEdit {
                    bio: Some("  Team Tara captain ".to_string()),
                    ..ProfileEdit::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(member.name, "Ana");
        assert_eq!(member.bio, "Team Tara captain");
        assert_eq!(member.profile_pic_url.as_deref(), Some("https://cdn.example/ana.png"));

        let err = db
            .update_profile(
                "u1",
                ProfileEdit {
                    name: Some(" ".to_string()),
                    ..ProfileEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation { .. }));
    }

    #[tokio::test]
    async fn stats_count_activity() {
        let db = Database::in_memory().await;
        db.ensure_member("u1", "Ana", None).await.unwrap();

        let post = db
            .create_post(
                "u1",
                "Ana",
                NewPost {
                    title: "Hello".to_string(),
                    content: "World".to_string(),
                    tags: vec![],
                    media_urls: vec![],
                },
            )
            .await
            .unwrap();
        db.add_comment(post.id, "u1", "Ana", "bump").await.unwrap();
        db.toggle_like(post.id, "u2").await.unwrap();
        db.toggle_like(post.id, "u3").await.unwrap();

        let poll = db
            .get_or_create_active_poll(&PollDefaults {
                title: "Cup".to_string(),
                description: "Vote".to_string(),
                teams: vec!["Red".to_string()],
            })
            .await
            .unwrap();
        db.cast_vote(&poll, "u1", "Ana", "Red").await.unwrap();

        let stats = db.member_stats("u1").await.unwrap();
        assert_eq!(
            stats,
            MemberStats {
                posts: 1,
                comments: 1,
                votes: 1,
                likes_received: 2,
            }
        );
        assert_eq!(db.member_stats("nobody").await.unwrap(), MemberStats::default());
    }
}
