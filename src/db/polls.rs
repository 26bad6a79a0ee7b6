use super::{Database, format_timestamp, now, parse_timestamp};
use crate::config::PollDefaults;
use crate::error::{BoardError, Result};
use crate::models::{Poll, Vote};
use log::{info, warn};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

impl Database {
    /// Returns the active poll, creating it from `defaults` if there is none.
    ///
    /// The insert is a no-op when an active poll already exists (one-active
    /// index), so concurrent callers all end up reading the same row.
    pub async fn get_or_create_active_poll(&self, defaults: &PollDefaults) -> Result<Poll> {
        let candidate = Poll::new(defaults);

        let inserted = sqlx::query(
            r#"
            INSERT INTO polls (id, title, description, teams, created_at, is_active)
            VALUES (?, ?, ?, ?, ?, TRUE)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&candidate.id)
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(serde_json::to_string(&candidate.teams)?)
        .bind(format_timestamp(candidate.created_at))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            info!(
                "Initialized poll {} '{}' with {} teams",
                candidate.id,
                candidate.title,
                candidate.teams.len()
            );
        }

        self.get_active_poll()
            .await?
            .ok_or_else(|| BoardError::not_found("Active poll"))
    }

    pub async fn get_active_poll(&self) -> Result<Option<Poll>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, teams, created_at, is_active
            FROM polls
            WHERE is_active = TRUE
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| poll_from_row(&row)).transpose()
    }

    pub async fn get_poll(&self, poll_id: &str) -> Result<Poll> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, teams, created_at, is_active
            FROM polls
            WHERE id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BoardError::not_found("Poll"))?;

        poll_from_row(&row)
    }

    /// Closes the poll. Returns false if it was already closed.
    pub async fn end_poll(&self, poll_id: &str) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE polls
            SET is_active = FALSE
            WHERE id = ? AND is_active = TRUE
            "#,
        )
        .bind(poll_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    pub async fn get_poll_votes(&self, poll_id: &str) -> Result<Vec<Vote>> {
        sqlx::query(
            r#"
            SELECT id, poll_id, user_id, user_name, team_name, created_at
            FROM votes
            WHERE poll_id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(vote_from_row)
        .collect()
    }

    pub async fn get_user_vote(&self, poll_id: &str, user_id: &str) -> Result<Option<Vote>> {
        let row = sqlx::query(
            r#"
            SELECT id, poll_id, user_id, user_name, team_name, created_at
            FROM votes
            WHERE poll_id = ? AND user_id = ?
            "#,
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| vote_from_row(&row)).transpose()
    }

    /// Every vote a member has cast, newest first.
    pub async fn list_votes_by_user(&self, user_id: &str) -> Result<Vec<Vote>> {
        sqlx::query(
            r#"
            SELECT id, poll_id, user_id, user_name, team_name, created_at
            FROM votes
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(vote_from_row)
        .collect()
    }

    /// Records a vote. The store allows one vote per member per poll; a second
    /// attempt is reported as `DuplicateVote` and must not be retried.
    pub async fn cast_vote(
        &self,
        poll: &Poll,
        user_id: &str,
        user_name: &str,
        team_name: &str,
    ) -> Result<Vote> {
        if poll.team_index(team_name).is_none() {
            return Err(BoardError::UnknownCandidate {
                poll_id: poll.id.clone(),
                candidate: team_name.to_string(),
            });
        }

        let vote = Vote {
            id: Uuid::new_v4().to_string(),
            poll_id: poll.id.clone(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            team_name: team_name.to_string(),
            created_at: now(),
        };

        // Only lands while the poll is still active
        let result = sqlx::query(
            r#"
            INSERT INTO votes (id, poll_id, user_id, user_name, team_name, created_at)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM polls WHERE id = ? AND is_active = TRUE)
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.poll_id)
        .bind(&vote.user_id)
        .bind(&vote.user_name)
        .bind(&vote.team_name)
        .bind(format_timestamp(vote.created_at))
        .bind(&vote.poll_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(vote),
            Ok(_) => Err(BoardError::PollClosed {
                poll_id: poll.id.clone(),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("Rejected second vote by {} in poll {}", user_id, poll.id);
                Err(BoardError::DuplicateVote {
                    poll_id: poll.id.clone(),
                    user_id: user_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn poll_from_row(row: &SqliteRow) -> Result<Poll> {
    let teams_json: String = row.try_get("teams")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Poll {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        teams: serde_json::from_str(&teams_json)?,
        created_at: parse_timestamp(&created_at)?,
        is_active: row.try_get("is_active")?,
    })
}

fn vote_from_row(row: &SqliteRow) -> Result<Vote> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Vote {
        id: row.try_get("id")?,
        poll_id: row.try_get("poll_id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        team_name: row.try_get("team_name")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::tally::tally;

    fn defaults() -> PollDefaults {
        PollDefaults {
            title: "Best Team Competition".to_string(),
            description: "Vote for your favorite team!".to_string(),
            teams: vec!["Red".to_string(), "Blue".to_string()],
        }
    }

    #[tokio::test]
    async fn fetch_or_initialize_is_idempotent() {
        let db = Database::in_memory().await;

        let first = db.get_or_create_active_poll(&defaults()).await.unwrap();
        let second = db.get_or_create_active_poll(&defaults()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.teams, vec!["Red", "Blue"]);
        assert!(first.is_active);
    }

    #[tokio::test]
    async fn ending_a_poll_lets_a_new_one_start() {
        let db = Database::in_memory().await;
        let first = db.get_or_create_active_poll(&defaults()).await.unwrap();

        assert!(db.end_poll(&first.id).await.unwrap());
        assert!(!db.end_poll(&first.id).await.unwrap());
        assert!(db.get_active_poll().await.unwrap().is_none());

        let next = db.get_or_create_active_poll(&defaults()).await.unwrap();
        assert_ne!(first.id, next.id);
        assert!(!db.get_poll(&first.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn second_vote_is_rejected() {
        let db = Database::in_memory().await;
        let poll = db.get_or_create_active_poll(&defaults()).await.unwrap();

        db.cast_vote(&poll, "u1", "Ana", "Red").await.unwrap();
        let err = db.cast_vote(&poll, "u1", "Ana", "Blue").await.unwrap_err();

        assert!(matches!(err, BoardError::DuplicateVote { .. }));
        let votes = db.get_poll_votes(&poll.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].team_name, "Red");
    }

    #[tokio::test]
    async fn vote_for_unknown_team_is_rejected() {
        let db = Database::in_memory().await;
        let poll = db.get_or_create_active_poll(&defaults()).await.unwrap();

        let err = db.cast_vote(&poll, "u1", "Ana", "Green").await.unwrap_err();
        assert!(matches!(err, BoardError::UnknownCandidate { .. }));
    }

    #[tokio::test]
    async fn closed_poll_takes_no_votes() {
        let db = Database::in_memory().await;
        let poll = db.get_or_create_active_poll(&defaults()).await.unwrap();
        db.end_poll(&poll.id).await.unwrap();

        // stale poll object still says active
        let err = db.cast_vote(&poll, "u1", "Ana", "Red").await.unwrap_err();
        assert!(matches!(err, BoardError::PollClosed { .. }));
    }

    #[tokio::test]
    async fn stored_votes_feed_the_tally() {
        let db = Database::in_memory().await;
        let poll = db.get_or_create_active_poll(&defaults()).await.unwrap();

        db.cast_vote(&poll, "u1", "Ana", "Blue").await.unwrap();
        db.cast_vote(&poll, "u2", "Bo", "Red").await.unwrap();
        db.cast_vote(&poll, "u3", "Cy", "Blue").await.unwrap();

        let votes = db.get_poll_votes(&poll.id).await.unwrap();
        let result = tally(&poll.teams, &votes, Some("u2"));

        assert_eq!(result.ranking[0].team, "Blue");
        assert_eq!(result.ranking[0].votes, 2);
        assert_eq!(result.voter.team.as_deref(), Some("Red"));

        let mine = db.get_user_vote(&poll.id, "u3").await.unwrap().unwrap();
        assert_eq!(mine.team_name, "Blue");
        assert!(db.get_user_vote(&poll.id, "u4").await.unwrap().is_none());
        assert_eq!(db.list_votes_by_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_poll_is_not_found() {
        let db = Database::in_memory().await;
        assert!(matches!(
            db.get_poll("nope").await,
            Err(BoardError::NotFound { .. })
        ));
    }
}
