use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PollDefaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Roster in display order; ties in the tally keep this order.
    pub teams: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub poll_id: String,
    pub user_id: String,
    pub user_name: String,
    pub team_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub media_urls: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub profile_pic_url: Option<String>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new post, already validated.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub media_urls: Vec<String>,
}

/// Partial edit of a post. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub add_media: Vec<String>,
    pub remove_media: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSummary {
    pub count: i64,
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberStats {
    pub posts: i64,
    pub comments: i64,
    pub votes: i64,
    pub likes_received: i64,
}

impl Poll {
    pub fn new(defaults: &PollDefaults) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: defaults.title.clone(),
            description: defaults.description.clone(),
            teams: defaults.teams.clone(),
            created_at: Utc::now(),
            is_active: true,
        }
    }

    pub fn team_index(&self, team: &str) -> Option<usize> {
        self.teams.iter().position(|t| t == team)
    }
}

impl Post {
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}
