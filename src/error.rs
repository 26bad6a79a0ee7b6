use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    /// A follow-up after the interaction was already answered.
    #[error("Discord follow-up failed: {0}")]
    Followup(#[source] serenity::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("User {user_id} already voted in poll {poll_id}")]
    DuplicateVote { poll_id: String, user_id: String },

    #[error("Poll {poll_id} is closed")]
    PollClosed { poll_id: String },

    #[error("'{candidate}' is not on the roster of poll {poll_id}")]
    UnknownCandidate { poll_id: String, candidate: String },

    #[error("User {user_id} has not unlocked the board")]
    Locked { user_id: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl BoardError {
    pub fn not_found(what: impl Into<String>) -> Self {
        BoardError::NotFound { what: what.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BoardError::Validation { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BoardError::Forbidden { message: message.into() }
    }

    /// Whether the interaction already got its response before this error.
    /// Discord accepts only one, so there is nothing left to reply with.
    pub fn response_sent(&self) -> bool {
        matches!(self, BoardError::Followup(_))
    }

    /// Text shown to the Discord user. Internal failures get a generic line;
    /// the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            BoardError::NotFound { what } => format!("{} not found.", what),
            BoardError::DuplicateVote { .. } => "You have already voted".to_string(),
            BoardError::PollClosed { .. } => "This poll has ended.".to_string(),
            BoardError::UnknownCandidate { candidate, .. } => {
                format!("'{}' is not a team in this poll.", candidate)
            }
            BoardError::Locked { .. } => {
                "This board is for members only. Use /unlock with the board password first."
                    .to_string()
            }
            BoardError::Forbidden { message } | BoardError::Validation { message } => {
                message.clone()
            }
            BoardError::Database(_)
            | BoardError::Discord(_)
            | BoardError::Followup(_)
            | BoardError::Serialization(_)
            | BoardError::Timestamp { .. } => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_message_matches_precheck_message() {
        let err = BoardError::DuplicateVote {
            poll_id: "p".into(),
            user_id: "u".into(),
        };
        assert_eq!(err.user_message(), "You have already voted");
    }

    #[test]
    fn only_followup_failures_count_as_answered() {
        let followup = BoardError::Followup(serenity::Error::Other("webhook rejected"));
        assert!(followup.response_sent());
        assert_eq!(followup.user_message(), "Something went wrong. Please try again later.");

        assert!(!BoardError::Discord(serenity::Error::Other("no response")).response_sent());
        assert!(!BoardError::validation("bad input").response_sent());
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = BoardError::Database(sqlx::Error::RowNotFound);
        assert!(!err.user_message().contains("RowNotFound"));
        assert!(err.to_string().starts_with("Database error"));
    }
}
