use crate::db::Database;
use crate::error::{BoardError, Result};
use subtle::ConstantTimeEq;

/// Shared-passphrase gate in front of the board.
#[derive(Clone)]
pub struct AccessGate {
    passphrase: String,
}

impl AccessGate {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into().trim().to_string(),
        }
    }

    pub fn check(&self, attempt: &str) -> bool {
        let attempt = attempt.trim();
        !attempt.is_empty() && bool::from(attempt.as_bytes().ct_eq(self.passphrase.as_bytes()))
    }

    /// Fails with `Locked` unless the member has passed the gate before.
    pub async fn require_unlocked(&self, database: &Database, user_id: &str) -> Result<()> {
        if database.is_unlocked(user_id).await? {
            Ok(())
        } else {
            Err(BoardError::Locked {
                user_id: user_id.to_string(),
            })
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_passphrase() {
        let gate = AccessGate::new("darktalent");
        assert!(gate.check("darktalent"));
        assert!(gate.check("  darktalent\n"));
        assert!(!gate.check("darktalen"));
        assert!(!gate.check("DARKTALENT"));
        assert!(!gate.check(""));
    }

    #[test]
    fn debug_hides_the_passphrase() {
        let gate = AccessGate::new("hunter2");
        assert!(!format!("{:?}", gate).contains("hunter2"));
    }

    #[tokio::test]
    async fn locked_until_unlocked() {
        let db = Database::in_memory().await;
        let gate = AccessGate::new("pw");

        let err = gate.require_unlocked(&db, "u1").await.unwrap_err();
        assert!(matches!(err, BoardError::Locked { .. }));

        db.unlock_member("u1", "Ana", None).await.unwrap();
        gate.require_unlocked(&db, "u1").await.unwrap();
    }
}
