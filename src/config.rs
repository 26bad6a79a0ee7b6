use std::collections::HashSet;
use std::env;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite:ns_board.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_POLL_TITLE: &str = "Best Team Competition";
const DEFAULT_POLL_DESCRIPTION: &str = "Vote for your favorite team!";

/// One vote button per team; a Discord message holds at most 25 buttons.
pub const MAX_TEAMS: usize = 25;

// NS Cup, July 2025
const DEFAULT_TEAMS: &[&str] = &[
    "WTF (Team Tanisha)",
    "Team Tara",
    "Team Wei-Rong",
    "Sugar Gliders (Team Sara)",
    "Team Emily",
    "Team Nikki",
    "Ctrl+Alt+Elite (Team Michelle)",
    "Team Isabelle",
    "Team Josie",
    "Free Agents Team Lana",
    "Debby 2.0 (Team Debby)",
    "Team Dawn",
    "Team Aditi",
    "Team Devisha",
];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// What a freshly initialized poll looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct PollDefaults {
    pub title: String,
    pub description: String,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub max_connections: u32,
    pub passphrase: String,
    pub poll: PollDefaults,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token =
            non_empty("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let passphrase =
            non_empty("BOARD_PASSPHRASE").ok_or(ConfigError::Missing("BOARD_PASSPHRASE"))?;
        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        message: format!("expected a positive integer, got '{}'", raw),
                    });
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let teams = match non_empty("POLL_TEAMS") {
            Some(raw) => parse_roster(&raw)?,
            None => DEFAULT_TEAMS.iter().map(|t| t.to_string()).collect(),
        };

        Ok(Self {
            discord_token,
            database_url,
            max_connections,
            passphrase,
            poll: PollDefaults {
                title: non_empty("POLL_TITLE").unwrap_or_else(|| DEFAULT_POLL_TITLE.to_string()),
                description: non_empty("POLL_DESCRIPTION")
                    .unwrap_or_else(|| DEFAULT_POLL_DESCRIPTION.to_string()),
                teams,
            },
        })
    }
}

/// Parses a `;`-separated roster. Order is kept since it breaks ties.
pub fn parse_roster(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let mut teams = Vec::new();

    for label in raw.split(';').map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.insert(label) {
            return Err(ConfigError::Invalid {
                key: "POLL_TEAMS",
                message: format!("team '{}' is listed twice", label),
            });
        }
        teams.push(label.to_string());
    }

    if teams.is_empty() {
        return Err(ConfigError::Invalid {
            key: "POLL_TEAMS",
            message: "roster is empty".to_string(),
        });
    }
    if teams.len() > MAX_TEAMS {
        return Err(ConfigError::Invalid {
            key: "POLL_TEAMS",
            message: format!("{} teams listed, at most {} fit on a poll", teams.len(), MAX_TEAMS),
        });
    }

    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "token"),
            ("BOARD_PASSPHRASE", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.poll.title, "Best Team Competition");
        assert_eq!(config.poll.teams.len(), 14);
        assert_eq!(config.poll.teams[0], "WTF (Team Tanisha)");
    }

    #[test]
    fn token_and_passphrase_are_required() {
        let err = Config::from_lookup(lookup(&[("BOARD_PASSPHRASE", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DISCORD_TOKEN"));

        let err = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "t"),
            ("BOARD_PASSPHRASE", "  "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOARD_PASSPHRASE"));
    }

    #[test]
    fn roster_keeps_order_and_trims() {
        let teams = parse_roster(" Red ; Blue;;Green ").unwrap();
        assert_eq!(teams, vec!["Red", "Blue", "Green"]);
    }

    #[test]
    fn roster_rejects_duplicates_and_empty() {
        assert!(matches!(parse_roster("Red;Blue;Red"), Err(ConfigError::Invalid { .. })));
        assert!(matches!(parse_roster(" ; "), Err(ConfigError::Invalid { .. })));

        let too_many = (0..=MAX_TEAMS).map(|i| format!("Team {}", i)).collect::<Vec<_>>().join(";");
        assert!(matches!(parse_roster(&too_many), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn bad_connection_count_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "t"),
            ("BOARD_PASSPHRASE", "p"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. }));
    }
}
