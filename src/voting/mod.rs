pub mod leaderboard;
pub mod tally;

use serde::Serialize;

/// One roster team in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub team: String,
    pub votes: u64,
    /// In [0, 100]; 0 for every team when nothing has been counted.
    pub percentage: f64,
}

/// The member's vote in the poll, if they have one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoterStatus {
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub ranking: Vec<RankedEntry>,
    pub total_votes: u64,
    pub voter: VoterStatus,
}
