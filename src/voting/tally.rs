use crate::models::Vote;
use crate::voting::{RankedEntry, Tally, VoterStatus};
use std::collections::HashMap;

/// Ranks every roster team by vote count, most votes first.
///
/// Votes for a team that is not on the roster are dropped from every count,
/// including the total. Teams with equal counts keep their roster order.
/// `voter_id` only feeds [`VoterStatus`]; it never changes the ranking.
///
/// The roster is expected to be non-empty with distinct labels. An empty
/// roster yields an empty ranking.
pub fn tally(roster: &[String], votes: &[Vote], voter_id: Option<&str>) -> Tally {
    let mut counts: HashMap<&str, u64> = roster.iter().map(|team| (team.as_str(), 0)).collect();

    for vote in votes {
        if let Some(count) = counts.get_mut(vote.team_name.as_str()) {
            *count += 1;
        }
    }

    let total_votes: u64 = counts.values().sum();

    let mut ranking: Vec<RankedEntry> = roster
        .iter()
        .map(|team| {
            let votes = counts.get(team.as_str()).copied().unwrap_or(0);
            RankedEntry {
                team: team.clone(),
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();

    // sort_by is stable, so equal counts stay in roster order
    ranking.sort_by(|a, b| b.votes.cmp(&a.votes));

    Tally {
        ranking,
        total_votes,
        voter: voter_status(votes, voter_id),
    }
}

/// Looks up the member's vote, regardless of whether the team is on the roster.
pub fn voter_status(votes: &[Vote], voter_id: Option<&str>) -> VoterStatus {
    let team = voter_id.and_then(|id| {
        votes
            .iter()
            .find(|vote| vote.user_id == id)
            .map(|vote| vote.team_name.clone())
    });
    VoterStatus { team }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn roster(teams: &[&str]) -> Vec<String> {
        teams.iter().map(|t| t.to_string()).collect()
    }

    fn vote(user_id: &str, team: &str) -> Vote {
        Vote {
            id: format!("vote-{}", user_id),
            poll_id: "poll".to_string(),
            user_id: user_id.to_string(),
            user_name: user_id.to_string(),
            team_name: team.to_string(),
            created_at: Utc::now(),
        }
    }

    fn order(result: &Tally) -> Vec<&str> {
        result.ranking.iter().map(|e| e.team.as_str()).collect()
    }

    #[test]
    fn red_blue_example() {
        let result = tally(
            &roster(&["Red", "Blue"]),
            &[vote("a", "Red"), vote("b", "Blue"), vote("c", "Red")],
            None,
        );

        assert_eq!(order(&result), vec!["Red", "Blue"]);
        assert_eq!(result.ranking[0].votes, 2);
        assert_eq!(result.ranking[1].votes, 1);
        assert!((result.ranking[0].percentage - 66.666).abs() < 0.01);
        assert!((result.ranking[1].percentage - 33.333).abs() < 0.01);
        assert_eq!(result.total_votes, 3);
    }

    #[test]
    fn no_votes_gives_all_zeros_in_roster_order() {
        let result = tally(&roster(&["Red", "Blue"]), &[], None);

        assert_eq!(order(&result), vec!["Red", "Blue"]);
        assert!(result.ranking.iter().all(|e| e.votes == 0 && e.percentage == 0.0));
        assert_eq!(result.total_votes, 0);
    }

    #[test]
    fn ties_keep_roster_order() {
        let votes = [
            vote("1", "B"),
            vote("2", "C"),
            vote("3", "A"),
            vote("4", "B"),
            vote("5", "A"),
        ];
        let result = tally(&roster(&["A", "B", "C"]), &votes, None);
        assert_eq!(order(&result), vec!["A", "B", "C"]);

        // a tied team later in the roster never jumps ahead
        let result = tally(&roster(&["C", "B", "A"]), &votes, None);
        assert_eq!(order(&result), vec!["B", "A", "C"]);
    }

    #[test]
    fn unknown_teams_are_excluded_from_counts_and_total() {
        let votes = [vote("1", "Red"), vote("2", "Green"), vote("3", "Green")];
        let result = tally(&roster(&["Red", "Blue"]), &votes, None);

        assert_eq!(result.total_votes, 1);
        assert_eq!(result.ranking.len(), 2);
        assert_eq!(result.ranking[0].team, "Red");
        assert_eq!(result.ranking[0].percentage, 100.0);
    }

    #[test]
    fn counts_sum_to_vote_count_and_percentages_to_hundred() {
        let teams = roster(&["A", "B", "C", "D", "E", "F", "G"]);
        let votes: Vec<Vote> = (0..101)
            .map(|i| vote(&i.to_string(), &teams[(i * 7 + i / 3) % teams.len()]))
            .collect();

        let result = tally(&teams, &votes, None);

        let counted: u64 = result.ranking.iter().map(|e| e.votes).sum();
        assert_eq!(counted, votes.len() as u64);
        let pct: f64 = result.ranking.iter().map(|e| e.percentage).sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert!(result.ranking.windows(2).all(|w| w[0].votes >= w[1].votes));
    }

    #[test]
    fn result_does_not_depend_on_vote_order() {
        let teams = roster(&["A", "B", "C"]);
        let mut votes = vec![vote("1", "C"), vote("2", "A"), vote("3", "C"), vote("4", "B")];
        let first = tally(&teams, &votes, Some("3"));
        votes.reverse();
        let second = tally(&teams, &votes, Some("3"));

        assert_eq!(first, second);
        assert_eq!(first, tally(&teams, &votes, Some("3")));
    }

    #[test]
    fn voter_status_reports_own_vote() {
        let votes = [vote("u1", "Blue"), vote("u3", "Red")];
        let teams = roster(&["Red", "Blue"]);

        let status = tally(&teams, &votes, Some("u1")).voter;
        assert_eq!(status.team.as_deref(), Some("Blue"));

        assert_eq!(tally(&teams, &votes, Some("u2")).voter, VoterStatus::default());
        assert_eq!(tally(&teams, &votes, None).voter, VoterStatus::default());
    }

    #[test]
    fn vote_on_unknown_team_still_marks_voter() {
        let status = voter_status(&[vote("u1", "Retired Team")], Some("u1"));
        assert_eq!(status.team.as_deref(), Some("Retired Team"));
    }

    #[test]
    fn empty_roster_gives_empty_ranking() {
        let result = tally(&[], &[vote("1", "Red")], None);
        assert!(result.ranking.is_empty());
        assert_eq!(result.total_votes, 0);
    }
}
