use crate::voting::Tally;

/// Ranked lines for the leaderboard embed, e.g. `#1 **Red**: 2 votes (66.7%)`.
pub fn ranking_lines(tally: &Tally) -> String {
    let mut summary = String::new();

    for (index, entry) in tally.ranking.iter().enumerate() {
        let line = if index == 0 && entry.votes > 0 {
            format!(
                "#{} **{}**: {} {} ({:.1}%)",
                index + 1,
                entry.team,
                entry.votes,
                plural(entry.votes),
                entry.percentage
            )
        } else {
            format!(
                "#{} {}: {} {} ({:.1}%)",
                index + 1,
                entry.team,
                entry.votes,
                plural(entry.votes),
                entry.percentage
            )
        };
        summary.push_str(&line);
        summary.push('\n');
    }

    summary
}

pub fn total_line(tally: &Tally) -> String {
    format!("{} total {}", tally.total_votes, plural(tally.total_votes))
}

/// Badge for the member looking at the poll; `None` when they have not voted.
pub fn voter_badge(tally: &Tally) -> Option<String> {
    tally.voter.team.as_ref().map(|team| format!("You voted: {}", team))
}

fn plural(count: u64) -> &'static str {
    if count == 1 { "vote" } else { "votes" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::{RankedEntry, VoterStatus};

    fn sample() -> Tally {
        Tally {
            ranking: vec![
                RankedEntry { team: "Red".into(), votes: 2, percentage: 200.0 / 3.0 },
                RankedEntry { team: "Blue".into(), votes: 1, percentage: 100.0 / 3.0 },
            ],
            total_votes: 3,
            voter: VoterStatus { team: Some("Blue".into()) },
        }
    }

    #[test]
    fn lines_show_rank_count_and_one_decimal_percentage() {
        let text = ranking_lines(&sample());
        assert_eq!(text, "#1 **Red**: 2 votes (66.7%)\n#2 Blue: 1 vote (33.3%)\n");
    }

    #[test]
    fn leader_is_not_highlighted_without_votes() {
        let tally = Tally {
            ranking: vec![RankedEntry { team: "Red".into(), votes: 0, percentage: 0.0 }],
            total_votes: 0,
            voter: VoterStatus::default(),
        };
        assert_eq!(ranking_lines(&tally), "#1 Red: 0 votes (0.0%)\n");
        assert_eq!(total_line(&tally), "0 total votes");
        assert_eq!(voter_badge(&tally), None);
    }

    #[test]
    fn badge_names_the_team() {
        assert_eq!(voter_badge(&sample()).as_deref(), Some("You voted: Blue"));
    }
}
