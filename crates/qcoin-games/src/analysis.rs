//! Win/tie statistics over readout rows.

use serde::{Deserialize, Serialize};

use crate::print_result;

/// Aggregated outcome of many rounds.
///
/// Player 1 wins on `(0, 1)`, player 2 on `(1, 0)`; equal coins are a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameStats {
    /// Rounds won by player 1.
    pub player1_wins: usize,
    /// Rounds won by player 2.
    pub player2_wins: usize,
    /// Rounds where both coins agree.
    pub ties: usize,
    /// Rounds analysed.
    pub total: usize,
    /// Whether player 3 read 1 in every round; `None` for two-player games.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player3_always_one: Option<bool>,
}

impl GameStats {
    /// `count` as a percentage of all rounds; 0.0 when nothing was played.
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.total as f64
        }
    }

    /// Print the statistics block.
    pub fn print(&self) {
        println!("Aggregated statistics ({} simulations):", self.total);
        print_result(
            "Player 1 wins",
            format!("{} ({:.1}%)", self.player1_wins, self.percent(self.player1_wins)),
        );
        print_result(
            "Player 2 wins",
            format!("{} ({:.1}%)", self.player2_wins, self.percent(self.player2_wins)),
        );
        print_result(
            "Ties",
            format!("{} ({:.1}%)", self.ties, self.percent(self.ties)),
        );
        if let Some(always_one) = self.player3_always_one {
            print_result("Player 3 always 1", always_one);
        }
    }
}

/// Count wins and ties over `rows`, where `row[i]` is player `i + 1`'s coin.
///
/// With three players the third coin is checked to be 1 in every row.
pub fn analyze_game(rows: &[Vec<i64>], num_players: usize) -> GameStats {
    let mut stats = GameStats {
        total: rows.len(),
        ..GameStats::default()
    };

    for row in rows {
        match (row.first(), row.get(1)) {
            (Some(0), Some(1)) => stats.player1_wins += 1,
            (Some(1), Some(0)) => stats.player2_wins += 1,
            (Some(a), Some(b)) if a == b => stats.ties += 1,
            _ => {}
        }
    }

    if num_players >= 3 {
        stats.player3_always_one = Some(rows.iter().all(|r| r.get(2) == Some(&1)));
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_players() {
        let rows = vec![vec![0, 1], vec![1, 0], vec![1, 1], vec![0, 0], vec![0, 1]];
        let stats = analyze_game(&rows, 2);

        assert_eq!(stats.player1_wins, 2);
        assert_eq!(stats.player2_wins, 1);
        assert_eq!(stats.ties, 2);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.player3_always_one, None);
        assert!((stats.percent(stats.player1_wins) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_players() {
        let rows = vec![vec![0, 1, 1], vec![0, 0, 1]];
        let stats = analyze_game(&rows, 3);
        assert_eq!(stats.player3_always_one, Some(true));

        let rows = vec![vec![0, 1, 1], vec![0, 0, 0]];
        assert_eq!(analyze_game(&rows, 3).player3_always_one, Some(false));
    }

    #[test]
    fn test_empty_rows() {
        let stats = analyze_game(&[], 2);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percent(0), 0.0);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let rows: Vec<Vec<i64>> = (0..40).map(|i| vec![i % 2, (i / 2) % 2]).collect();
        let stats = analyze_game(&rows, 2);
        assert_eq!(stats.player1_wins + stats.player2_wins + stats.ties, stats.total);
    }
}
