use tracing::info;

const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HighScore {
    pub(crate) name: String,
    pub(crate) score: i32,
    pub(crate) level: String,
}

/// The person at the keyboard: lifetime counters and the high-score table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Gamer {
    levels_started: u32,
    losses: u32,
    high_scores: Vec<HighScore>,
}

impl Gamer {
    #[cfg(test)]
    pub(crate) fn levels_started(&self) -> u32 {
        self.levels_started
    }

    #[cfg(test)]
    pub(crate) fn losses(&self) -> u32 {
        self.losses
    }

    pub(crate) fn high_scores(&self) -> &[HighScore] {
        &self.high_scores
    }

    pub(crate) fn level_started(&mut self) {
        self.levels_started += 1;
    }

    pub(crate) fn player_lose(&mut self) {
        self.losses += 1;
        info!(losses = self.losses, "gamer_game_ended");
    }

    /// Inserts the score in rank order and returns its 1-based rank, or
    /// `None` when it did not make the table.
    pub(crate) fn record_score(&mut self, name: &str, score: i32, level: &str) -> Option<usize> {
        let index = self
            .high_scores
            .iter()
            .position(|entry| score > entry.score)
            .unwrap_or(self.high_scores.len());
        if index >= MAX_HIGH_SCORES {
            return None;
        }
        self.high_scores.insert(
            index,
            HighScore {
                name: name.to_string(),
                score,
                level: level.to_string(),
            },
        );
        self.high_scores.truncate(MAX_HIGH_SCORES);
        info!(name, score, rank = index + 1, "high_score_recorded");
        Some(index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_kept_in_rank_order() {
        let mut gamer = Gamer::default();
        assert_eq!(gamer.record_score("ann", 100, "lv1"), Some(1));
        assert_eq!(gamer.record_score("bob", 300, "lv2"), Some(1));
        assert_eq!(gamer.record_score("cy", 200, "lv1"), Some(2));
        let names: Vec<_> = gamer.high_scores().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "cy", "ann"]);
    }

    #[test]
    fn table_is_capped() {
        let mut gamer = Gamer::default();
        for score in 0..MAX_HIGH_SCORES as i32 {
            gamer.record_score("p", 100 + score, "lv1");
        }
        assert_eq!(gamer.record_score("late", 50, "lv1"), None);
        assert_eq!(gamer.record_score("top", 1000, "lv1"), Some(1));
        assert_eq!(gamer.high_scores().len(), MAX_HIGH_SCORES);
    }

    #[test]
    fn counters_track_hooks() {
        let mut gamer = Gamer::default();
        gamer.level_started();
        gamer.level_started();
        gamer.player_lose();
        assert_eq!((gamer.levels_started(), gamer.losses()), (2, 1));
    }
}
