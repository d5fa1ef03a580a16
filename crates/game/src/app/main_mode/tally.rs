use crate::app::player::Player;
use crate::app::settings::Difficulty;

const TALLY_RATE: f32 = 0.8;
/// The tally runs past the last award so the final line stays readable.
const TALLY_END: f32 = 5.0;
const POINTS_PER_LIFE: i32 = 100;
const POINTS_PER_MINUTE: i32 = 250;
const POINTS_PER_DIFFICULTY: i32 = 500;
const MAX_BONUS_LINES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bonus {
    Lives,
    Time,
    Difficulty,
}

impl Bonus {
    fn for_step(step: i32) -> Option<Self> {
        match step {
            1 => Some(Self::Lives),
            2 => Some(Self::Time),
            3 => Some(Self::Difficulty),
            _ => None,
        }
    }

    pub(crate) fn points(self, player: &Player, difficulty: Difficulty) -> i32 {
        match self {
            Self::Lives => player.lives * POINTS_PER_LIFE,
            Self::Time => minutes_left(player) * POINTS_PER_MINUTE,
            Self::Difficulty => difficulty.level() * POINTS_PER_DIFFICULTY,
        }
    }
}

fn minutes_left(player: &Player) -> i32 {
    player.seconds_left() / 60
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TallyStep {
    pub(crate) award: Option<(Bonus, i32)>,
    pub(crate) cue: bool,
    pub(crate) finished: bool,
}

/// Counts up through the end-of-level bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Tally {
    count: f32,
}

impl Tally {
    pub(crate) fn reset(&mut self) {
        self.count = 0.0;
    }

    /// Advances the count and credits a bonus each time it crosses a whole
    /// number. Points go straight onto the player's score.
    pub(crate) fn advance(&mut self, dt: f32, player: &mut Player, difficulty: Difficulty) -> TallyStep {
        let before = self.count as i32;
        self.count += TALLY_RATE * dt;
        let after = self.count as i32;

        let mut step = TallyStep::default();
        if after != before {
            step.cue = after <= 3;
            if let Some(bonus) = Bonus::for_step(after) {
                let points = bonus.points(player, difficulty);
                player.score += points;
                step.award = Some((bonus, points));
            }
        }
        step.finished = self.count > TALLY_END;
        step
    }

    /// Number of bonus lines to show, the heading included.
    pub(crate) fn visible_lines(&self) -> usize {
        (self.count as usize + 1).min(MAX_BONUS_LINES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BonusLine {
    pub(crate) label: String,
    pub(crate) value: String,
}

pub(crate) fn bonus_lines(player: &Player, difficulty: Difficulty, visible: usize) -> Vec<BonusLine> {
    let line = |label: &str, value: String| BonusLine {
        label: label.to_string(),
        value,
    };
    let lines = [
        line("Level bonuses", String::new()),
        line(
            "Lives left:",
            format!(
                "{} x {} = {} points",
                player.lives,
                POINTS_PER_LIFE,
                Bonus::Lives.points(player, difficulty)
            ),
        ),
        line(
            "Time left:",
            format!(
                "{} minutes = {} points",
                minutes_left(player),
                Bonus::Time.points(player, difficulty)
            ),
        ),
        line(
            "Difficulty:",
            format!(
                "{} = {} points",
                difficulty.label(),
                Bonus::Difficulty.points(player, difficulty)
            ),
        ),
    ];
    lines.into_iter().take(visible).collect()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn player() -> Player {
        let mut player = Player::new(Vec3::ZERO, 3, 150.0);
        player.score = 10;
        player
    }

    #[test]
    fn awards_land_on_whole_number_crossings() {
        let mut tally = Tally::default();
        let mut player = player();
        let mut awards = Vec::new();
        let mut cues = 0;
        let mut finished = false;
        for _ in 0..100 {
            let step = tally.advance(0.1, &mut player, Difficulty::Hard);
            awards.extend(step.award);
            cues += usize::from(step.cue);
            if step.finished {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert_eq!(
            awards,
            vec![
                (Bonus::Lives, 300),
                (Bonus::Time, 500),
                (Bonus::Difficulty, 1000)
            ]
        );
        assert_eq!(cues, 3);
        assert_eq!(player.score, 10 + 300 + 500 + 1000);
    }

    #[test]
    fn easy_difficulty_bonus_is_zero() {
        let mut tally = Tally { count: 2.9 };
        let mut player = player();
        let step = tally.advance(0.2, &mut player, Difficulty::Easy);
        assert_eq!(step.award, Some((Bonus::Difficulty, 0)));
        assert!(step.cue);
    }

    #[test]
    fn visible_lines_grow_with_the_count() {
        let mut tally = Tally::default();
        assert_eq!(tally.visible_lines(), 1);
        tally.count = 1.5;
        assert_eq!(tally.visible_lines(), 2);
        tally.count = 4.5;
        assert_eq!(tally.visible_lines(), MAX_BONUS_LINES);
    }

    #[test]
    fn bonus_lines_spell_out_each_award() {
        let lines = bonus_lines(&player(), Difficulty::Normal, 4);
        assert_eq!(lines[0].label, "Level bonuses");
        assert_eq!(lines[1].value, "3 x 100 = 300 points");
        assert_eq!(lines[2].value, "2 minutes = 500 points");
        assert_eq!(lines[3].value, "normal = 500 points");
        assert_eq!(bonus_lines(&player(), Difficulty::Normal, 2).len(), 2);
    }
}
