/// Longest dim applied over the paused scene.
pub(crate) const MAX_PAUSE_FADE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PauseTick {
    Holding,
    Resume,
}

/// Fade in while paused, fade out after a key, resume once fully clear.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PauseState {
    entering: bool,
    time: f32,
}

impl PauseState {
    pub(crate) fn enter(&mut self) {
        self.entering = true;
    }

    pub(crate) fn leave(&mut self) {
        self.entering = false;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub(crate) fn is_entering(&self) -> bool {
        self.entering
    }

    /// Alpha of the black dim.
    pub(crate) fn fade(&self) -> f32 {
        self.time
    }

    pub(crate) fn tick(&mut self, dt: f32) -> PauseTick {
        if self.entering {
            self.time = (self.time + dt).min(MAX_PAUSE_FADE);
            return PauseTick::Holding;
        }
        if self.time <= 0.0 {
            self.time = 0.0;
            return PauseTick::Resume;
        }
        self.time = (self.time - dt).max(0.0);
        PauseTick::Holding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_is_capped_while_entering() {
        let mut pause = PauseState::default();
        pause.enter();
        assert_eq!(pause.tick(0.3), PauseTick::Holding);
        assert_eq!(pause.tick(0.3), PauseTick::Holding);
        assert_eq!(pause.fade(), MAX_PAUSE_FADE);
    }

    #[test]
    fn leaving_fades_out_then_resumes() {
        let mut pause = PauseState::default();
        pause.enter();
        pause.tick(1.0);
        pause.leave();
        assert_eq!(pause.tick(0.2), PauseTick::Holding);
        assert!((pause.fade() - 0.3).abs() < 1e-6);
        assert_eq!(pause.tick(1.0), PauseTick::Holding);
        assert_eq!(pause.fade(), 0.0);
        assert_eq!(pause.tick(0.01), PauseTick::Resume);
    }

    #[test]
    fn reentering_mid_fade_keeps_the_current_dim() {
        let mut pause = PauseState::default();
        pause.enter();
        pause.tick(0.4);
        pause.leave();
        pause.tick(0.1);
        pause.enter();
        assert!(pause.is_entering());
        pause.tick(0.05);
        assert!((pause.fade() - 0.35).abs() < 1e-6);
    }
}
