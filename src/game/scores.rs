use crate::game::judgment::{HoldResult, JudgeGrade, Judgment, hold_points_for};

/// Push boundary towards the UI layer.
pub trait ScoreListener {
    fn on_score_update(&mut self, score: u64, combo: u32);
    fn on_session_end(&mut self) {}
}

/// Listener that drops every update, for headless runs and tests that only
/// inspect the final state.
#[derive(Debug, Default)]
pub struct NullListener;

impl ScoreListener for NullListener {
    fn on_score_update(&mut self, _score: u64, _combo: u32) {}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreState {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    // Indexed by JudgeGrade::index().
    pub judgment_counts: [u32; 4],
    pub holds_held: u32,
    pub holds_let_go: u32,
}

impl ScoreState {
    #[inline(always)]
    pub const fn count(&self, grade: JudgeGrade) -> u32 {
        self.judgment_counts[grade.index()]
    }

    /// Folds one tap/expiry judgement into the running totals.
    pub fn apply_judgment(&mut self, judgment: &Judgment, bad_breaks_combo: bool) {
        self.score += u64::from(judgment.points);
        let slot = &mut self.judgment_counts[judgment.grade.index()];
        *slot = slot.saturating_add(1);
        if judgment.is_positive(bad_breaks_combo) {
            self.bump_combo();
        } else {
            self.combo = 0;
        }
    }

    pub fn apply_hold_result(&mut self, result: HoldResult) {
        self.score += u64::from(hold_points_for(result));
        match result {
            HoldResult::Held => {
                self.holds_held = self.holds_held.saturating_add(1);
                self.bump_combo();
            }
            HoldResult::LetGo => {
                self.holds_let_go = self.holds_let_go.saturating_add(1);
                self.combo = 0;
            }
        }
    }

    #[inline(always)]
    fn bump_combo(&mut self) {
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
    }
}
