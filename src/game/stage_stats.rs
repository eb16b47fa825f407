use crate::game::judgment::JudgeGrade;
use crate::game::scores::ScoreState;
use crate::game::timing_stats::{TimingStats, compute_timing_stats};
use chrono::{DateTime, Local};

#[derive(Clone, Debug)]
pub struct StageSummary {
    pub finished_at: DateTime<Local>,
    pub total_notes: usize,
    pub score: u64,
    pub max_combo: u32,
    pub perfect: u32,
    pub good: u32,
    pub bad: u32,
    pub miss: u32,
    pub holds_held: u32,
    pub holds_let_go: u32,
    pub timing: TimingStats,
    // Combo rule the run was played under.
    pub bad_breaks_combo: bool,
}

impl StageSummary {
    pub fn build(
        score: &ScoreState,
        total_notes: usize,
        offsets_ms: &[f32],
        bad_breaks_combo: bool,
    ) -> Self {
        Self {
            finished_at: Local::now(),
            total_notes,
            score: score.score,
            max_combo: score.max_combo,
            perfect: score.count(JudgeGrade::Perfect),
            good: score.count(JudgeGrade::Good),
            bad: score.count(JudgeGrade::Bad),
            miss: score.count(JudgeGrade::Miss),
            holds_held: score.holds_held,
            holds_let_go: score.holds_let_go,
            timing: compute_timing_stats(offsets_ms),
            bad_breaks_combo,
        }
    }

    /// Every note has been judged and nothing broke the combo.
    pub const fn is_full_combo(&self) -> bool {
        let bads_ok = !self.bad_breaks_combo || self.bad == 0;
        self.miss == 0
            && self.holds_let_go == 0
            && bads_ok
            && self.judged() as usize == self.total_notes
    }

    #[inline(always)]
    pub const fn judged(&self) -> u32 {
        self.perfect + self.good + self.bad + self.miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::judgment::Judgment;

    fn scored(grades: &[JudgeGrade], bad_breaks_combo: bool) -> ScoreState {
        let mut score = ScoreState::default();
        for (i, &grade) in grades.iter().enumerate() {
            score.apply_judgment(&Judgment::new(grade, 0, i, 0.0), bad_breaks_combo);
        }
        score
    }

    #[test]
    fn bad_keeps_full_combo_when_it_keeps_the_combo() {
        let grades = [JudgeGrade::Perfect, JudgeGrade::Bad, JudgeGrade::Good];
        let summary = StageSummary::build(&scored(&grades, false), 3, &[0.0, 140.0, 80.0], false);
        assert!(summary.is_full_combo());
        assert_eq!(summary.max_combo, 3);
    }

    #[test]
    fn bad_loses_full_combo_when_it_breaks_the_combo() {
        let grades = [JudgeGrade::Perfect, JudgeGrade::Bad, JudgeGrade::Good];
        let summary = StageSummary::build(&scored(&grades, true), 3, &[0.0, 140.0, 80.0], true);
        assert_eq!(summary.bad, 1);
        assert!(!summary.is_full_combo());
    }

    #[test]
    fn unjudged_notes_are_not_a_full_combo() {
        let summary = StageSummary::build(&scored(&[JudgeGrade::Perfect], false), 2, &[0.0], false);
        assert!(!summary.is_full_combo());
    }
}
