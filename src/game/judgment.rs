#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JudgeGrade {
    Perfect,
    Good,
    Bad,
    Miss,
}

impl JudgeGrade {
    pub const ALL: [JudgeGrade; 4] = [Self::Perfect, Self::Good, Self::Bad, Self::Miss];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Good => "GOOD",
            Self::Bad => "BAD",
            Self::Miss => "MISS",
        }
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        match self {
            Self::Perfect => 0,
            Self::Good => 1,
            Self::Bad => 2,
            Self::Miss => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoldResult {
    Held,
    LetGo,
}

pub const PERFECT_POINTS: u32 = 300;
pub const GOOD_POINTS: u32 = 100;
pub const BAD_POINTS: u32 = 50;
pub const HOLD_SCORE_HELD: u32 = 50;

pub const fn grade_points_for(grade: JudgeGrade) -> u32 {
    match grade {
        JudgeGrade::Perfect => PERFECT_POINTS,
        JudgeGrade::Good => GOOD_POINTS,
        JudgeGrade::Bad => BAD_POINTS,
        JudgeGrade::Miss => 0,
    }
}

pub const fn hold_points_for(result: HoldResult) -> u32 {
    match result {
        HoldResult::Held => HOLD_SCORE_HELD,
        HoldResult::LetGo => 0,
    }
}

/// Outcome of a single press or expiry. Lives for one frame; only the score
/// aggregate outlives it.
#[derive(Clone, Debug, PartialEq)]
pub struct Judgment {
    pub grade: JudgeGrade,
    pub points: u32,
    pub lane: usize,
    pub note_index: usize,
    // Signed: negative = early, positive = late.
    pub time_error_ms: f32,
}

impl Judgment {
    pub const fn new(grade: JudgeGrade, lane: usize, note_index: usize, time_error_ms: f32) -> Self {
        Self {
            grade,
            points: grade_points_for(grade),
            lane,
            note_index,
            time_error_ms,
        }
    }

    /// Whether this outcome extends the combo. Bad only breaks combo when the
    /// session is configured that way.
    #[inline(always)]
    pub const fn is_positive(&self, bad_breaks_combo: bool) -> bool {
        match self.grade {
            JudgeGrade::Perfect | JudgeGrade::Good => true,
            JudgeGrade::Bad => !bad_breaks_combo,
            JudgeGrade::Miss => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_follow_the_tier_table() {
        assert_eq!(grade_points_for(JudgeGrade::Perfect), 300);
        assert_eq!(grade_points_for(JudgeGrade::Good), 100);
        assert_eq!(grade_points_for(JudgeGrade::Bad), 50);
        assert_eq!(grade_points_for(JudgeGrade::Miss), 0);
    }

    #[test]
    fn bad_is_combo_preserving_unless_configured() {
        let j = Judgment::new(JudgeGrade::Bad, 2, 0, 140.0);
        assert!(j.is_positive(false));
        assert!(!j.is_positive(true));
        assert!(!Judgment::new(JudgeGrade::Miss, 2, 0, 210.0).is_positive(false));
    }
}
