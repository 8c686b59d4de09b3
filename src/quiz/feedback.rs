use crate::error::CueError;

pub const DEFAULT_TOTAL: u32 = 20;

/// Score thresholds out of 20, best tier first, paired with their message.
const TIERS: [(u32, &str); 6] = [
    (18, "🏆 Perfect! You're a champion!"),
    (16, "🌟 Excellent work!"),
    (14, "😅 Not bad, it could be worse..."),
    (12, "🤦 Meh, you can do better than that"),
    (10, "😬 Right on average, a bit weak, no?"),
    (8, "🙈 Ouch, that's not glorious..."),
];
const LOWEST_TIER: &str = "💩 Disaster! Back to revising!";

/// Maps a final score to one of seven feedback messages.
///
/// Thresholds are expressed out of 20. For any other `total` they are
/// scaled proportionally instead of being compared with the raw score, so
/// 13/13 on a training table earns the top tier rather than a middling one.
/// With `total == 20` this is exactly the fixed 18/16/14/12/10/8 scale.
pub fn score_evaluation(score: u32, total: u32) -> &'static str {
    if total == 0 {
        return LOWEST_TIER;
    }
    let scaled = u64::from(score) * u64::from(DEFAULT_TOTAL);
    TIERS
        .iter()
        .find(|(threshold, _)| scaled >= u64::from(*threshold) * u64::from(total))
        .map(|(_, message)| *message)
        .unwrap_or(LOWEST_TIER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Incorrect,
}

/// Fire-and-forget feedback played when an answer is picked.
pub trait AnswerCue: Send + Sync {
    fn play(&self, cue: Cue) -> Result<(), CueError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl AnswerCue for SilentCue {
    fn play(&self, _cue: Cue) -> Result<(), CueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_out_of_twenty() {
        assert!(score_evaluation(20, 20).starts_with("🏆"));
        assert!(score_evaluation(19, 20).starts_with("🏆"));
        assert!(score_evaluation(18, 20).starts_with("🏆"));
        assert!(score_evaluation(17, 20).starts_with("🌟"));
        assert!(score_evaluation(14, 20).starts_with("😅"));
        assert!(score_evaluation(12, 20).starts_with("🤦"));
        assert!(score_evaluation(11, 20).starts_with("😬"));
        assert!(score_evaluation(9, 20).starts_with("🙈"));
        assert!(score_evaluation(8, 20).starts_with("🙈"));
        assert_eq!(score_evaluation(7, 20), LOWEST_TIER);
        assert_eq!(score_evaluation(0, 20), LOWEST_TIER);
    }

    #[test]
    fn thresholds_scale_with_total() {
        // 9/10 is the same ratio as 18/20
        assert!(score_evaluation(9, 10).starts_with("🏆"));
        assert!(score_evaluation(4, 10).starts_with("🙈"));
        assert_eq!(score_evaluation(3, 10), LOWEST_TIER);
    }

    #[test]
    fn perfect_training_table_is_top_tier() {
        // a multiplication table has 13 questions
        assert!(score_evaluation(13, 13).starts_with("🏆"));
        assert!(score_evaluation(12, 13).starts_with("🏆"));
        assert!(score_evaluation(11, 13).starts_with("🌟"));
        assert!(score_evaluation(6, 13).starts_with("🙈"));
        assert_eq!(score_evaluation(5, 13), LOWEST_TIER);
    }

    #[test]
    fn empty_quiz_gets_lowest_tier() {
        assert_eq!(score_evaluation(0, 0), LOWEST_TIER);
    }
}
