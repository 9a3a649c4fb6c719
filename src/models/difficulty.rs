use serde::{Deserialize, Serialize};
use std::fmt;

/// Question difficulty, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    SeniorLevel,
    HiringChallenge,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 4] = [
        DifficultyLevel::Beginner,
        DifficultyLevel::Intermediate,
        DifficultyLevel::SeniorLevel,
        DifficultyLevel::HiringChallenge,
    ];

    /// Next harder level, saturating at `HiringChallenge`.
    pub fn step_up(self) -> Self {
        match self {
            DifficultyLevel::Beginner => DifficultyLevel::Intermediate,
            DifficultyLevel::Intermediate => DifficultyLevel::SeniorLevel,
            DifficultyLevel::SeniorLevel | DifficultyLevel::HiringChallenge => {
                DifficultyLevel::HiringChallenge
            }
        }
    }

    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "Beginner",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::SeniorLevel => "Senior Level",
            DifficultyLevel::HiringChallenge => "Hiring Challenge",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_up_walks_the_ladder_and_saturates() {
        let mut level = DifficultyLevel::Beginner;
        let mut seen = vec![level];
        for _ in 0..5 {
            level = level.step_up();
            seen.push(level);
        }
        assert_eq!(
            seen,
            vec![
                DifficultyLevel::Beginner,
                DifficultyLevel::Intermediate,
                DifficultyLevel::SeniorLevel,
                DifficultyLevel::HiringChallenge,
                DifficultyLevel::HiringChallenge,
                DifficultyLevel::HiringChallenge,
            ]
        );
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DifficultyLevel::SeniorLevel).unwrap();
        assert_eq!(json, "\"senior_level\"");
        assert_eq!(DifficultyLevel::HiringChallenge.rank(), 4);
        assert_eq!(DifficultyLevel::HiringChallenge.to_string(), "Hiring Challenge");
    }
}
