use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordinal performance band of a student.
///
/// Bands come from the total score: Low is 0-69, Middle is 70-89 and
/// High is 90-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GradeLevel {
    Low,
    Middle,
    High,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GradeError {
    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(u32),
    #[error("unknown grade code {0:?} (expected L, M, H, Low, Middle or High)")]
    UnknownCode(String),
}

impl GradeLevel {
    /// All levels in ordinal order; the position is the class index.
    pub const ALL: [GradeLevel; 3] = [GradeLevel::Low, GradeLevel::Middle, GradeLevel::High];

    pub fn from_score(score: u32) -> Result<Self, GradeError> {
        match score {
            0..=69 => Ok(GradeLevel::Low),
            70..=89 => Ok(GradeLevel::Middle),
            90..=100 => Ok(GradeLevel::High),
            _ => Err(GradeError::ScoreOutOfRange(score)),
        }
    }

    /// Parse the dataset's `Class` column.
    pub fn from_code(code: &str) -> Result<Self, GradeError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(GradeLevel::Low),
            "m" | "middle" => Ok(GradeLevel::Middle),
            "h" | "high" => Ok(GradeLevel::High),
            _ => Err(GradeError::UnknownCode(code.to_string())),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            GradeLevel::Low => "Low",
            GradeLevel::Middle => "Middle",
            GradeLevel::High => "High",
        }
    }

    /// Inclusive score range of the band.
    pub fn score_range(self) -> (u32, u32) {
        match self {
            GradeLevel::Low => (0, 69),
            GradeLevel::Middle => (70, 89),
            GradeLevel::High => (90, 100),
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GradeLevel {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GradeLevel::from_code(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_boundaries() {
        assert_eq!(GradeLevel::from_score(0).unwrap(), GradeLevel::Low);
        assert_eq!(GradeLevel::from_score(69).unwrap(), GradeLevel::Low);
        assert_eq!(GradeLevel::from_score(70).unwrap(), GradeLevel::Middle);
        assert_eq!(GradeLevel::from_score(89).unwrap(), GradeLevel::Middle);
        assert_eq!(GradeLevel::from_score(90).unwrap(), GradeLevel::High);
        assert_eq!(GradeLevel::from_score(100).unwrap(), GradeLevel::High);
        assert_eq!(GradeLevel::from_score(101), Err(GradeError::ScoreOutOfRange(101)));
    }

    #[test]
    fn test_codes() {
        assert_eq!("L".parse::<GradeLevel>().unwrap(), GradeLevel::Low);
        assert_eq!("middle".parse::<GradeLevel>().unwrap(), GradeLevel::Middle);
        assert_eq!(" H ".parse::<GradeLevel>().unwrap(), GradeLevel::High);
        assert!("X".parse::<GradeLevel>().is_err());
    }

    #[test]
    fn test_ordering_matches_index() {
        assert!(GradeLevel::Low < GradeLevel::Middle && GradeLevel::Middle < GradeLevel::High);
        for (i, level) in GradeLevel::ALL.iter().enumerate() {
            assert_eq!(level.index(), i);
            assert_eq!(GradeLevel::from_index(i), Some(*level));
        }
        assert_eq!(GradeLevel::High.score_range(), (90, 100));
    }
}
