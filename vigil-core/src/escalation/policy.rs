//! Escalation Policy — score deltas and the threshold table
//!
//! The score→level mapping is an ordered table of `(min_score, level)` pairs
//! resolved by the highest satisfied threshold, not a chain of conditionals,
//! so thresholds are configurable and testable in isolation.

use serde::{Deserialize, Serialize};

/// Default upper bound on the escalation score.
pub const DEFAULT_SCORE_MAX: u32 = 300;
/// Default score increase per violation verdict.
pub const DEFAULT_VIOLATION_DELTA: u32 = 20;
/// Default score decrease per compliant verdict.
pub const DEFAULT_RECOVERY_DELTA: u32 = 10;

/// Default threshold table: level 0 is "no intervention".
const DEFAULT_THRESHOLDS: &[(u32, u8)] = &[(0, 0), (20, 1), (50, 2), (100, 3), (200, 4)];

/// Error type for policy construction
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Threshold table must not be empty")]
    EmptyTable,

    #[error("First threshold must start at score 0 (got {0})")]
    FirstThresholdNonZero(u32),

    #[error("Threshold scores must be strictly increasing ({prev} then {next})")]
    NonMonotonicScore { prev: u32, next: u32 },

    #[error("Threshold levels must be strictly increasing ({prev} then {next})")]
    NonMonotonicLevel { prev: u8, next: u8 },
}

/// Ordered `(min_score, level)` pairs mapping a score to a discrete level.
///
/// Invariants established at construction and relied on by `level_for`:
/// the table is non-empty, starts at score 0, and both scores and levels
/// are strictly increasing. `level_for` is therefore total and monotonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(u32, u8)>", into = "Vec<(u32, u8)>")]
pub struct ThresholdTable {
    entries: Vec<(u32, u8)>,
}

impl ThresholdTable {
    /// Build a table, validating the ordering invariants.
    pub fn new(entries: Vec<(u32, u8)>) -> Result<Self, PolicyError> {
        let first = entries.first().ok_or(PolicyError::EmptyTable)?;
        if first.0 != 0 {
            return Err(PolicyError::FirstThresholdNonZero(first.0));
        }
        for pair in entries.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.0 <= prev.0 {
                return Err(PolicyError::NonMonotonicScore {
                    prev: prev.0,
                    next: next.0,
                });
            }
            if next.1 <= prev.1 {
                return Err(PolicyError::NonMonotonicLevel {
                    prev: prev.1,
                    next: next.1,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Level of the largest threshold satisfied by `score`.
    ///
    /// Always defined: the table starts at score 0.
    pub fn level_for(&self, score: u32) -> u8 {
        self.entries
            .iter()
            .rev()
            .find(|(min, _)| score >= *min)
            .map(|(_, level)| *level)
            .unwrap_or(0)
    }

    /// Highest level the table can produce.
    pub fn max_level(&self) -> u8 {
        self.entries.last().map(|(_, level)| *level).unwrap_or(0)
    }

    /// The raw `(min_score, level)` pairs, in ascending order.
    pub fn entries(&self) -> &[(u32, u8)] {
        &self.entries
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl TryFrom<Vec<(u32, u8)>> for ThresholdTable {
    type Error = PolicyError;

    fn try_from(entries: Vec<(u32, u8)>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ThresholdTable> for Vec<(u32, u8)> {
    fn from(table: ThresholdTable) -> Self {
        table.entries
    }
}

/// Policy controlling how verdicts move the escalation score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Upper bound on the score (clamp, not wrap-around).
    pub score_max: u32,
    /// Score added per violation verdict.
    pub violation_delta: u32,
    /// Score removed per compliant verdict.
    pub recovery_delta: u32,
    /// Score→level mapping.
    pub thresholds: ThresholdTable,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            score_max: DEFAULT_SCORE_MAX,
            violation_delta: DEFAULT_VIOLATION_DELTA,
            recovery_delta: DEFAULT_RECOVERY_DELTA,
            thresholds: ThresholdTable::default(),
        }
    }
}

impl EscalationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score_max(mut self, score_max: u32) -> Self {
        self.score_max = score_max;
        self
    }

    pub fn with_violation_delta(mut self, delta: u32) -> Self {
        self.violation_delta = delta;
        self
    }

    pub fn with_recovery_delta(mut self, delta: u32) -> Self {
        self.recovery_delta = delta;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Level for a score under this policy's table.
    pub fn level_for(&self, score: u32) -> u8 {
        self.thresholds.level_for(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_levels() {
        let table = ThresholdTable::default();
        assert_eq!(table.level_for(0), 0);
        assert_eq!(table.level_for(19), 0);
        assert_eq!(table.level_for(20), 1);
        assert_eq!(table.level_for(49), 1);
        assert_eq!(table.level_for(50), 2);
        assert_eq!(table.level_for(100), 3);
        assert_eq!(table.level_for(200), 4);
        assert_eq!(table.level_for(300), 4);
        assert_eq!(table.max_level(), 4);
    }

    #[test]
    fn test_level_mapping_is_monotonic() {
        let table = ThresholdTable::default();
        let mut prev = table.level_for(0);
        for score in 1..=DEFAULT_SCORE_MAX {
            let level = table.level_for(score);
            assert!(
                level >= prev,
                "level decreased at score {}: {} -> {}",
                score,
                prev,
                level
            );
            prev = level;
        }
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            ThresholdTable::new(vec![]),
            Err(PolicyError::EmptyTable)
        ));
    }

    #[test]
    fn test_first_threshold_must_be_zero() {
        assert!(matches!(
            ThresholdTable::new(vec![(10, 0), (20, 1)]),
            Err(PolicyError::FirstThresholdNonZero(10))
        ));
    }

    #[test]
    fn test_non_monotonic_scores_rejected() {
        assert!(matches!(
            ThresholdTable::new(vec![(0, 0), (50, 1), (50, 2)]),
            Err(PolicyError::NonMonotonicScore { prev: 50, next: 50 })
        ));
    }

    #[test]
    fn test_non_monotonic_levels_rejected() {
        assert!(matches!(
            ThresholdTable::new(vec![(0, 0), (50, 2), (100, 1)]),
            Err(PolicyError::NonMonotonicLevel { prev: 2, next: 1 })
        ));
    }

    #[test]
    fn test_custom_table() {
        let table = ThresholdTable::new(vec![(0, 0), (100, 1)]).unwrap();
        assert_eq!(table.level_for(99), 0);
        assert_eq!(table.level_for(100), 1);
        assert_eq!(table.level_for(u32::MAX), 1);
    }

    #[test]
    fn test_table_serde_roundtrip() {
        let table = ThresholdTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let restored: ThresholdTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_table_serde_rejects_invalid() {
        let json = "[[5, 0], [20, 1]]";
        let result: Result<ThresholdTable, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_builders() {
        let policy = EscalationPolicy::new()
            .with_score_max(100)
            .with_violation_delta(25)
            .with_recovery_delta(5);
        assert_eq!(policy.score_max, 100);
        assert_eq!(policy.violation_delta, 25);
        assert_eq!(policy.recovery_delta, 5);
    }
}
