//! Threshold Evaluator - severity escalation lookup
//!
//! Pure logic, no state. The caller gathers measured counters (error
//! counts, offline drives, ...) and passes them in together with the
//! severity table from the topology snapshot.
//!
//! The lookup is first-match: statuses are visited in declared order, the
//! optimal status is skipped, and the first counter whose measured value
//! reaches its threshold decides the result. Declaration order therefore
//! settles ties; this is not a max-severity scan.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::THRESHOLD_NEVER_SENTINEL;
use crate::error::ConfigError;

/// Measured counter values, keyed by counter name.
pub type Counters = IndexMap<String, i64>;

/// Ordered status → (counter → threshold) mapping.
pub type StatusThresholds = IndexMap<String, IndexMap<String, Threshold>>;

// =============================================================================
// Threshold
// =============================================================================

/// One counter bound inside a severity table.
///
/// The wire format is a plain integer; `-1` decodes to [`Threshold::Never`]
/// and any other negative number is rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Threshold {
    /// The counter never triggers this status.
    Never,
    /// Triggers when the measured value is `>=` the bound.
    AtLeast(i64),
}

impl Threshold {
    /// Does `value` trip this threshold?
    #[must_use]
    pub fn is_reached_by(self, value: i64) -> bool {
        match self {
            Self::Never => false,
            Self::AtLeast(bound) => value >= bound,
        }
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            THRESHOLD_NEVER_SENTINEL => Ok(Self::Never),
            v if v < 0 => Err(ConfigError::MalformedThreshold(v)),
            v => Ok(Self::AtLeast(v)),
        }
    }
}

impl From<Threshold> for i64 {
    fn from(threshold: Threshold) -> Self {
        match threshold {
            Threshold::Never => THRESHOLD_NEVER_SENTINEL,
            Threshold::AtLeast(v) => v,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Map measured counters to a status name using first-match escalation.
///
/// Counters present in the table but absent from `measured` do not trigger.
/// Returns `optimal` when nothing matches.
#[must_use]
pub fn evaluate<'a>(table: &'a StatusThresholds, measured: &Counters, optimal: &'a str) -> &'a str {
    for (status, counters) in table {
        if status == optimal {
            continue;
        }

        let tripped = counters.iter().any(|(counter, threshold)| {
            measured
                .get(counter)
                .is_some_and(|value| threshold.is_reached_by(*value))
        });

        if tripped {
            return status;
        }
    }

    optimal
}

// =============================================================================
// SeverityTable
// =============================================================================

/// A severity table for one asset category, as stored in the topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityTable {
    /// Baseline status returned when nothing is exceeded.
    pub optimal: String,
    /// Statuses in escalation order.
    pub statuses: StatusThresholds,
}

impl SeverityTable {
    /// Evaluate measured counters against this table.
    #[must_use]
    pub fn evaluate(&self, measured: &Counters) -> &str {
        evaluate(&self.statuses, measured, &self.optimal)
    }

    /// Check the table is usable before any evaluation happens.
    pub fn validate(&self, category: &str) -> Result<(), ConfigError> {
        if self.statuses.is_empty() {
            return Err(ConfigError::EmptySeverityTable(category.to_string()));
        }
        if !self.statuses.contains_key(&self.optimal) {
            return Err(ConfigError::MissingOptimalStatus {
                category: category.to_string(),
                optimal: self.optimal.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(pairs: &[(&str, i64)]) -> Counters {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn table(rows: Vec<(&str, Vec<(&str, i64)>)>) -> StatusThresholds {
        rows.into_iter()
            .map(|(status, bounds)| {
                let bounds = bounds
                    .into_iter()
                    .map(|(c, v)| {
                        let threshold = Threshold::try_from(v).expect("valid threshold");
                        (c.to_string(), threshold)
                    })
                    .collect();
                (status.to_string(), bounds)
            })
            .collect()
    }

    #[test]
    fn test_first_match_wins_over_later_status() {
        let t = table(vec![
            ("Critical", vec![("errors", 5)]),
            ("Degraded", vec![("errors", 1)]),
            ("Optimal", vec![("errors", 0)]),
        ]);

        assert_eq!(evaluate(&t, &counters(&[("errors", 5)]), "Optimal"), "Critical");
        assert_eq!(evaluate(&t, &counters(&[("errors", 3)]), "Optimal"), "Degraded");
    }

    #[test]
    fn test_optimal_when_nothing_reached() {
        let t = table(vec![
            ("Critical", vec![("errors", 5)]),
            ("Degraded", vec![("errors", 1)]),
            ("Optimal", vec![("errors", 0)]),
        ]);
        assert_eq!(evaluate(&t, &counters(&[("errors", 0)]), "Optimal"), "Optimal");
    }

    #[test]
    fn test_sentinel_never_triggers() {
        let t = table(vec![
            ("Critical", vec![("errors", -1), ("offline", 2)]),
            ("Optimal", vec![("errors", 0), ("offline", 0)]),
        ]);
        let measured = counters(&[("errors", i64::MAX), ("offline", 0)]);
        assert_eq!(evaluate(&t, &measured, "Optimal"), "Optimal");
    }

    #[test]
    fn test_any_single_counter_is_enough() {
        let t = table(vec![
            ("Dgrd", vec![("mediaErrorCount", 10), ("numPdOffline", 1)]),
            ("Optl", vec![("mediaErrorCount", 0), ("numPdOffline", 0)]),
        ]);
        let measured = counters(&[("mediaErrorCount", 0), ("numPdOffline", 1)]);
        assert_eq!(evaluate(&t, &measured, "Optl"), "Dgrd");
    }

    #[test]
    fn test_optimal_listed_first_is_skipped() {
        // Optimal carries 0 thresholds that every value would reach.
        let t = table(vec![("Optimal", vec![("errors", 0)]), ("Degraded", vec![("errors", 2)])]);
        assert_eq!(evaluate(&t, &counters(&[("errors", 1)]), "Optimal"), "Optimal");
        assert_eq!(evaluate(&t, &counters(&[("errors", 2)]), "Optimal"), "Degraded");
    }

    #[test]
    fn test_unmeasured_counter_does_not_trigger() {
        let t = table(vec![("Critical", vec![("temperature", 0)]), ("Optimal", vec![])]);
        assert_eq!(evaluate(&t, &counters(&[]), "Optimal"), "Optimal");
    }

    #[test]
    fn test_threshold_wire_format() {
        let parsed: IndexMap<String, Threshold> =
            serde_json::from_str(r#"{"a": -1, "b": 4}"#).unwrap();
        assert_eq!(parsed["a"], Threshold::Never);
        assert_eq!(parsed["b"], Threshold::AtLeast(4));

        let malformed: Result<IndexMap<String, Threshold>, _> =
            serde_json::from_str(r#"{"a": -2}"#);
        assert!(malformed.is_err());
    }

    #[test]
    fn test_table_declaration_order_survives_parsing() {
        let parsed: SeverityTable = serde_json::from_str(
            r#"{"optimal": "Optimal",
                "statuses": {"Zeta": {"e": 1}, "Alpha": {"e": 1}, "Optimal": {"e": 0}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.evaluate(&counters(&[("e", 1)])), "Zeta");
    }

    #[test]
    fn test_validate_requires_optimal_row() {
        let table = SeverityTable {
            optimal: "Optl".to_string(),
            statuses: table(vec![("Dgrd", vec![("e", 1)])]),
        };
        assert!(matches!(
            table.validate("virtual_drive"),
            Err(ConfigError::MissingOptimalStatus { .. })
        ));
    }
}
