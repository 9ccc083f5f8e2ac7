use std::env;
use std::time::Duration;

use tracing::warn;

use exam_core::model::TestPaper;
use exam_core::session::{DEFAULT_DURATION_SECS, MAX_DURATION_SECS};

/// Which countdown length a session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    /// Every test runs for the same number of seconds, whatever it declares.
    Fixed { secs: u64 },
    /// Use the test's declared duration (minutes), or `fallback_secs` when
    /// it declares none.
    PerTest { fallback_secs: u64 },
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self::Fixed {
            secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl DurationPolicy {
    /// Countdown length in seconds for `paper`.
    #[must_use]
    pub fn resolve(&self, paper: &TestPaper) -> u64 {
        match *self {
            DurationPolicy::Fixed { secs } => secs,
            DurationPolicy::PerTest { fallback_secs } => paper
                .declared_duration_minutes()
                .filter(|minutes| *minutes > 0)
                .map_or(fallback_secs, |minutes| {
                    (u64::from(minutes) * 60).min(MAX_DURATION_SECS)
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub duration: DurationPolicy,
    pub tick_period: Duration,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            duration: DurationPolicy::default(),
            tick_period: Duration::from_secs(1),
        }
    }
}

impl AssessmentConfig {
    /// Reads `EXAM_DURATION_POLICY` (`fixed` | `per-test`) and
    /// `EXAM_DURATION_SECS`. Unset or unparsable values keep the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = match lookup("EXAM_DURATION_SECS") {
            None => DEFAULT_DURATION_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if (1..=MAX_DURATION_SECS).contains(&secs) => secs,
                _ => {
                    warn!(%raw, "ignoring invalid EXAM_DURATION_SECS");
                    DEFAULT_DURATION_SECS
                }
            },
        };

        let duration = match lookup("EXAM_DURATION_POLICY").as_deref().map(str::trim) {
            None | Some("fixed") => DurationPolicy::Fixed { secs },
            Some("per-test") => DurationPolicy::PerTest {
                fallback_secs: secs,
            },
            Some(other) => {
                warn!(policy = other, "unknown EXAM_DURATION_POLICY, using fixed");
                DurationPolicy::Fixed { secs }
            }
        };

        Self {
            duration,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Question, QuestionId, TestId};
    use std::collections::HashMap;

    fn paper(minutes: Option<u32>) -> TestPaper {
        let q = Question::new(QuestionId::new("q1"), "Q", vec!["A".into()], None).unwrap();
        TestPaper::new(TestId::new("t1"), "Quiz", vec![q], minutes).unwrap()
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_is_fixed_five_minutes_ignoring_declared_duration() {
        let config = AssessmentConfig::default();
        assert_eq!(config.duration.resolve(&paper(Some(45))), 300);
        assert_eq!(config.tick_period, Duration::from_secs(1));
    }

    #[test]
    fn per_test_uses_declared_minutes_or_fallback() {
        let policy = DurationPolicy::PerTest { fallback_secs: 120 };
        assert_eq!(policy.resolve(&paper(Some(30))), 1800);
        assert_eq!(policy.resolve(&paper(None)), 120);
        assert_eq!(policy.resolve(&paper(Some(0))), 120);
    }

    #[test]
    fn env_selects_policy() {
        let config = AssessmentConfig::from_lookup(lookup(&[
            ("EXAM_DURATION_POLICY", "per-test"),
            ("EXAM_DURATION_SECS", "600"),
        ]));
        assert_eq!(
            config.duration,
            DurationPolicy::PerTest { fallback_secs: 600 }
        );
    }

    #[test]
    fn env_garbage_falls_back_to_defaults() {
        let config = AssessmentConfig::from_lookup(lookup(&[
            ("EXAM_DURATION_POLICY", "whatever"),
            ("EXAM_DURATION_SECS", "0"),
        ]));
        assert_eq!(config, AssessmentConfig::default());
    }

    #[test]
    fn env_durations_beyond_the_maximum_are_ignored() {
        let config = AssessmentConfig::from_lookup(lookup(&[(
            "EXAM_DURATION_SECS",
            "99999999999999999",
        )]));
        assert_eq!(config, AssessmentConfig::default());

        let config = AssessmentConfig::from_lookup(lookup(&[(
            "EXAM_DURATION_SECS",
            &MAX_DURATION_SECS.to_string(),
        )]));
        assert_eq!(
            config.duration,
            DurationPolicy::Fixed {
                secs: MAX_DURATION_SECS
            }
        );
    }

    #[test]
    fn declared_minutes_are_capped() {
        let policy = DurationPolicy::PerTest { fallback_secs: 120 };
        assert_eq!(policy.resolve(&paper(Some(u32::MAX))), MAX_DURATION_SECS);
    }
}
