//! Outcome model: what happened to one drained task.
//!
//! Every outcome except `SummarizerFailed` is terminal: the source is marked
//! in the dedup ledger and never processed again.

use serde::{Deserialize, Serialize};

/// Response of the external summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Text(String),
    /// The literal one-word sentinel `SKIP`.
    Skip,
}

impl Summary {
    pub const SKIP_SENTINEL: &'static str = "SKIP";

    /// Classify raw summarizer output. Surrounding whitespace is ignored.
    pub fn from_output(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == Self::SKIP_SENTINEL {
            Summary::Skip
        } else {
            Summary::Text(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    /// A daily entry was appended.
    Summarized,
    /// Summarizer answered `SKIP`.
    Skipped,
    SourceMissing,
    AlreadyResolved,
    BelowThreshold { count: usize, min: usize },
    /// Nothing readable could be projected from the source.
    EmptyProjection,
    /// Transport failure or timeout. Not marked; a later trigger may retry.
    SummarizerFailed { reason: String },
}

impl TaskOutcome {
    /// Whether this outcome must be recorded in the dedup ledger.
    pub fn marks_resolved(&self) -> bool {
        !matches!(
            self,
            TaskOutcome::AlreadyResolved | TaskOutcome::SummarizerFailed { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::SummarizerFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare("SKIP", Summary::Skip)]
    #[case::padded("  SKIP\n", Summary::Skip)]
    #[case::lowercase("skip", Summary::Text("skip".to_string()))]
    #[case::sentence("SKIP this one", Summary::Text("SKIP this one".to_string()))]
    #[case::markdown("## Topic\n...", Summary::Text("## Topic\n...".to_string()))]
    fn summary_classifies_sentinel(#[case] raw: &str, #[case] expected: Summary) {
        assert_eq!(Summary::from_output(raw), expected);
    }

    #[rstest]
    #[case::summarized(TaskOutcome::Summarized, true)]
    #[case::skipped(TaskOutcome::Skipped, true)]
    #[case::missing(TaskOutcome::SourceMissing, true)]
    #[case::below(TaskOutcome::BelowThreshold { count: 2, min: 4 }, true)]
    #[case::empty(TaskOutcome::EmptyProjection, true)]
    #[case::already(TaskOutcome::AlreadyResolved, false)]
    #[case::failed(TaskOutcome::SummarizerFailed { reason: "timeout".into() }, false)]
    fn only_terminal_outcomes_mark(#[case] outcome: TaskOutcome, #[case] marks: bool) {
        assert_eq!(outcome.marks_resolved(), marks);
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let v = serde_json::to_value(TaskOutcome::BelowThreshold { count: 2, min: 4 }).unwrap();
        assert_eq!(v["kind"], "BELOW_THRESHOLD");
        assert_eq!(v["count"], 2);
    }
}
