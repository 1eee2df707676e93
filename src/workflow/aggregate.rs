//! Fan-in of task results.
//!
//! [`ResultAggregator`] is a counting barrier: it is told how many results a
//! run must produce, accepts them one at a time and hands back a
//! [`Partition`] on the submission that completes the count. It never emits
//! a partial partition and never fires twice.

use parking_lot::Mutex;
use serde::Serialize;

use super::task::TaskResult;
use crate::core::{VerdictPolicy, WorkflowError, WorkflowResult};

/// Placeholder for an empty relevant list.
pub const NO_RELEVANT_RESULTS: &str = "No Relevant Results";

/// Placeholder for an empty non-relevant list.
pub const NO_NON_RELEVANT_RESULTS: &str = "No Non-Relevant Results";

/// Interpretation of a raw verdict string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    /// Exactly "Yes".
    Relevant,
    /// Exactly "No".
    NotRelevant,
    /// Anything else.
    Unrecognized(&'a str),
}

impl<'a> Verdict<'a> {
    /// Parse a verdict. Only the exact strings "Yes" and "No" are recognized.
    pub fn parse(raw: &'a str) -> Self {
        match raw {
            "Yes" => Self::Relevant,
            "No" => Self::NotRelevant,
            other => Self::Unrecognized(other),
        }
    }
}

/// Final split of all classified targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Targets judged relevant, or the single `NO_RELEVANT_RESULTS` entry.
    pub relevant: Vec<String>,
    /// Targets judged not relevant, or the single `NO_NON_RELEVANT_RESULTS` entry.
    pub non_relevant: Vec<String>,
    /// Targets with an unrecognized verdict (only under `VerdictPolicy::Separate`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized: Vec<String>,
}

impl Partition {
    /// Partition results in collection order.
    pub fn from_results(results: &[TaskResult], policy: VerdictPolicy) -> WorkflowResult<Self> {
        let mut relevant = Vec::new();
        let mut non_relevant = Vec::new();
        let mut unrecognized = Vec::new();

        for result in results {
            match Verdict::parse(&result.verdict) {
                Verdict::Relevant => relevant.push(result.target.clone()),
                Verdict::NotRelevant => non_relevant.push(result.target.clone()),
                Verdict::Unrecognized(raw) => {
                    tracing::warn!(file = %result.target, verdict = raw, policy = ?policy, "Unrecognized verdict");
                    match policy {
                        VerdictPolicy::NonRelevant => non_relevant.push(result.target.clone()),
                        VerdictPolicy::Separate => unrecognized.push(result.target.clone()),
                        VerdictPolicy::Fail => {
                            return Err(WorkflowError::UnrecognizedVerdict {
                                target: result.target.clone(),
                                verdict: raw.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if relevant.is_empty() {
            relevant.push(NO_RELEVANT_RESULTS.to_string());
        }
        if non_relevant.is_empty() {
            non_relevant.push(NO_NON_RELEVANT_RESULTS.to_string());
        }

        Ok(Self { relevant, non_relevant, unrecognized })
    }

    /// Whether any target was judged relevant.
    pub fn has_relevant(&self) -> bool {
        !is_sentinel(&self.relevant, NO_RELEVANT_RESULTS)
    }

    /// Relevant targets without the placeholder.
    pub fn relevant_targets(&self) -> &[String] {
        if self.has_relevant() {
            &self.relevant
        } else {
            &[]
        }
    }

    /// Non-relevant targets without the placeholder.
    pub fn non_relevant_targets(&self) -> &[String] {
        if is_sentinel(&self.non_relevant, NO_NON_RELEVANT_RESULTS) {
            &[]
        } else {
            &self.non_relevant
        }
    }
}

fn is_sentinel(list: &[String], sentinel: &str) -> bool {
    matches!(list, [only] if only == sentinel)
}

/// What a call to [`ResultAggregator::record`] or [`ResultAggregator::submit`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// More results are still expected.
    Waiting { collected: usize, expected: usize },
    /// The last expected result arrived.
    Complete(Partition),
}

#[derive(Debug, Default)]
struct RunState {
    expected: Option<usize>,
    collected: Vec<TaskResult>,
    finalized: bool,
}

/// Counting barrier over the results of one run.
#[derive(Debug)]
pub struct ResultAggregator {
    policy: VerdictPolicy,
    state: Mutex<RunState>,
}

impl ResultAggregator {
    /// Create an aggregator for one run.
    pub fn new(policy: VerdictPolicy) -> Self {
        Self { policy, state: Mutex::new(RunState::default()) }
    }

    /// Set how many results the run must collect.
    ///
    /// Allowed once. A count of zero completes the barrier immediately.
    pub fn record(&self, expected: usize) -> WorkflowResult<SubmitOutcome> {
        let mut state = self.state.lock();
        if let Some(previous) = state.expected {
            return Err(WorkflowError::AggregationInvariant(format!(
                "expected count already recorded as {previous}"
            )));
        }
        state.expected = Some(expected);

        if expected == 0 {
            return self.finalize(&mut state);
        }
        Ok(SubmitOutcome::Waiting { collected: 0, expected })
    }

    /// Add one result.
    pub fn submit(&self, result: TaskResult) -> WorkflowResult<SubmitOutcome> {
        let mut state = self.state.lock();
        let Some(expected) = state.expected else {
            return Err(WorkflowError::AggregationInvariant(format!(
                "result for {} submitted before the expected count was recorded",
                result.target
            )));
        };
        if state.finalized {
            return Err(WorkflowError::AggregationInvariant(format!(
                "result for {} submitted after all {expected} results were collected",
                result.target
            )));
        }

        state.collected.push(result);
        let collected = state.collected.len();
        if collected == expected {
            return self.finalize(&mut state);
        }
        Ok(SubmitOutcome::Waiting { collected, expected })
    }

    /// Expected result count, once recorded.
    pub fn expected(&self) -> Option<usize> {
        self.state.lock().expected
    }

    /// Number of results collected so far.
    pub fn collected(&self) -> usize {
        self.state.lock().collected.len()
    }

    /// Whether the barrier has fired.
    pub fn is_finalized(&self) -> bool {
        self.state.lock().finalized
    }

    fn finalize(&self, state: &mut RunState) -> WorkflowResult<SubmitOutcome> {
        state.finalized = true;
        Partition::from_results(&state.collected, self.policy).map(SubmitOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn result(target: &str, verdict: &str) -> TaskResult {
        TaskResult::new(target, verdict)
    }

    #[test]
    fn test_verdict_parse_is_exact() {
        assert_eq!(Verdict::parse("Yes"), Verdict::Relevant);
        assert_eq!(Verdict::parse("No"), Verdict::NotRelevant);
        assert_eq!(Verdict::parse("yes"), Verdict::Unrecognized("yes"));
        assert_eq!(Verdict::parse("Yes."), Verdict::Unrecognized("Yes."));
    }

    #[test]
    fn test_partition_splits_by_verdict() {
        let results = [result("file1", "Yes"), result("file2", "No"), result("file3", "Yes")];

        let partition = Partition::from_results(&results, VerdictPolicy::NonRelevant).unwrap();

        assert_eq!(partition.relevant, vec!["file1", "file3"]);
        assert_eq!(partition.non_relevant, vec!["file2"]);
        assert!(partition.unrecognized.is_empty());
        assert!(partition.has_relevant());
    }

    #[test]
    fn test_partition_sentinels() {
        let partition = Partition::from_results(&[], VerdictPolicy::NonRelevant).unwrap();

        assert_eq!(partition.relevant, vec![NO_RELEVANT_RESULTS]);
        assert_eq!(partition.non_relevant, vec![NO_NON_RELEVANT_RESULTS]);
        assert!(!partition.has_relevant());
        assert!(partition.relevant_targets().is_empty());
        assert!(partition.non_relevant_targets().is_empty());
    }

    #[test]
    fn test_only_relevant_gets_non_relevant_sentinel() {
        let results = [result("a", "Yes")];
        let partition = Partition::from_results(&results, VerdictPolicy::NonRelevant).unwrap();

        assert_eq!(partition.relevant_targets(), ["a".to_string()]);
        assert_eq!(partition.non_relevant, vec![NO_NON_RELEVANT_RESULTS]);
    }

    #[test]
    fn test_unrecognized_as_non_relevant() {
        let results = [result("a", "Maybe"), result("b", "Yes")];
        let partition = Partition::from_results(&results, VerdictPolicy::NonRelevant).unwrap();

        assert_eq!(partition.relevant, vec!["b"]);
        assert_eq!(partition.non_relevant, vec!["a"]);
    }

    #[test]
    fn test_unrecognized_separate_bucket() {
        let results = [result("a", "Maybe"), result("b", "No")];
        let partition = Partition::from_results(&results, VerdictPolicy::Separate).unwrap();

        assert_eq!(partition.relevant, vec![NO_RELEVANT_RESULTS]);
        assert_eq!(partition.non_relevant, vec!["b"]);
        assert_eq!(partition.unrecognized, vec!["a"]);
    }

    #[test]
    fn test_unrecognized_fails_run() {
        let results = [result("a", "Yes"), result("b", "I cannot tell")];
        let err = Partition::from_results(&results, VerdictPolicy::Fail).unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::UnrecognizedVerdict { ref target, ref verdict }
                if target == "b" && verdict == "I cannot tell"
        ));
    }

    #[test]
    fn test_partition_json_omits_empty_unrecognized() {
        let partition =
            Partition::from_results(&[result("a", "Yes")], VerdictPolicy::Separate).unwrap();
        let json = serde_json::to_value(&partition).unwrap();

        assert_eq!(json["relevant"][0], "a");
        assert!(json.get("unrecognized").is_none());
    }

    #[test]
    fn test_barrier_fires_on_last_submit() {
        let aggregator = ResultAggregator::new(VerdictPolicy::NonRelevant);
        assert_eq!(
            aggregator.record(3).unwrap(),
            SubmitOutcome::Waiting { collected: 0, expected: 3 }
        );

        assert_eq!(
            aggregator.submit(result("file1", "Yes")).unwrap(),
            SubmitOutcome::Waiting { collected: 1, expected: 3 }
        );
        assert_eq!(
            aggregator.submit(result("file2", "No")).unwrap(),
            SubmitOutcome::Waiting { collected: 2, expected: 3 }
        );
        assert!(!aggregator.is_finalized());

        match aggregator.submit(result("file3", "Yes")).unwrap() {
            SubmitOutcome::Complete(partition) => {
                assert_eq!(partition.relevant, vec!["file1", "file3"]);
                assert_eq!(partition.non_relevant, vec!["file2"]);
            }
            SubmitOutcome::Waiting { .. } => panic!("barrier should have fired"),
        }
        assert!(aggregator.is_finalized());
        assert_eq!(aggregator.collected(), 3);
    }

    #[test]
    fn test_zero_expected_completes_immediately() {
        let aggregator = ResultAggregator::new(VerdictPolicy::NonRelevant);

        match aggregator.record(0).unwrap() {
            SubmitOutcome::Complete(partition) => {
                assert_eq!(partition.relevant, vec![NO_RELEVANT_RESULTS]);
                assert_eq!(partition.non_relevant, vec![NO_NON_RELEVANT_RESULTS]);
            }
            SubmitOutcome::Waiting { .. } => panic!("empty run should finalize on record"),
        }
    }

    #[test]
    fn test_record_twice_is_invariant_error() {
        let aggregator = ResultAggregator::new(VerdictPolicy::NonRelevant);
        aggregator.record(2).unwrap();

        assert!(matches!(aggregator.record(2), Err(WorkflowError::AggregationInvariant(_))));
        assert_eq!(aggregator.expected(), Some(2));
    }

    #[test]
    fn test_submit_before_record_is_invariant_error() {
        let aggregator = ResultAggregator::new(VerdictPolicy::NonRelevant);
        assert!(matches!(
            aggregator.submit(result("a", "Yes")),
            Err(WorkflowError::AggregationInvariant(_))
        ));
    }

    #[test]
    fn test_submit_after_finalize_is_invariant_error() {
        let aggregator = ResultAggregator::new(VerdictPolicy::NonRelevant);
        aggregator.record(1).unwrap();
        assert!(matches!(aggregator.submit(result("a", "Yes")), Ok(SubmitOutcome::Complete(_))));

        assert!(matches!(
            aggregator.submit(result("b", "No")),
            Err(WorkflowError::AggregationInvariant(_))
        ));
        assert_eq!(aggregator.collected(), 1);
    }

    #[test]
    fn test_concurrent_submits_fire_exactly_once() {
        let aggregator = Arc::new(ResultAggregator::new(VerdictPolicy::NonRelevant));
        aggregator.record(64).unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    let verdict = if i % 2 == 0 { "Yes" } else { "No" };
                    aggregator.submit(result(&format!("file{i}"), verdict)).unwrap()
                })
            })
            .collect();

        let completions: Vec<Partition> = handles
            .into_iter()
            .filter_map(|h| match h.join().unwrap() {
                SubmitOutcome::Complete(partition) => Some(partition),
                SubmitOutcome::Waiting { .. } => None,
            })
            .collect();

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].relevant.len(), 32);
        assert_eq!(completions[0].non_relevant.len(), 32);
    }
}
