//! Aggregation: folds per-passage judgments into one report.
//!
//! The policy is strict any-match, not a vote:
//! 1. If ANY judgment is `Inferable` -> the statement is inferable
//! 2. `Unknown` judgments never count towards the verdict
//! 3. No judgments at all -> not inferable

use chrono::{Local, NaiveDateTime};
use std::time::Instant;

use crate::report::{PassageJudgment, Report};
use crate::statement::Statement;

/// Any-match verdict over passage judgments.
pub fn any_match(judgments: &[PassageJudgment]) -> bool {
    judgments.iter().any(|j| j.decision.is_inferable())
}

/// Working state for one statement's evaluation.
///
/// Holds the judgments collected so far, in the order passages were
/// supplied, plus both clocks: wall-clock for the report timestamp and
/// monotonic for the elapsed time.
#[derive(Debug)]
pub struct Aggregation {
    statement: Statement,
    judgments: Vec<PassageJudgment>,
    started_at: NaiveDateTime,
    started: Instant,
}

impl Aggregation {
    /// Start timing evaluation of `statement`.
    pub fn start(statement: Statement) -> Self {
        Self {
            statement,
            judgments: Vec::new(),
            started_at: Local::now().naive_local(),
            started: Instant::now(),
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Append the next judgment. Order of calls is the order in the report.
    pub fn push(&mut self, judgment: PassageJudgment) {
        self.judgments.push(judgment);
    }

    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }

    /// Stop the clock and build the report.
    ///
    /// Elapsed time is `end - start` on the monotonic clock, so it is never
    /// negative even if the wall clock moves backwards.
    pub fn finish(self, model: impl Into<String>) -> Report {
        let elapsed = self.started.elapsed();
        tracing::debug!(
            statement = %self.statement,
            passages = self.judgments.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Aggregation finished"
        );
        Report::new(
            self.statement,
            self.judgments,
            self.started_at,
            elapsed,
            model,
        )
    }
}
