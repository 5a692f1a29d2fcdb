//! The per-statement report and its line encoding.
//!
//! A [`Report`] is the terminal artifact of one statement's evaluation: the
//! triple, every passage judgment in supply order, the any-match verdict,
//! when evaluation started and how long it took.
//!
//! Reports are emitted as single JSON lines for a downstream harness:
//!
//! ```text
//! {"paragraphs":[{"text":"...","reasoning":"...","decision":true}],"finalDecision":true,
//!  "elapsed":4.2,"date":"2024-05-01","time":"12:30:00","subject":"Paris",
//!  "predicate":"capitalOf","object":"France","model":"meta/llama-2-70b-chat"}
//! ```

mod schema;

pub use schema::{validate_report_schema, SchemaError};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::aggregate::any_match;
use crate::decision::Decision;
use crate::statement::{Passage, Statement};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Errors from encoding or decoding report lines.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to encode/decode report JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report schema validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Invalid report timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Report verdict is inconsistent: finalDecision={recorded} but paragraphs give {computed}")]
    InconsistentVerdict { recorded: bool, computed: bool },
}

/// Outcome of the two-step protocol for one (statement, passage) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageJudgment {
    /// The passage that was judged
    pub passage: Passage,

    /// Free-form opinion from the first model call
    pub rationale: String,

    /// Decision distilled from the opinion by the second call
    pub decision: Decision,
}

impl PassageJudgment {
    pub fn new(passage: Passage, rationale: impl Into<String>, decision: Decision) -> Self {
        Self {
            passage,
            rationale: rationale.into(),
            decision,
        }
    }

    /// Judgment for a passage whose backend calls failed.
    pub fn unknown(passage: Passage) -> Self {
        Self::new(passage, String::new(), Decision::Unknown)
    }
}

/// Verdict for one statement with full provenance.
///
/// The final decision is derived from the judgments on construction, so a
/// report can never disagree with its own evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    statement: Statement,
    judgments: Vec<PassageJudgment>,
    final_decision: bool,
    started_at: NaiveDateTime,
    elapsed_seconds: f64,
    model: String,
}

impl Report {
    /// Build a report from judgments in supply order.
    pub fn new(
        statement: Statement,
        judgments: Vec<PassageJudgment>,
        started_at: NaiveDateTime,
        elapsed: Duration,
        model: impl Into<String>,
    ) -> Self {
        let final_decision = any_match(&judgments);
        Self {
            statement,
            judgments,
            final_decision,
            started_at,
            elapsed_seconds: elapsed.as_secs_f64(),
            model: model.into(),
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn judgments(&self) -> &[PassageJudgment] {
        &self.judgments
    }

    /// True iff at least one passage judgment is `Inferable`.
    pub fn final_decision(&self) -> bool {
        self.final_decision
    }

    /// Local wall-clock time at which evaluation of the first passage began.
    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of passages whose decision could not be determined.
    pub fn unknown_count(&self) -> usize {
        self.judgments
            .iter()
            .filter(|j| j.decision.is_unknown())
            .count()
    }

    /// Encode as a single line with every whitespace run collapsed to one space.
    pub fn serialize(&self) -> Result<String, ReportError> {
        let json = serde_json::to_string(&self.to_wire())?;
        Ok(collapse_whitespace(&json))
    }

    /// Decode a line produced by [`Report::serialize`].
    ///
    /// The line is validated against the report schema, and the recorded
    /// `finalDecision` must agree with the paragraph decisions.
    pub fn parse(line: &str) -> Result<Self, ReportError> {
        let value: serde_json::Value = serde_json::from_str(line.trim())?;
        validate_report_schema(&value).map_err(ReportError::Schema)?;
        let wire: WireReport = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    fn to_wire(&self) -> WireReport {
        WireReport {
            paragraphs: self
                .judgments
                .iter()
                .map(|j| WireParagraph {
                    text: j.passage.as_str().to_string(),
                    reasoning: j.rationale.clone(),
                    decision: j.decision.as_bool(),
                })
                .collect(),
            final_decision: self.final_decision,
            elapsed: self.elapsed_seconds,
            date: self.started_at.format(DATE_FORMAT).to_string(),
            time: self.started_at.format(TIME_FORMAT).to_string(),
            subject: self.statement.subject.clone(),
            predicate: self.statement.predicate.clone(),
            object: self.statement.object.clone(),
            model: self.model.clone(),
        }
    }

    fn from_wire(wire: WireReport) -> Result<Self, ReportError> {
        let date = NaiveDate::parse_from_str(&wire.date, DATE_FORMAT)?;
        let time = NaiveTime::parse_from_str(&wire.time, TIME_FORMAT)?;

        let judgments: Vec<PassageJudgment> = wire
            .paragraphs
            .into_iter()
            .map(|p| PassageJudgment::new(Passage::new(p.text), p.reasoning, Decision::from_bool(p.decision)))
            .collect();

        let computed = any_match(&judgments);
        if computed != wire.final_decision {
            return Err(ReportError::InconsistentVerdict {
                recorded: wire.final_decision,
                computed,
            });
        }

        Ok(Self {
            statement: Statement::new(wire.subject, wire.predicate, wire.object),
            judgments,
            final_decision: computed,
            started_at: NaiveDateTime::new(date, time),
            elapsed_seconds: wire.elapsed,
            model: wire.model,
        })
    }
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Line format consumed by the downstream harness.
#[derive(Debug, Serialize, Deserialize)]
struct WireReport {
    paragraphs: Vec<WireParagraph>,
    #[serde(rename = "finalDecision")]
    final_decision: bool,
    elapsed: f64,
    date: String,
    time: String,
    subject: String,
    predicate: String,
    object: String,
    model: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireParagraph {
    text: String,
    reasoning: String,
    decision: Option<bool>,
}
