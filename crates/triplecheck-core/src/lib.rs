//! # triplecheck-core
//!
//! Deterministic model for verifying knowledge-graph statements against
//! text passages with an LLM judge.
//!
//! This crate answers, for one `(subject, predicate, object)` triple:
//! - Which passages were considered?
//! - What did the judge say about each one, and what did that reduce to?
//! - Is the statement inferable from the resource as a whole?
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: no network, no LLM calls. Those live in `triplecheck-runtime`.
//! 2. **Any-match verdict**: a report's final decision is true iff at least one
//!    passage judgment is true. It is computed, never supplied.
//! 3. **Order preserving**: judgments appear in the order passages were supplied.
//! 4. **Explicit uncertainty**: an unparseable decision is `Decision::Unknown`,
//!    not a silent `false`.
//!
//! ## Example
//!
//! ```rust
//! use triplecheck_core::{Aggregation, Decision, Passage, PassageJudgment, Statement};
//!
//! let statement: Statement = "Paris,capitalOf,France".parse().unwrap();
//! let mut aggregation = Aggregation::start(statement);
//! aggregation.push(PassageJudgment::new(
//!     Passage::new("Paris is the capital of France and its largest city."),
//!     "Yes, the snippet states it directly.",
//!     Decision::classify("A) The RDF statement can be inferred from the snippet."),
//! ));
//! let report = aggregation.finish("meta/llama-2-70b-chat");
//! assert!(report.final_decision());
//! ```

pub mod aggregate;
pub mod decision;
pub mod report;
pub mod statement;

pub use aggregate::{any_match, Aggregation};
pub use decision::Decision;
pub use report::{PassageJudgment, Report, ReportError};
pub use statement::{Passage, Statement, StatementError};
