//! # triplecheck-runtime
//!
//! LLM-judged verification of RDF statements against a web resource.
//!
//! This crate supplies everything `triplecheck-core` deliberately leaves out:
//! network access to inference backends, the two-step judgment protocol,
//! the driver that runs it over every passage, and the document source that
//! produces those passages.
//!
//! ## Flow
//!
//! ```text
//! DocumentSource::fetch(url) -> [Passage]
//!   for each Statement:
//!     Verifier::verify
//!       for each Passage:
//!         Judge::judge -> opinion call, decision call -> PassageJudgment
//!       Aggregation::finish -> Report
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use triplecheck_runtime::{ProviderConfig, ProviderKind, ProviderRegistry, VerifierBuilder};
//!
//! let config = ProviderConfig::new(ProviderKind::Tgi, "llama-3-8b")
//!     .with_endpoint("http://localhost:8080");
//! let provider = ProviderRegistry::with_defaults().create(&config)?;
//! let verifier = VerifierBuilder::new().provider(provider).model(&config.model).build()?;
//!
//! let report = verifier.verify(&statement, &passages).await?;
//! println!("{}", report.serialize()?);
//! ```

pub mod config;
pub mod document;
pub mod judge;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod stats;

pub use config::{ConfigError, FailurePolicy, ProviderConfig, ProviderKind, RunConfig, SamplingParams};
pub use document::{DocumentError, DocumentSource, FallbackSource, HttpDocumentSource};
pub use judge::Judge;
pub use orchestrator::{RuntimeError, Verifier, VerifierBuilder};
pub use providers::{LlmProvider, ProviderError, ProviderFactory, ProviderRegistry};
pub use stats::{CallStats, CallStatsSnapshot};
