//! Verification driver.
//!
//! Runs the judgment over every passage for every statement, strictly in
//! order and one backend call at a time:
//! - Passages are judged in supply order and reported in that order
//! - Each statement's report is handed out as soon as it is complete
//! - A backend failure either aborts the batch or is recorded as an
//!   unknown decision, depending on [`FailurePolicy`]

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use triplecheck_core::{Aggregation, Passage, PassageJudgment, Report, ReportError, Statement};

use crate::config::{FailurePolicy, RunConfig};
use crate::judge::Judge;
use crate::providers::{LlmProvider, ProviderError};
use crate::stats::{CallStats, CallStatsSnapshot, InstrumentedProvider};

/// Errors from the verification driver.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Backend call failed on passage {index} for {statement}: {source}")]
    Backend {
        statement: String,
        index: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Report encoding failed: {0}")]
    Report(#[from] ReportError),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Verifies statements against a fixed list of passages.
pub struct Verifier {
    judge: Judge,
    model: String,
    policy: FailurePolicy,
    passage_timeout: Option<Duration>,
    stats: Arc<CallStats>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("provider", &self.judge.provider_name())
            .field("model", &self.model)
            .field("policy", &self.policy)
            .field("passage_timeout", &self.passage_timeout)
            .finish()
    }
}

impl Verifier {
    /// Create a verifier that aborts on the first backend failure.
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        let stats = Arc::new(CallStats::new());
        let instrumented = InstrumentedProvider::new(provider, stats.clone());

        Self {
            judge: Judge::new(Arc::new(instrumented)),
            model: model.into(),
            policy: FailurePolicy::Abort,
            passage_timeout: None,
            stats,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn passage_timeout(&self) -> Option<Duration> {
        self.passage_timeout
    }

    /// Backend calls made so far.
    pub fn stats(&self) -> CallStatsSnapshot {
        self.stats.snapshot()
    }

    async fn judge_passage(
        &self,
        statement: &Statement,
        passage: &Passage,
    ) -> Result<PassageJudgment, ProviderError> {
        match self.passage_timeout {
            Some(limit) => tokio::time::timeout(limit, self.judge.judge(statement, passage))
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => self.judge.judge(statement, passage).await,
        }
    }

    /// Judge every passage for one statement and build its report.
    pub async fn verify(
        &self,
        statement: &Statement,
        passages: &[Passage],
    ) -> Result<Report, RuntimeError> {
        let mut aggregation = Aggregation::start(statement.clone());

        for (index, passage) in passages.iter().enumerate() {
            match self.judge_passage(statement, passage).await {
                Ok(judgment) => aggregation.push(judgment),
                Err(source) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(RuntimeError::Backend {
                            statement: statement.to_string(),
                            index,
                            source,
                        });
                    }
                    FailurePolicy::RecordUnknown => {
                        tracing::warn!(
                            %statement,
                            passage = index,
                            error = %source,
                            "Backend failed, recording passage as unknown"
                        );
                        aggregation.push(PassageJudgment::unknown(passage.clone()));
                    }
                },
            }
        }

        let report = aggregation.finish(&self.model);
        tracing::info!(
            %statement,
            final_decision = report.final_decision(),
            passages = report.judgments().len(),
            unknown = report.unknown_count(),
            elapsed_s = report.elapsed_seconds(),
            "Statement verified"
        );
        Ok(report)
    }

    /// Verify each statement in order, handing every report to `on_report`
    /// before the next statement starts.
    ///
    /// Returns the number of reports emitted. On error, reports already
    /// handed out stay valid and later statements are not evaluated.
    pub async fn verify_all<F>(
        &self,
        statements: &[Statement],
        passages: &[Passage],
        mut on_report: F,
    ) -> Result<usize, RuntimeError>
    where
        F: FnMut(&Report) -> Result<(), RuntimeError>,
    {
        let mut emitted = 0;
        let mut outcome = Ok(());

        for statement in statements {
            let result = match self.verify(statement, passages).await {
                Ok(report) => on_report(&report),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                outcome = Err(e);
                break;
            }
            emitted += 1;
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            statements = emitted,
            requested = statements.len(),
            calls = stats.calls,
            failures = stats.failures,
            total_latency_ms = stats.total_latency_ms,
            mean_latency_ms = stats.mean_latency_ms(),
            "Batch finished"
        );

        outcome.map(|()| emitted)
    }
}

/// Builder for [`Verifier`].
pub struct VerifierBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    model: Option<String>,
    policy: FailurePolicy,
    passage_timeout: Option<Duration>,
}

impl VerifierBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            model: None,
            policy: FailurePolicy::Abort,
            passage_timeout: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Model identifier recorded in reports. Defaults to the provider name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upper bound on both calls for one passage together.
    pub fn passage_timeout(mut self, timeout: Duration) -> Self {
        self.passage_timeout = Some(timeout);
        self
    }

    /// Failure policy and passage timeout from run settings.
    pub fn run_config(mut self, config: &RunConfig) -> Self {
        self.policy = config.on_backend_error;
        self.passage_timeout = config.passage_timeout;
        self
    }

    pub fn build(self) -> Result<Verifier, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;
        let model = self.model.unwrap_or_else(|| provider.name().to_string());

        let mut verifier = Verifier::new(provider, model);
        verifier.policy = self.policy;
        verifier.passage_timeout = self.passage_timeout;
        Ok(verifier)
    }
}

impl Default for VerifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
