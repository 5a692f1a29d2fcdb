//! The two-call judgment for one (statement, passage) pair.

use std::sync::Arc;

use triplecheck_core::{Decision, Passage, PassageJudgment, Statement};

use crate::prompts::{decision_prompt, opinion_prompt};
use crate::providers::{LlmProvider, ProviderError};

/// Runs the opinion and decision steps against one backend.
///
/// Stateless across passages: every call builds its own prompts and the
/// backend sees no conversation history.
#[derive(Clone)]
pub struct Judge {
    provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for Judge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Judge")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl Judge {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// First call. The returned text is the rationale recorded in the report.
    pub async fn opinion(&self, statement: &Statement, passage: &Passage) -> Result<String, ProviderError> {
        let prompt = opinion_prompt(statement, passage);
        tracing::debug!(%statement, prompt = %prompt, "Opinion prompt");

        let opinion = self.provider.generate(&prompt).await?;
        tracing::debug!(%statement, opinion = %opinion, "Opinion received");
        Ok(opinion)
    }

    /// Second call. Returns the classified decision and the raw response.
    pub async fn decide(&self, opinion: &str) -> Result<(Decision, String), ProviderError> {
        let prompt = decision_prompt(opinion);
        let response = self.provider.generate(&prompt).await?;
        let decision = Decision::classify(&response);

        if decision.is_unknown() {
            tracing::warn!(
                response = %response,
                "Decision response names neither option A) nor B)"
            );
        } else {
            tracing::debug!(%decision, response = %response, "Decision received");
        }
        Ok((decision, response))
    }

    /// Both calls in sequence.
    pub async fn judge(&self, statement: &Statement, passage: &Passage) -> Result<PassageJudgment, ProviderError> {
        let opinion = self.opinion(statement, passage).await?;
        let (decision, _) = self.decide(&opinion).await?;
        Ok(PassageJudgment::new(passage.clone(), opinion, decision))
    }
}
