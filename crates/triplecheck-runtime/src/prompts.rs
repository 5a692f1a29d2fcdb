//! Prompts for the two-step judgment.
//!
//! 1. Opinion: the model reads one passage and says whether the statement
//!    follows from it, with reasoning.
//! 2. Decision: the model re-reads its own opinion and commits to option
//!    `A)` (inferable) or `B)` (not inferable).
//!
//! The wording is part of the protocol. Decision parsing relies on the
//! model echoing the `A)` / `B)` labels offered here.

use triplecheck_core::{Passage, Statement};

/// System prompt sent to backends that accept one.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Option the decision step maps to "inferable".
pub const OPTION_A: &str = "A) The RDF statement can be inferred from the snippet.";

/// Option the decision step maps to "not inferable".
pub const OPTION_B: &str = "B) The RDF statement can not be inferred from the snippet.";

/// First call: ask for an answer plus reasoning about one passage.
pub fn opinion_prompt(statement: &Statement, passage: &Passage) -> String {
    format!(
        "Can the given RDF statement be inferred from the given snippet?\n{}\nSnippet: \"{}\"\nPlease, give an answer and also the reasoning behind it!",
        statement.rdf_line(),
        passage.as_str()
    )
}

/// Second call: force a choice between the two options.
pub fn decision_prompt(opinion: &str) -> String {
    format!(
        "Choose and explicitly name the corresponding option A) or B) based on the following reasoning: {}\n{}\n{}",
        opinion, OPTION_A, OPTION_B
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use triplecheck_core::Decision;

    fn paris() -> Statement {
        Statement::new("Paris", "capitalOf", "France")
    }

    #[test]
    fn test_opinion_prompt_embeds_triple_and_passage() {
        let passage = Passage::new("Paris is the capital of France and its largest city.");
        let prompt = opinion_prompt(&paris(), &passage);

        assert_eq!(
            prompt,
            "Can the given RDF statement be inferred from the given snippet?\n\
             RDF: [\"Paris\" - \"capitalOf\" - \"France\"]\n\
             Snippet: \"Paris is the capital of France and its largest city.\"\n\
             Please, give an answer and also the reasoning behind it!"
        );
    }

    #[test]
    fn test_decision_prompt_embeds_opinion_verbatim() {
        let opinion = "Yes.\n\nThe snippet   says so.";
        let prompt = decision_prompt(opinion);

        assert!(prompt.contains(opinion));
        assert!(prompt.starts_with("Choose and explicitly name the corresponding option A) or B)"));
        assert!(prompt.ends_with(OPTION_B));
    }

    #[test]
    fn test_options_classify_as_labelled() {
        assert_eq!(Decision::classify(OPTION_A), Decision::Inferable);
        assert_eq!(Decision::classify(OPTION_B), Decision::NotInferable);
    }
}
