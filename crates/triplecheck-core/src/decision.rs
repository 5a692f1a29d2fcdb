//! Reducing a forced-choice model answer to a decision.
//!
//! The decision prompt asks the model to name option `A)` (inferable) or
//! `B)` (not inferable). Models rarely answer with just the letter, so the
//! response is scanned rather than matched exactly:
//!
//! 1. Any `A)` / `a)` anywhere => [`Decision::Inferable`], even if a `B)`
//!    also appears (models often restate both options).
//! 2. Otherwise any `B)` / `b)` => [`Decision::NotInferable`].
//! 3. Otherwise => [`Decision::Unknown`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    /// Option A marker.
    static ref OPTION_A: Regex = Regex::new(r"[Aa]\)").unwrap();

    /// Option B marker.
    static ref OPTION_B: Regex = Regex::new(r"[Bb]\)").unwrap();
}

/// Outcome of the decision step for one passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The statement can be inferred from the passage.
    Inferable,

    /// The statement cannot be inferred from the passage.
    NotInferable,

    /// Neither option could be read from the response, or the backend
    /// failed for this passage.
    Unknown,
}

impl Decision {
    /// Classify a decision-step response.
    pub fn classify(response: &str) -> Self {
        if OPTION_A.is_match(response) {
            Decision::Inferable
        } else if OPTION_B.is_match(response) {
            Decision::NotInferable
        } else {
            Decision::Unknown
        }
    }

    /// `Some(true)` / `Some(false)` for a definite answer, `None` for unknown.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Decision::Inferable => Some(true),
            Decision::NotInferable => Some(false),
            Decision::Unknown => None,
        }
    }

    pub fn from_bool(value: Option<bool>) -> Self {
        match value {
            Some(true) => Decision::Inferable,
            Some(false) => Decision::NotInferable,
            None => Decision::Unknown,
        }
    }

    /// Only a definite `Inferable` counts towards the final verdict.
    pub fn is_inferable(self) -> bool {
        self == Decision::Inferable
    }

    pub fn is_unknown(self) -> bool {
        self == Decision::Unknown
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Inferable => write!(f, "inferable"),
            Decision::NotInferable => write!(f, "not inferable"),
            Decision::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_a() {
        assert_eq!(Decision::classify("A) yes"), Decision::Inferable);
        assert_eq!(
            Decision::classify("The answer is a) the statement can be inferred."),
            Decision::Inferable
        );
    }

    #[test]
    fn test_option_b() {
        assert_eq!(Decision::classify("B) no"), Decision::NotInferable);
        assert_eq!(Decision::classify("I choose b)."), Decision::NotInferable);
    }

    #[test]
    fn test_a_wins_when_both_present() {
        assert_eq!(
            Decision::classify("A) The RDF statement can be inferred. Not B) though."),
            Decision::Inferable
        );
        // Order does not matter: A is checked first.
        assert_eq!(
            Decision::classify("Not B), the right option is A)"),
            Decision::Inferable
        );
    }

    #[test]
    fn test_neither_is_unknown() {
        assert_eq!(Decision::classify("Yes, it can."), Decision::Unknown);
        assert_eq!(Decision::classify(""), Decision::Unknown);
        // A bare letter without the parenthesis is not an option marker.
        assert_eq!(Decision::classify("Option A"), Decision::Unknown);
    }

    #[test]
    fn test_marker_inside_word_still_matches() {
        // "(see a)" style asides match, as they did in the reference harness.
        assert_eq!(Decision::classify("(see data)"), Decision::Inferable);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(Decision::Inferable.as_bool(), Some(true));
        assert_eq!(Decision::NotInferable.as_bool(), Some(false));
        assert_eq!(Decision::Unknown.as_bool(), None);

        for decision in [Decision::Inferable, Decision::NotInferable, Decision::Unknown] {
            assert_eq!(Decision::from_bool(decision.as_bool()), decision);
        }
    }

    #[test]
    fn test_only_inferable_counts() {
        assert!(Decision::Inferable.is_inferable());
        assert!(!Decision::NotInferable.is_inferable());
        assert!(!Decision::Unknown.is_inferable());
    }
}
